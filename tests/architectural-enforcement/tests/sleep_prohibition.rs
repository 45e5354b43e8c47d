//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the TUI and the conductor core MUST NOT call
//! sleep. Waiting happens on I/O, channels, or `tokio::time::interval`.
//! **Exceptions**: test code (`#[cfg(test)]` modules and test support files)

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, is_test_support, rust_files, PRODUCTION_DIRS};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for path in rust_files(dir) {
            if !is_test_support(&path) {
                check_file(&path, &mut violations);
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nWait on I/O, a channel, or tokio::time::interval instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_production_sources_are_found() {
    for dir in PRODUCTION_DIRS {
        assert!(
            !rust_files(dir).is_empty(),
            "no Rust sources under {dir}; is the workspace layout unchanged?"
        );
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    for (idx, line) in content.lines().enumerate() {
        // Everything after the test module is test code
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        let code = code_part(line);
        if code.contains("::sleep(") || code.contains(".sleep(") {
            violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
        }
    }
}
