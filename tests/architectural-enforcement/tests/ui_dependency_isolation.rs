//! Integration Test: UI Dependency Isolation
//!
//! **Policy**: The conductor core is UI-agnostic. Neither its manifest nor its
//! sources may reference terminal UI crates; those belong to the `tui` crate.

use std::fs;

use architectural_enforcement::{code_part, rust_files, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let manifest = workspace_root().join("conductor/core/Cargo.toml");
    let content = fs::read_to_string(&manifest).expect("read conductor/core/Cargo.toml");

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        for krate in UI_CRATES {
            assert!(
                !line.starts_with(krate),
                "conductor/core/Cargo.toml depends on {krate}: {line}"
            );
        }
    }
}

#[test]
fn test_core_sources_do_not_use_ui_crates() {
    let mut violations = Vec::new();
    for path in rust_files("conductor/core/src") {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (idx, line) in content.lines().enumerate() {
            let code = code_part(line);
            if UI_CRATES
                .iter()
                .any(|krate| code.contains(&format!("{krate}::")))
            {
                violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "UI crates used in the conductor core:\n{}",
        violations.join("\n")
    );
}
