//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code
//! - The conductor core stays free of terminal UI dependencies
//!
//! These tests are designed to catch violations early in the development cycle.
//! The helpers below locate workspace sources regardless of the directory
//! `cargo test` runs from.

use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["conductor/core/src", "tui/src"];

/// Root of the workspace
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Whether a file only holds test support code
pub fn is_test_support(path: &Path) -> bool {
    path.file_name().and_then(|s| s.to_str()) == Some("test_utils.rs")
}

/// Code before any `//` comment on the line
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}
