//! Unit and scenario tests for the BIDS uploader.
//!
//! ## Test Modules
//!
//! - **classify_tests**: directory classification rules
//! - **scan_type_tests**: scan-type and session-label derivation
//! - **mapper_tests**: find-or-create against the in-memory XNAT
//! - **uploader_tests**: end-to-end traversals over temporary BIDS trees
//! - **client_tests**: the REST client against a stand-in XNAT server
//! - **config_tests**: configuration loading and validation
//! - **error_tests**: error messages
//! - **prompt_tests**: interactive input parsing
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! cargo test uploader_tests
//! ```

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub mod classify_tests;
pub mod config_tests;
pub mod error_tests;
pub mod prompt_tests;

/// Creates `files` (root-relative, `/`-separated) with small contents.
pub(crate) fn bids_tree(files: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for rel in files {
        write_file(temp_dir.path(), rel, rel.as_bytes());
    }
    temp_dir
}

pub(crate) fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}
