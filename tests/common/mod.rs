//! Common test utilities

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary project with a `package.json`
pub fn create_project(manifest: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("package.json"), manifest).unwrap();
    temp_dir
}

/// Write a file inside the project, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Turn string slices into owned arguments
pub fn argv(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
