//! Loader tests over real files in temporary directories


use std::fs;
use std::path::{Path, PathBuf};

/// Write a file into `dir` and return its path
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
