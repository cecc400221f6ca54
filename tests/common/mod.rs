extern crate bucketfile;

use std::path::PathBuf;
use tempfile::TempDir;

pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("creating a temporary directory")
}

#[allow(dead_code)]
pub fn path_in(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
