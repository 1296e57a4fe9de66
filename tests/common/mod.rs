#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub use tfapply_test_utils::{init_tracing, with_timeout};

/// A local module directory holding a single `main.tf`.
pub fn local_module(main_tf: &str) -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix("tfapply-local-")
        .tempdir()
        .expect("create local module dir");
    fs::write(dir.path().join("main.tf"), main_tf).expect("write main.tf");
    dir
}

pub fn read_string(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.as_ref().display()))
}
