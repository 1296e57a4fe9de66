// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawRequestFile, RequestFile};
use crate::errors::Result;
use crate::request::ModuleSource;

/// Load a request file from a given path and return the raw `RawRequestFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRequestFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawRequestFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a request file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks module location, variable names and extra file paths.
/// - Resolves a relative `module_path` against the request file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RequestFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let mut file = RequestFile::try_from(raw)?;

    if let ModuleSource::Local(module_path) = &file.request.module {
        if module_path.is_relative() {
            let resolved = config_root_dir(path).join(module_path);
            file.request.module = ModuleSource::Local(resolved);
        }
    }

    Ok(file)
}

/// Default request file location.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("tfapply.toml")
}

/// Directory relative paths in a request file are resolved against.
///
/// - A config path with a non-empty parent (e.g. "envs/dev.toml") uses it.
/// - A bare filename like "tfapply.toml" falls back to the current working
///   directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
