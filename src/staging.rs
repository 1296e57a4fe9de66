// src/staging.rs

//! Staging of extra files into the module directory.
//!
//! Writing is two-pass: every non-forced file is checked for a collision
//! first, and only when the whole batch is clear does anything get written.
//! A conflict therefore never leaves a partially staged directory behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{ApplyError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::request::AuxiliaryFileSpec;

/// Writes and removes extra files through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FileStager {
    fs: Arc<dyn FileSystem>,
}

impl Default for FileStager {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl FileStager {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Write `files` into `dir`.
    ///
    /// Fails with [`ApplyError::FileConflict`] before touching anything if a
    /// non-forced file already exists.
    pub fn write(&self, dir: &Path, files: &[AuxiliaryFileSpec]) -> Result<()> {
        self.check_conflicts(dir, files)?;

        for file in files {
            let fullpath = target_path(dir, &file.path);
            if let Some(parent) = fullpath.parent() {
                self.fs.create_dir_all(parent)?;
            }
            debug!(path = %fullpath.display(), force = file.force, "write extra file");
            self.fs.write(&fullpath, &file.content)?;
        }

        Ok(())
    }

    /// Remove every file marked `cleanup`. Errors are ignored.
    pub fn cleanup(&self, dir: &Path, files: &[AuxiliaryFileSpec]) {
        for file in files.iter().filter(|f| f.cleanup) {
            let fullpath = target_path(dir, &file.path);
            match self.fs.remove_file(&fullpath) {
                Ok(()) => debug!(path = %fullpath.display(), "removed extra file"),
                Err(e) => debug!(
                    path = %fullpath.display(),
                    error = %e,
                    "could not remove extra file"
                ),
            }
        }
    }

    fn check_conflicts(&self, dir: &Path, files: &[AuxiliaryFileSpec]) -> Result<()> {
        for file in files.iter().filter(|f| !f.force) {
            if self.fs.exists(&target_path(dir, &file.path)) {
                return Err(ApplyError::FileConflict {
                    path: PathBuf::from(&file.path),
                });
            }
        }
        Ok(())
    }
}

/// Join a slash-separated relative path onto `dir` using native separators.
pub fn target_path(dir: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(dir.to_path_buf(), |acc, part| acc.join(part))
}
