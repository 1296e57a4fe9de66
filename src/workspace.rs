// src/workspace.rs

//! Working directory ownership for one operation.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::errors::{ApplyError, Result};
use crate::request::ModuleSource;

/// The directory Terraform runs in.
///
/// A remote module gets a fresh temporary directory that is removed when the
/// `Workspace` is released or dropped, whichever comes first. A local module
/// path is used as-is and never removed.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    owned: Option<TempDir>,
}

impl Workspace {
    /// Acquire the working directory for `module`.
    pub fn acquire(module: &ModuleSource) -> Result<Self> {
        match module {
            ModuleSource::Local(path) => {
                if !path.is_dir() {
                    return Err(ApplyError::Validation(format!(
                        "module_path '{}' is not a directory",
                        path.display()
                    )));
                }
                debug!(dir = %path.display(), "using local module directory");
                Ok(Self {
                    dir: path.clone(),
                    owned: None,
                })
            }
            ModuleSource::Remote { source, .. } => Self::temporary(source),
        }
    }

    /// Create a fresh temporary directory named after `hint`.
    pub fn temporary(hint: &str) -> Result<Self> {
        let prefix = sanitize_hint(hint);
        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir()
            .map_err(|source| ApplyError::Workspace {
                hint: hint.to_string(),
                source,
            })?;
        debug!(dir = %tmp.path().display(), "created terraform working dir");
        Ok(Self {
            dir: tmp.path().to_path_buf(),
            owned: Some(tmp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether this workspace is removed on release.
    pub fn is_owned(&self) -> bool {
        self.owned.is_some()
    }

    /// Remove the directory if this workspace owns it.
    ///
    /// Failures are logged, never returned: by the time a workspace is
    /// released the operation's result is already decided.
    pub fn release(mut self) {
        if let Some(tmp) = self.owned.take() {
            let dir = tmp.path().to_path_buf();
            match tmp.close() {
                Ok(()) => debug!(dir = %dir.display(), "removed terraform working dir"),
                Err(e) => warn!(
                    dir = %dir.display(),
                    error = %e,
                    "failed to remove terraform working dir"
                ),
            }
        }
    }
}

/// Turn a module source into something usable as a directory name prefix.
pub fn sanitize_hint(hint: &str) -> String {
    let sanitized: String = hint
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    format!("{sanitized}-")
}
