// src/client/toolchain.rs

//! Locating the Terraform binary for an operation.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ApplyError, Result};

/// Name of the Terraform executable on this platform.
pub const TERRAFORM_BIN: &str = if cfg!(windows) {
    "terraform.exe"
} else {
    "terraform"
};

/// Provides a Terraform binary for a requested version.
pub trait ToolchainProvider: Send + Sync {
    /// Return a binary for `version`.
    ///
    /// `force_redownload` asks providers that cache binaries to refresh
    /// them; providers without a cache ignore it.
    fn download_terraform(&self, version: &str, force_redownload: bool) -> Result<PathBuf>;

    /// Find `terraform` when no version was requested.
    fn lookup(&self) -> Result<PathBuf> {
        lookup_terraform()
    }

    /// Resolve the binary for an optional version.
    fn resolve(&self, version: Option<&str>) -> Result<PathBuf> {
        let bin = match version {
            None => {
                debug!("lookup terraform executable");
                self.lookup()?
            }
            Some(version) => {
                debug!(version, "resolve terraform version");
                self.download_terraform(version, false)?
            }
        };
        debug!(bin = %bin.display(), "terraform binary");
        Ok(bin)
    }
}

/// Find `terraform` in `PATH`.
pub fn lookup_terraform() -> Result<PathBuf> {
    which::which("terraform").map_err(|_| {
        ApplyError::Toolchain("cannot find terraform executable in PATH".to_string())
    })
}

/// Serves versions pre-installed under `<install_dir>/<version>/terraform`.
///
/// This provider never downloads: a version that is not installed is a
/// toolchain error naming the expected location.
#[derive(Debug, Clone, Default)]
pub struct LocalToolchain {
    install_dir: Option<PathBuf>,
}

impl LocalToolchain {
    pub fn new(install_dir: Option<PathBuf>) -> Self {
        Self { install_dir }
    }

    pub fn binary_path(install_dir: &Path, version: &str) -> PathBuf {
        install_dir.join(version).join(TERRAFORM_BIN)
    }
}

impl ToolchainProvider for LocalToolchain {
    fn download_terraform(&self, version: &str, _force_redownload: bool) -> Result<PathBuf> {
        let install_dir = self.install_dir.as_deref().ok_or_else(|| {
            ApplyError::Toolchain(format!(
                "terraform {version} requested but no [settings].install_dir is configured"
            ))
        })?;

        let bin = Self::binary_path(install_dir, version);
        if !bin.is_file() {
            return Err(ApplyError::Toolchain(format!(
                "terraform {version} is not installed (expected {})",
                bin.display()
            )));
        }
        Ok(bin)
    }
}
