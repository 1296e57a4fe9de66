// src/request.rs

//! Validated, strongly typed inputs of one lifecycle operation.
//!
//! These are produced from the TOML request file by
//! [`crate::config::validate`]; nothing here is constructed from untyped
//! maps, so the "exactly one module location" rule holds by construction.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::types::ScalarValue;

/// Where the module comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A registry (or any Terraform-supported) module source, fetched into a
    /// fresh working directory.
    Remote { source: String, version: String },
    /// A module already on disk; used in place.
    Local(PathBuf),
}

impl ModuleSource {
    pub fn is_local(&self) -> bool {
        matches!(self, ModuleSource::Local(_))
    }

    /// Identity recorded for the resource once an operation completes.
    ///
    /// `source:version` for remote modules, the module path for local ones.
    pub fn identity(&self) -> String {
        match self {
            ModuleSource::Remote { source, version } => format!("{source}:{version}"),
            ModuleSource::Local(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Credentials for a Terraform registry host.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredential {
    pub host: String,
    pub token: String,
}

// Keep tokens out of logs.
impl fmt::Debug for RegistryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredential")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// An extra file written into the module directory before `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFileSpec {
    /// Slash-separated path relative to the module directory.
    pub path: String,
    pub content: Vec<u8>,
    /// Overwrite a file the module already ships.
    pub force: bool,
    /// Remove the file once the operation finishes.
    pub cleanup: bool,
}

impl AuxiliaryFileSpec {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            force: false,
            cleanup: false,
        }
    }

    pub fn force(mut self, val: bool) -> Self {
        self.force = val;
        self
    }

    pub fn cleanup(mut self, val: bool) -> Self {
        self.cleanup = val;
        self
    }
}

/// Settings shared by every operation (the `[provider]` section).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSettings {
    pub registry: Vec<RegistryCredential>,
    pub extra_files: Vec<AuxiliaryFileSpec>,
}

/// The input of one create/update/destroy.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Terraform version to use; `None` means "whatever is on PATH".
    pub terraform_version: Option<String>,
    pub module: ModuleSource,
    pub vars: BTreeMap<String, ScalarValue>,
    pub backend_config: BTreeMap<String, ScalarValue>,
    pub envs: BTreeMap<String, ScalarValue>,
    pub registry: Vec<RegistryCredential>,
    pub extra_files: Vec<AuxiliaryFileSpec>,
}

impl OperationRequest {
    pub fn new(module: ModuleSource) -> Self {
        Self {
            terraform_version: None,
            module,
            vars: BTreeMap::new(),
            backend_config: BTreeMap::new(),
            envs: BTreeMap::new(),
            registry: Vec::new(),
            extra_files: Vec::new(),
        }
    }
}
