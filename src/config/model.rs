// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::request::{OperationRequest, ProviderSettings};
use crate::types::ScalarValue;

/// Top-level request file as read from TOML.
///
/// ```toml
/// [settings]
/// install_dir = "/opt/terraform"
/// log_drain_grace = "2s"
///
/// [[provider.registry]]
/// host = "app.terraform.io"
/// token = "..."
///
/// [module]
/// source = "weakpixel/test-module/tfcli"
/// version = "0.0.2"
///
/// [module.vars]
/// string_var = "Hello"
/// ```
///
/// Only `[module]` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequestFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// Process-wide registry credentials and extra files.
    #[serde(default)]
    pub provider: ProviderSection,

    pub module: ModuleSection,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// Root of pre-installed Terraform versions, laid out as
    /// `<install_dir>/<version>/terraform`.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// How long to wait for the output readers to catch up before an error
    /// is reported (e.g. `"2s"`, `"500ms"`).
    #[serde(default = "default_log_drain_grace")]
    pub log_drain_grace: String,

    /// File name of the transient plan artifact inside the module directory.
    #[serde(default = "default_plan_file")]
    pub plan_file: String,
}

fn default_log_drain_grace() -> String {
    "2s".to_string()
}

fn default_plan_file() -> String {
    ".tfapply.tfplan".to_string()
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            install_dir: None,
            log_drain_grace: default_log_drain_grace(),
            plan_file: default_plan_file(),
        }
    }
}

/// `[provider]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderSection {
    #[serde(default)]
    pub registry: Vec<RegistryEntry>,

    #[serde(default)]
    pub extra_file: Vec<ExtraFileEntry>,
}

/// `[module]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModuleSection {
    #[serde(default)]
    pub terraform_version: Option<String>,

    /// Module source. Not required if `module_path` is set.
    #[serde(default)]
    pub source: Option<String>,

    /// Module version. Not required if `module_path` is set.
    #[serde(default)]
    pub version: Option<String>,

    /// Path to a local module; alternative to `source` + `version`.
    #[serde(default)]
    pub module_path: Option<PathBuf>,

    #[serde(default)]
    pub vars: BTreeMap<String, ScalarValue>,

    #[serde(default)]
    pub backend_config: BTreeMap<String, ScalarValue>,

    #[serde(default)]
    pub envs: BTreeMap<String, ScalarValue>,

    #[serde(default)]
    pub registry: Vec<RegistryEntry>,

    #[serde(default)]
    pub extra_file: Vec<ExtraFileEntry>,
}

/// `[[*.registry]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub host: String,
    pub token: String,
}

/// `[[*.extra_file]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraFileEntry {
    /// Relative file path in the module.
    pub path: String,

    pub content: String,

    /// Overwrite an existing file.
    #[serde(default)]
    pub force: bool,

    /// Delete the file after execution.
    #[serde(default)]
    pub cleanup: bool,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub install_dir: Option<PathBuf>,
    pub log_drain_grace: Duration,
    pub plan_file: String,
}

/// A validated request file.
///
/// Can only be obtained through `TryFrom<RawRequestFile>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFile {
    pub settings: Settings,
    pub provider: ProviderSettings,
    pub request: OperationRequest,
}

impl RequestFile {
    pub(crate) fn new_unchecked(
        settings: Settings,
        provider: ProviderSettings,
        request: OperationRequest,
    ) -> Self {
        Self {
            settings,
            provider,
            request,
        }
    }
}
