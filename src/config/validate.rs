// src/config/validate.rs

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::model::{
    ExtraFileEntry, ModuleSection, RawRequestFile, RegistryEntry, RequestFile, Settings,
    SettingsSection,
};
use crate::errors::{ApplyError, Result};
use crate::request::{
    AuxiliaryFileSpec, ModuleSource, OperationRequest, ProviderSettings, RegistryCredential,
};
use crate::types::parse_duration;

static VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("variable name pattern is valid")
});

impl TryFrom<RawRequestFile> for RequestFile {
    type Error = ApplyError;

    fn try_from(raw: RawRequestFile) -> std::result::Result<Self, Self::Error> {
        let settings = validate_settings(&raw.settings)?;

        let provider = ProviderSettings {
            registry: validate_registry(&raw.provider.registry, "provider")?,
            extra_files: validate_extra_files(&raw.provider.extra_file, "provider")?,
        };

        let request = validate_module(raw.module)?;

        Ok(RequestFile::new_unchecked(settings, provider, request))
    }
}

fn validate_settings(raw: &SettingsSection) -> Result<Settings> {
    let log_drain_grace = parse_duration(&raw.log_drain_grace).map_err(|e| {
        ApplyError::ConfigError(format!("[settings].log_drain_grace: {e}"))
    })?;

    let plan_file = raw.plan_file.trim();
    if plan_file.is_empty() || plan_file.contains(['/', '\\']) {
        return Err(ApplyError::ConfigError(format!(
            "[settings].plan_file must be a bare file name (got '{}')",
            raw.plan_file
        )));
    }

    Ok(Settings {
        install_dir: raw.install_dir.clone(),
        log_drain_grace,
        plan_file: plan_file.to_string(),
    })
}

fn validate_module(raw: ModuleSection) -> Result<OperationRequest> {
    let module = module_source(&raw)?;

    for name in raw.vars.keys() {
        if !VARIABLE_NAME.is_match(name) {
            return Err(ApplyError::Validation(format!(
                "'{name}' in [module.vars] is not a valid Terraform variable name"
            )));
        }
    }

    for key in raw.envs.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(ApplyError::Validation(format!(
                "'{key}' in [module.envs] is not a valid environment variable name"
            )));
        }
    }

    let terraform_version = raw
        .terraform_version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(OperationRequest {
        terraform_version,
        module,
        registry: validate_registry(&raw.registry, "module")?,
        extra_files: validate_extra_files(&raw.extra_file, "module")?,
        vars: raw.vars,
        backend_config: raw.backend_config,
        envs: raw.envs,
    })
}

fn module_source(raw: &ModuleSection) -> Result<ModuleSource> {
    let source = raw.source.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let version = raw.version.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let module_path = raw
        .module_path
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty());

    match (source, module_path) {
        (Some(_), Some(_)) => Err(ApplyError::Validation(
            "set either 'source' or 'module_path', not both".to_string(),
        )),
        (None, None) => Err(ApplyError::Validation(
            "please provide either 'source' or 'module_path'".to_string(),
        )),
        (Some(source), None) => {
            let version = version.ok_or_else(|| {
                ApplyError::Validation(format!("'version' is required for source '{source}'"))
            })?;
            Ok(ModuleSource::Remote {
                source: source.to_string(),
                version: version.to_string(),
            })
        }
        (None, Some(path)) => {
            if version.is_some() {
                return Err(ApplyError::Validation(
                    "'version' is only valid together with 'source'".to_string(),
                ));
            }
            Ok(ModuleSource::Local(path.clone()))
        }
    }
}

fn validate_registry(entries: &[RegistryEntry], section: &str) -> Result<Vec<RegistryCredential>> {
    entries
        .iter()
        .map(|e| {
            let host = e.host.trim();
            if host.is_empty() {
                return Err(ApplyError::Validation(format!(
                    "[[{section}.registry]] entry has an empty host"
                )));
            }
            Ok(RegistryCredential {
                host: host.to_string(),
                token: e.token.clone(),
            })
        })
        .collect()
}

fn validate_extra_files(entries: &[ExtraFileEntry], section: &str) -> Result<Vec<AuxiliaryFileSpec>> {
    entries
        .iter()
        .map(|e| {
            validate_relative_path(&e.path).map_err(|reason| {
                ApplyError::Validation(format!(
                    "[[{section}.extra_file]] path '{}' {reason}",
                    e.path
                ))
            })?;
            Ok(AuxiliaryFileSpec {
                path: e.path.clone(),
                content: e.content.clone().into_bytes(),
                force: e.force,
                cleanup: e.cleanup,
            })
        })
        .collect()
}

/// Extra files must stay inside the module directory.
fn validate_relative_path(path: &str) -> std::result::Result<(), &'static str> {
    if path.trim().is_empty() {
        return Err("is empty");
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err("must not contain '..'"),
            Component::RootDir | Component::Prefix(_) => return Err("must be relative"),
        }
    }
    Ok(())
}
