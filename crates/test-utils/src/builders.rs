#![allow(dead_code)]

use std::path::PathBuf;

use tfapply::request::{
    AuxiliaryFileSpec, ModuleSource, OperationRequest, ProviderSettings, RegistryCredential,
};
use tfapply::types::ScalarValue;

/// Builder for `OperationRequest` to simplify test setup.
pub struct RequestBuilder {
    request: OperationRequest,
}

impl RequestBuilder {
    pub fn remote(source: &str, version: &str) -> Self {
        Self {
            request: OperationRequest::new(ModuleSource::Remote {
                source: source.to_string(),
                version: version.to_string(),
            }),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            request: OperationRequest::new(ModuleSource::Local(path.into())),
        }
    }

    pub fn terraform_version(mut self, version: &str) -> Self {
        self.request.terraform_version = Some(version.to_string());
        self
    }

    pub fn var(mut self, name: &str, value: impl Into<ScalarValue>) -> Self {
        self.request.vars.insert(name.to_string(), value.into());
        self
    }

    pub fn backend(mut self, name: &str, value: impl Into<ScalarValue>) -> Self {
        self.request
            .backend_config
            .insert(name.to_string(), value.into());
        self
    }

    pub fn env(mut self, name: &str, value: impl Into<ScalarValue>) -> Self {
        self.request.envs.insert(name.to_string(), value.into());
        self
    }

    pub fn registry(mut self, host: &str, token: &str) -> Self {
        self.request.registry.push(credential(host, token));
        self
    }

    pub fn extra_file(mut self, file: AuxiliaryFileSpec) -> Self {
        self.request.extra_files.push(file);
        self
    }

    pub fn build(self) -> OperationRequest {
        self.request
    }
}

/// Builder for process-wide `ProviderSettings`.
#[derive(Default)]
pub struct ProviderBuilder {
    settings: ProviderSettings,
}

impl ProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, host: &str, token: &str) -> Self {
        self.settings.registry.push(credential(host, token));
        self
    }

    pub fn extra_file(mut self, file: AuxiliaryFileSpec) -> Self {
        self.settings.extra_files.push(file);
        self
    }

    pub fn build(self) -> ProviderSettings {
        self.settings
    }
}

pub fn credential(host: &str, token: &str) -> RegistryCredential {
    RegistryCredential {
        host: host.to_string(),
        token: token.to_string(),
    }
}

/// Shorthand for an extra file with default flags.
pub fn extra_file(path: &str, content: &str) -> AuxiliaryFileSpec {
    AuxiliaryFileSpec::new(path, content.as_bytes().to_vec())
}
