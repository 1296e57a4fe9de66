// src/resolve.rs

//! Merging of process-wide and per-operation inputs into client settings.
//!
//! Everything here is pure: inputs are borrowed, outputs are new values.

use std::collections::BTreeMap;

use crate::client::ClientSettings;
use crate::request::{AuxiliaryFileSpec, OperationRequest, ProviderSettings, RegistryCredential};
use crate::types::{OperationKind, ScalarValue, VariableDelivery};

/// Environment prefix Terraform reads input variables from.
pub const TF_VAR_PREFIX: &str = "TF_VAR_";

/// Concatenate credentials, operation-level first. Duplicates are kept.
pub fn merge_credentials(
    operation: &[RegistryCredential],
    process: &[RegistryCredential],
) -> Vec<RegistryCredential> {
    operation.iter().chain(process).cloned().collect()
}

/// Concatenate extra files, operation-level first.
pub fn merge_files(
    operation: &[AuxiliaryFileSpec],
    process: &[AuxiliaryFileSpec],
) -> Vec<AuxiliaryFileSpec> {
    operation.iter().chain(process).cloned().collect()
}

pub fn coerce_to_strings(map: &BTreeMap<String, ScalarValue>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()
}

/// Like [`coerce_to_strings`], with every key prefixed.
pub fn coerce_to_env_prefixed(
    map: &BTreeMap<String, ScalarValue>,
    prefix: &str,
) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (format!("{prefix}{k}"), v.to_string()))
        .collect()
}

/// Build the client configuration for one operation.
///
/// Module variables are delivered according to
/// [`OperationKind::variable_delivery`]: native `-var` arguments for
/// create/update, `TF_VAR_*` environment entries for destroy.
pub fn resolve(
    request: &OperationRequest,
    provider: &ProviderSettings,
    kind: OperationKind,
) -> ClientSettings {
    let (vars, extra_env) = match kind.variable_delivery() {
        VariableDelivery::Native => (coerce_to_strings(&request.vars), BTreeMap::new()),
        VariableDelivery::Environment => (
            BTreeMap::new(),
            coerce_to_env_prefixed(&request.vars, TF_VAR_PREFIX),
        ),
    };

    ClientSettings {
        vars,
        backend_vars: coerce_to_strings(&request.backend_config),
        env: coerce_to_strings(&request.envs),
        extra_env,
        registry: merge_credentials(&request.registry, &provider.registry),
    }
}
