// src/state.rs

//! Persisted resource state: the identity and outputs of the last
//! successful create/update.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// `source:version` or the local module path; empty when nothing is
    /// deployed.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, outputs: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            outputs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Forget the resource after a destroy.
    pub fn clear(&mut self) {
        self.id.clear();
        self.outputs.clear();
    }

    /// Load state from `path`; a missing file is an empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no state file; starting empty");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_toml()?)?;
        debug!(path = %path.display(), id = %self.id, "saved state");
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Default state file location.
pub fn default_state_path() -> PathBuf {
    PathBuf::from("tfapply.state.toml")
}
