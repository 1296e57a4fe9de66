// src/errors.rs

//! Crate-wide error type.
//!
//! Every failure surfaced to the caller is a single `ApplyError`. Failures of
//! Terraform phases are wrapped in [`ApplyError::Phase`], which carries the
//! diagnostic output captured while the operation ran.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Phase;

#[derive(Error, Debug)]
pub enum ApplyError {
    /// Missing or conflicting request inputs.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The working directory could not be created.
    #[error("cannot create working directory for '{hint}': {source}")]
    Workspace {
        hint: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "cannot write extra file ({}) because target module has a file with the same name already. Use 'force' to overwrite file",
        path.display()
    )]
    FileConflict { path: PathBuf },

    #[error("Toolchain error: {0}")]
    Toolchain(String),

    /// The tool exited unsuccessfully.
    #[error("{program} {args} exited with status {code}")]
    Command {
        program: String,
        args: String,
        code: i32,
    },

    /// A step of the operation failed after log streaming started.
    ///
    /// Rendered as the captured diagnostics followed by the phase label.
    #[error("{}{phase}: {source}", diagnostics_prefix(diagnostics))]
    Phase {
        phase: Phase,
        diagnostics: String,
        #[source]
        source: Box<ApplyError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApplyError {
    /// The phase this error was raised in, if it is a phase failure.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ApplyError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

fn diagnostics_prefix(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!("{diagnostics}\n")
    }
}

pub type Result<T> = std::result::Result<T, ApplyError>;
