// src/config/mod.rs

//! Request file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a request file from disk (`loader.rs`).
//! - Validate it into typed request values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ExtraFileEntry, ModuleSection, ProviderSection, RawRequestFile, RegistryEntry, RequestFile,
    Settings, SettingsSection,
};
