// src/client/mod.rs

//! Terraform execution layer.
//!
//! The orchestrator talks to an [`ExecutionClient`] instead of running
//! processes itself. This makes it easy to swap in a scripted client in
//! tests while keeping the production implementation in [`terraform`].
//!
//! - [`terraform`] contains `TerraformCli`, which shells out to the
//!   `terraform` binary with `tokio::process`.
//! - [`toolchain`] locates the binary to use for a requested version.

pub mod terraform;
pub mod toolchain;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;
use crate::request::RegistryCredential;
use crate::streaming::OutputPipes;

pub use terraform::{TerraformCli, TerraformCliFactory};
pub use toolchain::{LocalToolchain, ToolchainProvider, lookup_terraform};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything the client needs besides the working directory.
///
/// `vars` and `extra_env` are never both populated by the resolver: which
/// one carries the module variables depends on the operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSettings {
    /// Passed as `-var key=value`.
    pub vars: BTreeMap<String, String>,
    /// Passed to `init` as `-backend-config=key=value`.
    pub backend_vars: BTreeMap<String, String>,
    /// Environment overrides.
    pub env: BTreeMap<String, String>,
    /// Appended after `env` (e.g. `TF_VAR_*`).
    pub extra_env: BTreeMap<String, String>,
    pub registry: Vec<RegistryCredential>,
}

/// The phases of Terraform the orchestrator drives.
///
/// All phase calls run to completion; they are not cancelled mid-call.
pub trait ExecutionClient: Send {
    /// The directory Terraform runs in.
    fn dir(&self) -> &Path;

    fn configure(&mut self, settings: ClientSettings);

    /// Fetch `source` at `version` into [`ExecutionClient::dir`].
    fn get_module<'a>(&'a mut self, source: &'a str, version: &'a str)
    -> BoxFuture<'a, Result<()>>;

    fn init(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Write a plan to `plan_file`.
    fn plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>>;

    fn apply_with_plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>>;

    /// Plan and apply in one step, without a saved plan.
    fn apply(&mut self) -> BoxFuture<'_, Result<()>>;

    fn destroy(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Read root module outputs as strings.
    fn output(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>>;
}

/// Creates one [`ExecutionClient`] per operation.
pub trait ClientFactory: Send + Sync {
    type Client: ExecutionClient;

    /// Build a client for `binary` running in `dir`, writing its output into
    /// `pipes`.
    fn connect(&self, binary: &Path, dir: &Path, pipes: OutputPipes) -> Self::Client;
}
