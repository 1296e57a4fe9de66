// src/orchestrator.rs

//! Lifecycle operations on top of the Terraform phases.
//!
//! One operation runs the steps below in order and stops at the first
//! failure:
//!
//! ```text
//! acquire workspace -> resolve binary -> start log streaming
//!   -> get module (remote only) -> stage extra files -> init
//!   -> plan -> apply -> output      (create / update)
//!   -> destroy                      (destroy)
//!   -> clean up extra files -> release workspace
//! ```
//!
//! Clean-up and release happen on every exit path. Failures after log
//! streaming started are reported as [`ApplyError::Phase`], with everything
//! Terraform wrote to stderr in front of the phase label.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::client::{ClientFactory, ExecutionClient, ToolchainProvider};
use crate::config::Settings;
use crate::errors::{ApplyError, Result};
use crate::request::{AuxiliaryFileSpec, ModuleSource, OperationRequest, ProviderSettings};
use crate::resolve::{merge_files, resolve};
use crate::staging::FileStager;
use crate::state::ResourceState;
use crate::streaming::{ErrorBuffer, LogStreamer, output_pipes};
use crate::types::{OperationKind, Phase};
use crate::workspace::Workspace;

/// Tunables of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Upper bound on waiting for the output readers before reporting a
    /// failure.
    pub log_drain_grace: Duration,
    /// File name of the plan artifact inside the working directory.
    pub plan_file: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            log_drain_grace: Duration::from_secs(2),
            plan_file: ".tfapply.tfplan".to_string(),
        }
    }
}

impl From<&Settings> for OrchestratorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            log_drain_grace: settings.log_drain_grace,
            plan_file: settings.plan_file.clone(),
        }
    }
}

/// A failed step, before diagnostics are attached.
#[derive(Debug)]
struct StepFailure {
    phase: Phase,
    source: ApplyError,
}

fn step(phase: Phase) -> impl FnOnce(ApplyError) -> StepFailure {
    move |source| StepFailure { phase, source }
}

/// Drives create/update/destroy for one module.
///
/// Process-wide settings (`provider`) are shared by every operation and are
/// never modified by one.
pub struct LifecycleOrchestrator<F, T>
where
    F: ClientFactory,
    T: ToolchainProvider,
{
    clients: F,
    toolchain: T,
    provider: ProviderSettings,
    stager: FileStager,
    options: OrchestratorOptions,
}

impl<F, T> LifecycleOrchestrator<F, T>
where
    F: ClientFactory,
    T: ToolchainProvider,
{
    pub fn new(clients: F, toolchain: T, provider: ProviderSettings) -> Self {
        Self {
            clients,
            toolchain,
            provider,
            stager: FileStager::default(),
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Plan and apply the module; returns its identity and outputs.
    pub async fn create(&self, request: &OperationRequest) -> Result<ResourceState> {
        self.apply(request, OperationKind::Create).await
    }

    /// Same as [`create`](Self::create): plan/apply converges on the desired
    /// state, so there is nothing to diff here.
    pub async fn update(&self, request: &OperationRequest) -> Result<ResourceState> {
        self.apply(request, OperationKind::Update).await
    }

    /// Destroy the module and clear `state`.
    ///
    /// Variables are passed as `TF_VAR_*` environment entries so a variable
    /// the module no longer declares cannot fail the destroy.
    pub async fn destroy(
        &self,
        request: &OperationRequest,
        state: &mut ResourceState,
    ) -> Result<()> {
        if !state.is_empty() {
            info!(id = %state.id, "destroying resource");
        }
        self.execute(request, OperationKind::Destroy).await?;
        state.clear();
        Ok(())
    }

    async fn apply(&self, request: &OperationRequest, kind: OperationKind) -> Result<ResourceState> {
        let outputs = self.execute(request, kind).await?;
        let state = ResourceState::new(request.module.identity(), outputs);
        info!(id = %state.id, outputs = state.outputs.len(), "operation complete");
        Ok(state)
    }

    async fn execute(
        &self,
        request: &OperationRequest,
        kind: OperationKind,
    ) -> Result<BTreeMap<String, String>> {
        info!(operation = %kind, module = %request.module, "starting operation");

        let workspace = Workspace::acquire(&request.module)?;
        debug!(dir = %workspace.path().display(), owned = workspace.is_owned(), "terraform working dir");

        let result = match self.toolchain.resolve(request.terraform_version.as_deref()) {
            Ok(binary) => self.execute_in(&workspace, &binary, request, kind).await,
            Err(e) => Err(e),
        };

        workspace.release();
        result
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        binary: &Path,
        request: &OperationRequest,
        kind: OperationKind,
    ) -> Result<BTreeMap<String, String>> {
        let (pipes, readers) = output_pipes();
        let buffer = ErrorBuffer::new();
        let mut streamer = LogStreamer::start(readers, buffer.clone());

        let mut client = self.clients.connect(binary, workspace.path(), pipes);
        client.configure(resolve(request, &self.provider, kind));
        let files = merge_files(&request.extra_files, &self.provider.extra_files);

        let result = self.drive(&mut client, request, &files, kind).await;

        // Closing the client's pipes lets the readers reach end of stream.
        drop(client);

        match result {
            Ok(outputs) => Ok(outputs),
            Err(failure) => {
                streamer.settle(self.options.log_drain_grace).await;
                error!(phase = %failure.phase, error = %failure.source, "operation failed");
                Err(ApplyError::Phase {
                    phase: failure.phase,
                    diagnostics: buffer.contents(),
                    source: Box::new(failure.source),
                })
            }
        }
    }

    async fn drive(
        &self,
        client: &mut F::Client,
        request: &OperationRequest,
        files: &[AuxiliaryFileSpec],
        kind: OperationKind,
    ) -> std::result::Result<BTreeMap<String, String>, StepFailure> {
        if let ModuleSource::Remote { source, version } = &request.module {
            info!(source = %source, version = %version, "download terraform module");
            client
                .get_module(source, version)
                .await
                .map_err(step(Phase::GetModule))?;
        }

        let dir = client.dir().to_path_buf();
        let staged = self.stager.write(&dir, files);

        // A conflict is reported before anything is written, so there is
        // nothing of ours to remove; the colliding file belongs to the module.
        let wrote_files = !matches!(staged, Err(ApplyError::FileConflict { .. }));

        let result = match staged {
            Ok(()) => self.run_phases(client, &dir, kind).await,
            Err(e) => Err(StepFailure {
                phase: Phase::StageFiles,
                source: e,
            }),
        };

        if wrote_files {
            self.stager.cleanup(&dir, files);
        }
        result
    }

    async fn run_phases(
        &self,
        client: &mut F::Client,
        dir: &Path,
        kind: OperationKind,
    ) -> std::result::Result<BTreeMap<String, String>, StepFailure> {
        info!("terraform init");
        client.init().await.map_err(step(Phase::Init))?;

        match kind {
            OperationKind::Create | OperationKind::Update => {
                let plan = PlanArtifact::new(dir.join(&self.options.plan_file));

                info!("terraform plan");
                client.plan(plan.path()).await.map_err(step(Phase::Plan))?;

                info!("terraform apply");
                client
                    .apply_with_plan(plan.path())
                    .await
                    .map_err(step(Phase::Apply))?;

                client.output().await.map_err(step(Phase::Output))
            }
            OperationKind::Destroy => {
                info!("terraform destroy");
                client.destroy().await.map_err(step(Phase::Destroy))?;
                Ok(BTreeMap::new())
            }
        }
    }
}

/// The saved plan of one create/update; removed when dropped.
#[derive(Debug)]
struct PlanArtifact {
    path: PathBuf,
}

impl PlanArtifact {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PlanArtifact {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed plan file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove plan file"),
        }
    }
}
