// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod request;
pub mod resolve;
pub mod staging;
pub mod state;
pub mod streaming;
pub mod types;
pub mod workspace;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::client::{LocalToolchain, TerraformCliFactory};
use crate::config::{RequestFile, load_and_validate};
use crate::orchestrator::LifecycleOrchestrator;
use crate::request::ModuleSource;
use crate::state::ResourceState;
use crate::types::OperationKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - request file loading
/// - state file loading / saving
/// - the orchestrator with the real Terraform client and local toolchain
pub async fn run(args: CliArgs) -> Result<()> {
    let Some(kind) = command_kind(args.command) else {
        let state = ResourceState::load(&args.state)
            .with_context(|| format!("reading state file {}", args.state.display()))?;
        print!("{}", state.to_toml()?);
        return Ok(());
    };

    let file = load_and_validate(&args.config)
        .with_context(|| format!("loading request file {}", args.config.display()))?;

    if args.dry_run {
        print_dry_run(kind, &file);
        return Ok(());
    }

    let mut state = ResourceState::load(&args.state)
        .with_context(|| format!("reading state file {}", args.state.display()))?;

    let orchestrator = LifecycleOrchestrator::new(
        TerraformCliFactory,
        LocalToolchain::new(file.settings.install_dir.clone()),
        file.provider.clone(),
    )
    .with_options((&file.settings).into());

    match kind {
        OperationKind::Create => {
            if !state.is_empty() {
                warn!(id = %state.id, "state already records a deployed module");
            }
            state = orchestrator.create(&file.request).await?;
        }
        OperationKind::Update => {
            if state.is_empty() {
                warn!("no deployed module recorded; update behaves like create");
            } else {
                info!(id = %state.id, "updating deployed module");
            }
            state = orchestrator.update(&file.request).await?;
        }
        OperationKind::Destroy => {
            orchestrator.destroy(&file.request, &mut state).await?;
        }
    }

    state
        .save(&args.state)
        .with_context(|| format!("writing state file {}", args.state.display()))?;
    info!(path = %args.state.display(), "state saved");
    print!("{}", state.to_toml()?);

    Ok(())
}

fn command_kind(command: Command) -> Option<OperationKind> {
    match command {
        Command::Create => Some(OperationKind::Create),
        Command::Update => Some(OperationKind::Update),
        Command::Destroy => Some(OperationKind::Destroy),
        Command::Output => None,
    }
}

/// Simple dry-run output: print the resolved operation without running it.
fn print_dry_run(kind: OperationKind, file: &RequestFile) {
    let request = &file.request;

    println!("tfapply dry-run");
    println!("  operation = {kind}");
    println!("  variable delivery = {:?}", kind.variable_delivery());
    println!(
        "  terraform = {}",
        request.terraform_version.as_deref().unwrap_or("<PATH>")
    );
    println!(
        "  settings.log_drain_grace = {:?}",
        file.settings.log_drain_grace
    );
    println!("  settings.plan_file = {}", file.settings.plan_file);
    println!();

    match &request.module {
        ModuleSource::Remote { source, version } => {
            println!("module: {source} (version {version})");
        }
        ModuleSource::Local(path) => {
            println!("module: {} (local)", path.display());
        }
    }

    if !request.vars.is_empty() {
        println!("  vars:");
        for (k, v) in &request.vars {
            println!("      {k} = {v}");
        }
    }
    if !request.backend_config.is_empty() {
        println!("  backend_config:");
        for (k, v) in &request.backend_config {
            println!("      {k} = {v}");
        }
    }
    if !request.envs.is_empty() {
        println!("  envs: {:?}", request.envs.keys().collect::<Vec<_>>());
    }

    let hosts: Vec<&str> = request
        .registry
        .iter()
        .chain(file.provider.registry.iter())
        .map(|c| c.host.as_str())
        .collect();
    if !hosts.is_empty() {
        println!("  registry: {hosts:?}");
    }

    let files: Vec<_> = request
        .extra_files
        .iter()
        .chain(file.provider.extra_files.iter())
        .collect();
    if !files.is_empty() {
        println!("  extra files ({}):", files.len());
        for f in files {
            println!(
                "      {} ({} bytes, force: {}, cleanup: {})",
                f.path,
                f.content.len(),
                f.force,
                f.cleanup
            );
        }
    }

    debug!("dry-run complete (no execution)");
}
