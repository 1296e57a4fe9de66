// src/client/terraform.rs

//! `ExecutionClient` backed by the real `terraform` binary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tokio::io::{AsyncRead, DuplexStream};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{ApplyError, Result};
use crate::request::RegistryCredential;
use crate::streaming::OutputPipes;

use super::{BoxFuture, ClientFactory, ClientSettings, ExecutionClient};

/// Module key used in the scratch configuration `get_module` writes.
const FETCH_MODULE_KEY: &str = "root";

/// Runs Terraform phases as child processes in one working directory.
///
/// stdout and stderr of every phase are copied into the [`OutputPipes`] the
/// client was created with. Child processes are killed if the phase future is
/// dropped.
#[derive(Debug)]
pub struct TerraformCli {
    binary: PathBuf,
    dir: PathBuf,
    settings: ClientSettings,
    pipes: OutputPipes,
}

impl TerraformCli {
    pub fn new(binary: impl Into<PathBuf>, dir: impl Into<PathBuf>, pipes: OutputPipes) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
            settings: ClientSettings::default(),
            pipes,
        }
    }

    fn command(&self, dir: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .envs(&self.settings.env)
            .envs(&self.settings.extra_env)
            .envs(registry_env(&self.settings.registry))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run terraform in `dir`, forwarding both output streams.
    async fn run_in(&mut self, dir: &Path, args: Vec<String>) -> Result<()> {
        info!(dir = %dir.display(), args = %args.join(" "), "running terraform");

        let mut child = self
            .command(dir, &args)
            .spawn()
            .with_context(|| format!("spawning terraform at {}", self.binary.display()))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let OutputPipes {
            stdout: stdout_pipe,
            stderr: stderr_pipe,
        } = &mut self.pipes;

        let (status, (), ()) = tokio::join!(
            child.wait(),
            forward(stdout, stdout_pipe),
            forward(stderr, stderr_pipe),
        );
        let status = status.context("waiting for terraform")?;

        debug!(exit_code = ?status.code(), "terraform exited");
        if !status.success() {
            return Err(command_error(&args, status.code()));
        }
        Ok(())
    }

    async fn run(&mut self, args: Vec<String>) -> Result<()> {
        let dir = self.dir.clone();
        self.run_in(&dir, args).await
    }

    fn var_args(&self) -> impl Iterator<Item = String> + '_ {
        self.settings
            .vars
            .iter()
            .map(|(k, v)| format!("-var={k}={v}"))
    }

    async fn fetch_module(&mut self, source: &str, version: &str) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("tfapply-get-")
            .tempdir()
            .context("creating module download dir")?;

        let wrapper = format!(
            "module \"{FETCH_MODULE_KEY}\" {{\n  source  = {}\n  version = {}\n}}\n",
            hcl_string(source),
            hcl_string(version),
        );
        fs::write(scratch.path().join("main.tf"), wrapper)
            .context("writing module download wrapper")?;

        self.run_in(scratch.path(), args(&["get", "-no-color"])).await?;

        let module_dir = fetched_module_dir(scratch.path())?;
        let target = self.dir.clone();
        debug!(from = %module_dir.display(), to = %target.display(), "copying module");
        tokio::task::spawn_blocking(move || copy_dir_all(&module_dir, &target))
            .await
            .map_err(|e| anyhow!("module copy task failed: {e}"))??;

        Ok(())
    }

    async fn read_output(&mut self) -> Result<BTreeMap<String, String>> {
        let args = args(&["output", "-json", "-no-color"]);
        let mut child = self
            .command(&self.dir, &args)
            .spawn()
            .with_context(|| format!("spawning terraform at {}", self.binary.display()))?;
        let stderr = child.stderr.take();
        let stderr_pipe = &mut self.pipes.stderr;

        let (output, ()) = tokio::join!(child.wait_with_output(), forward(stderr, stderr_pipe));
        let output = output.context("waiting for terraform output")?;
        if !output.status.success() {
            return Err(command_error(&args, output.status.code()));
        }

        parse_outputs(&output.stdout)
    }
}

impl ExecutionClient for TerraformCli {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn configure(&mut self, settings: ClientSettings) {
        self.settings = settings;
    }

    fn get_module<'a>(
        &'a mut self,
        source: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.fetch_module(source, version))
    }

    fn init(&mut self) -> BoxFuture<'_, Result<()>> {
        let mut argv = args(&["init", "-input=false", "-no-color"]);
        argv.extend(
            self.settings
                .backend_vars
                .iter()
                .map(|(k, v)| format!("-backend-config={k}={v}")),
        );
        Box::pin(self.run(argv))
    }

    fn plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>> {
        let mut argv = args(&["plan", "-input=false", "-no-color"]);
        argv.push(format!("-out={}", plan_file.display()));
        argv.extend(self.var_args());
        Box::pin(self.run(argv))
    }

    fn apply_with_plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>> {
        // Variables are baked into the saved plan.
        let mut argv = args(&["apply", "-input=false", "-no-color", "-auto-approve"]);
        argv.push(plan_file.display().to_string());
        Box::pin(self.run(argv))
    }

    fn apply(&mut self) -> BoxFuture<'_, Result<()>> {
        let mut argv = args(&["apply", "-input=false", "-no-color", "-auto-approve"]);
        argv.extend(self.var_args());
        Box::pin(self.run(argv))
    }

    fn destroy(&mut self) -> BoxFuture<'_, Result<()>> {
        let mut argv = args(&["destroy", "-input=false", "-no-color", "-auto-approve"]);
        argv.extend(self.var_args());
        Box::pin(self.run(argv))
    }

    fn output(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(self.read_output())
    }
}

/// Builds [`TerraformCli`] clients.
#[derive(Debug, Clone, Default)]
pub struct TerraformCliFactory;

impl ClientFactory for TerraformCliFactory {
    type Client = TerraformCli;

    fn connect(&self, binary: &Path, dir: &Path, pipes: OutputPipes) -> TerraformCli {
        TerraformCli::new(binary, dir, pipes)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn command_error(args: &[String], code: Option<i32>) -> ApplyError {
    ApplyError::Command {
        program: "terraform".to_string(),
        args: args.join(" "),
        code: code.unwrap_or(-1),
    }
}

/// Copy a child stream into a pipe.
///
/// If the pipe's reader is gone the rest of the stream is discarded, so the
/// child never blocks on a full OS pipe.
async fn forward<R>(from: Option<R>, to: &mut DuplexStream)
where
    R: AsyncRead + Unpin,
{
    let Some(mut from) = from else {
        return;
    };
    if let Err(e) = tokio::io::copy(&mut from, to).await {
        debug!(error = %e, "output pipe closed; discarding remaining output");
        let _ = tokio::io::copy(&mut from, &mut tokio::io::sink()).await;
    }
}

/// `TF_TOKEN_<host>` environment entries for registry credentials.
///
/// Dots in the host become `_` and dashes `__`. When a host appears more
/// than once the first credential wins.
pub fn registry_env(creds: &[RegistryCredential]) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for cred in creds {
        let host = cred.host.replace('-', "__").replace('.', "_");
        env.entry(format!("TF_TOKEN_{host}"))
            .or_insert_with(|| cred.token.clone());
    }
    env
}

fn hcl_string(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[derive(Debug, Deserialize)]
struct ModulesManifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Dir")]
    dir: String,
}

/// Locate the downloaded module through `.terraform/modules/modules.json`.
fn fetched_module_dir(scratch: &Path) -> Result<PathBuf> {
    let manifest_path = scratch.join(".terraform").join("modules").join("modules.json");
    let raw = fs::read(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let manifest: ModulesManifest = serde_json::from_slice(&raw)?;

    manifest
        .modules
        .into_iter()
        .find(|m| m.key == FETCH_MODULE_KEY)
        .map(|m| scratch.join(m.dir))
        .ok_or_else(|| anyhow!("downloaded module not listed in {}", manifest_path.display()).into())
}

fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("creating {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("reading {}", from.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let src = entry.path();
        let dst = to.join(&name);
        if entry.file_type()?.is_dir() {
            copy_dir_all(&src, &dst)?;
        } else {
            fs::copy(&src, &dst).with_context(|| format!("copying {}", src.display()))?;
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct OutputEntry {
    value: serde_json::Value,
}

/// Parse `terraform output -json` into string values.
///
/// Strings are taken verbatim; any other value is rendered as JSON.
pub fn parse_outputs(raw: &[u8]) -> Result<BTreeMap<String, String>> {
    let entries: BTreeMap<String, OutputEntry> = serde_json::from_slice(raw)?;
    Ok(entries
        .into_iter()
        .map(|(name, entry)| {
            let value = match entry.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}
