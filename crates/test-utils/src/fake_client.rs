use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tfapply::client::{
    BoxFuture, ClientFactory, ClientSettings, ExecutionClient, ToolchainProvider,
};
use tfapply::errors::{ApplyError, Result};
use tfapply::streaming::OutputPipes;
use tfapply::types::Phase;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// What the fake clients of one factory saw.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    /// Phases in call order.
    pub calls: Vec<Phase>,
    pub binary: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub settings: Option<ClientSettings>,
    /// `(source, version)` passed to `get_module`.
    pub module: Option<(String, String)>,
    /// Files in the working directory when `init` ran, relative and
    /// slash-separated.
    pub files_at_init: Vec<String>,
    pub plan_files: Vec<PathBuf>,
}

/// Hands out [`FakeClient`]s that:
/// - record every call into a shared [`Recorded`]
/// - fail a scripted phase after writing the given lines to stderr
/// - reject `-var` values the module does not declare, like Terraform does
/// - echo the native variables back as outputs.
#[derive(Debug, Clone, Default)]
pub struct FakeClientFactory {
    recorded: Arc<Mutex<Recorded>>,
    failures: Vec<(Phase, Vec<String>)>,
    declared_vars: Option<BTreeSet<String>>,
    module_files: Vec<(String, String)>,
}

impl FakeClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `phase` fail after writing `stderr` line by line.
    pub fn fail_at(mut self, phase: Phase, stderr: &[&str]) -> Self {
        self.failures
            .push((phase, stderr.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// Restrict the variables the module accepts on the command line.
    pub fn declare_vars(mut self, names: &[&str]) -> Self {
        self.declared_vars = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// A file `get_module` drops into the working directory.
    pub fn with_module_file(mut self, path: &str, content: &str) -> Self {
        self.module_files
            .push((path.to_string(), content.to_string()));
        self
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Phase> {
        self.recorded.lock().unwrap().calls.clone()
    }
}

impl ClientFactory for FakeClientFactory {
    type Client = FakeClient;

    fn connect(&self, binary: &Path, dir: &Path, pipes: OutputPipes) -> FakeClient {
        {
            let mut rec = self.recorded.lock().unwrap();
            rec.binary = Some(binary.to_path_buf());
            rec.dir = Some(dir.to_path_buf());
        }

        FakeClient {
            dir: dir.to_path_buf(),
            settings: ClientSettings::default(),
            pipes,
            recorded: Arc::clone(&self.recorded),
            failures: self.failures.clone(),
            declared_vars: self.declared_vars.clone(),
            module_files: self.module_files.clone(),
        }
    }
}

pub struct FakeClient {
    dir: PathBuf,
    settings: ClientSettings,
    pipes: OutputPipes,
    recorded: Arc<Mutex<Recorded>>,
    failures: Vec<(Phase, Vec<String>)>,
    declared_vars: Option<BTreeSet<String>>,
    module_files: Vec<(String, String)>,
}

impl FakeClient {
    /// Record the call, echo it on stdout and apply a scripted failure.
    async fn enter(&mut self, phase: Phase) -> Result<()> {
        self.recorded.lock().unwrap().calls.push(phase);

        let name = subcommand(phase);
        debug!(phase = %phase, subcommand = name, "fake terraform call");
        let _ = self
            .pipes
            .stdout
            .write_all(format!("fake terraform {name}\n").as_bytes())
            .await;

        let lines = self
            .failures
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, lines)| lines.clone());

        match lines {
            Some(lines) => self.fail(name, &lines).await,
            None => Ok(()),
        }
    }

    async fn fail(&mut self, name: &str, stderr: &[String]) -> Result<()> {
        for line in stderr {
            let _ = self
                .pipes
                .stderr
                .write_all(format!("{line}\n").as_bytes())
                .await;
        }
        let _ = self.pipes.stderr.flush().await;

        Err(ApplyError::Command {
            program: "terraform".to_string(),
            args: name.to_string(),
            code: 1,
        })
    }

    async fn check_declared(&mut self, name: &str) -> Result<()> {
        let Some(declared) = &self.declared_vars else {
            return Ok(());
        };
        let undeclared: Vec<String> = self
            .settings
            .vars
            .keys()
            .filter(|k| !declared.contains(*k))
            .map(|k| format!("Error: Value for undeclared variable \"{k}\""))
            .collect();

        if undeclared.is_empty() {
            Ok(())
        } else {
            self.fail(name, &undeclared).await
        }
    }
}

impl ExecutionClient for FakeClient {
    fn dir(&self) -> &Path {
        &self.dir
    }

    fn configure(&mut self, settings: ClientSettings) {
        self.recorded.lock().unwrap().settings = Some(settings.clone());
        self.settings = settings;
    }

    fn get_module<'a>(
        &'a mut self,
        source: &'a str,
        version: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::GetModule).await?;
            self.recorded.lock().unwrap().module =
                Some((source.to_string(), version.to_string()));

            for (path, content) in &self.module_files {
                let target = self.dir.join(path);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(target, content)?;
            }
            Ok(())
        })
    }

    fn init(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::Init).await?;
            let files = list_files(&self.dir);
            self.recorded.lock().unwrap().files_at_init = files;
            Ok(())
        })
    }

    fn plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::Plan).await?;
            self.check_declared("plan").await?;
            fs::write(plan_file, b"fake plan")?;
            self.recorded
                .lock()
                .unwrap()
                .plan_files
                .push(plan_file.to_path_buf());
            Ok(())
        })
    }

    fn apply_with_plan<'a>(&'a mut self, plan_file: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::Apply).await?;
            if !plan_file.exists() {
                let line = format!("Error: Failed to load \"{}\" as a plan file", plan_file.display());
                return self.fail("apply", &[line]).await;
            }
            Ok(())
        })
    }

    fn apply(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::Apply).await?;
            self.check_declared("apply").await
        })
    }

    fn destroy(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(Phase::Destroy).await?;
            self.check_declared("destroy").await
        })
    }

    fn output(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            self.enter(Phase::Output).await?;
            Ok(self.settings.vars.clone())
        })
    }
}

fn subcommand(phase: Phase) -> &'static str {
    match phase {
        Phase::GetModule => "get",
        Phase::StageFiles => "stage",
        Phase::Init => "init",
        Phase::Plan => "plan",
        Phase::Apply => "apply",
        Phase::Destroy => "destroy",
        Phase::Output => "output",
    }
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    collect(dir, dir, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(parts.join("/"));
        }
    }
}

/// Toolchain that never touches disk.
///
/// Versions resolve to `/fake/<version>/terraform`, no version to
/// `/fake/bin/terraform`.
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    requested: Arc<Mutex<Vec<Option<String>>>>,
    missing: bool,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails as if Terraform were not installed.
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    pub fn requested(&self) -> Vec<Option<String>> {
        self.requested.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.missing {
            Err(ApplyError::Toolchain(
                "cannot find terraform executable in PATH".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl ToolchainProvider for FakeToolchain {
    fn download_terraform(&self, version: &str, _force_redownload: bool) -> Result<PathBuf> {
        self.requested
            .lock()
            .unwrap()
            .push(Some(version.to_string()));
        self.check()?;
        Ok(PathBuf::from("/fake").join(version).join("terraform"))
    }

    fn lookup(&self) -> Result<PathBuf> {
        self.requested.lock().unwrap().push(None);
        self.check()?;
        Ok(PathBuf::from("/fake/bin/terraform"))
    }
}
