//! terraform CLI wrapper
//!
//! Drives the `terraform` binary through `tokio::process`. Every command
//! runs inside the module directory, appends its output to the step log file
//! and is killed when the cancellation token fires.

use crate::error::{Result, TerraformError};
use crate::runner::{
    ModuleRunner, MoveStatesInput, OutputValue, RemoveStatesInput, RunInput, RunOutput,
    validate_input,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const ENVIRONMENTS_DIR: &str = "environments";
const VARIABLES_FILE: &str = "variables.tfvars.json";
const BACKEND_FILE: &str = "backend.tfvars.json";
const LOCAL_STATE_FILE: &str = "terraform.tfstate";

/// terraform CLI wrapper
#[derive(Debug, Clone)]
pub struct Terraform {
    exec_path: PathBuf,
}

impl Terraform {
    pub fn new(exec_path: impl Into<PathBuf>) -> Result<Self> {
        let exec_path = exec_path.into();
        if exec_path.as_os_str().is_empty() {
            return Err(TerraformError::InvalidInput(
                "exec path must be specified".to_string(),
            ));
        }
        Ok(Self { exec_path })
    }

    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    /// Run a terraform command in `module_path` and return stdout.
    async fn run_command(
        &self,
        ctx: &CancellationToken,
        module_path: &Path,
        args: &[String],
        log_file: Option<&Path>,
    ) -> Result<String> {
        let name = args.first().cloned().unwrap_or_default();
        let mut cmd = Command::new(&self.exec_path);
        cmd.current_dir(module_path);
        cmd.args(args);
        cmd.env("TF_IN_AUTOMATION", "1");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(
            "Running: {} {} (in {})",
            self.exec_path.display(),
            args.join(" "),
            module_path.display()
        );

        let child = cmd.spawn().map_err(|source| TerraformError::Spawn {
            command: self.exec_path.display().to_string(),
            source,
        })?;

        // Dropping the child on cancellation kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = ctx.cancelled() => {
                tracing::warn!("terraform {name} cancelled");
                return Err(TerraformError::Cancelled(name));
            }
        };

        if let Some(log_file) = log_file {
            append_log(log_file, &output.stdout, &output.stderr).await?;
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TerraformError::CommandFailed {
                command: name,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn init(
        &self,
        ctx: &CancellationToken,
        input: &RunInput,
        backend_file: Option<&Path>,
    ) -> Result<()> {
        let mut args = base_args("init");
        args.push("-upgrade".to_string());
        args.push("-reconfigure".to_string());
        match backend_file {
            Some(path) => args.push(format!("-backend-config={}", path.display())),
            None => args.push("-backend=false".to_string()),
        }
        self.run_command(ctx, &input.module_path, &args, Some(input.log_file.as_path()))
            .await?;
        Ok(())
    }

    async fn output(
        &self,
        ctx: &CancellationToken,
        module_path: &Path,
    ) -> Result<BTreeMap<String, OutputValue>> {
        let args = ["output".to_string(), "-json".to_string()];
        let stdout = self.run_command(ctx, module_path, &args, None).await?;
        if stdout.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&stdout)?)
    }
}

fn base_args(command: &str) -> Vec<String> {
    vec![
        command.to_string(),
        "-input=false".to_string(),
        "-no-color".to_string(),
    ]
}

/// Arguments of the apply, destroy or plan invocation for `input`.
pub fn action_args(input: &RunInput, var_file: &Path) -> Vec<String> {
    let destroy = input.is_destroy();
    let mut args = if input.dry_run {
        let mut args = base_args("plan");
        if destroy {
            args.push("-destroy".to_string());
        }
        args
    } else if destroy {
        let mut args = base_args("destroy");
        args.push("-auto-approve".to_string());
        args
    } else {
        let mut args = base_args("apply");
        args.push("-auto-approve".to_string());
        args
    };

    if destroy {
        args.push("-refresh=false".to_string());
        if let Some(target) = &input.destroy_target {
            args.push(format!("-target={target}"));
        }
    }
    args.push(format!("-var-file={}", var_file.display()));
    args
}

async fn append_log(path: &Path, stdout: &[u8], stderr: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(stdout).await?;
    file.write_all(stderr).await?;
    file.flush().await?;
    Ok(())
}

async fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    fs::write(path, content)
        .await
        .map_err(|source| TerraformError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Files generated for one run
struct GeneratedFiles {
    variables: PathBuf,
    backend: Option<PathBuf>,
}

impl GeneratedFiles {
    async fn write(input: &RunInput) -> Result<Self> {
        let env_dir = input.module_path.join(ENVIRONMENTS_DIR);
        fs::create_dir_all(&env_dir).await?;

        let variables = env_dir.join(VARIABLES_FILE);
        write_json(&variables, &input.variables).await?;

        let backend = match &input.backend_config {
            Some(config) => {
                let path = env_dir.join(BACKEND_FILE);
                write_json(&path, config).await?;
                Some(path)
            }
            None => None,
        };
        tracing::debug!("Backend and variables files created successfully");
        Ok(Self { variables, backend })
    }

    async fn remove(&self) {
        for path in std::iter::once(&self.variables).chain(self.backend.as_ref()) {
            if path.exists() {
                tracing::debug!("Deleting {}", path.display());
                if let Err(e) = fs::remove_file(path).await {
                    tracing::warn!("Failed to delete {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[async_trait]
impl ModuleRunner for Terraform {
    async fn run(&self, ctx: &CancellationToken, input: &RunInput) -> Result<RunOutput> {
        validate_input(input)?;

        let files = GeneratedFiles::write(input).await?;
        let result = self.apply_module(ctx, input, &files).await;
        if !input.keep_generated_files {
            files.remove().await;
        }
        result
    }

    async fn move_states(&self, ctx: &CancellationToken, input: &MoveStatesInput) -> Result<()> {
        for (from, to) in &input.states {
            tracing::info!("Moving state {from} to {to}");
            let args = vec![
                "state".to_string(),
                "mv".to_string(),
                from.clone(),
                to.clone(),
            ];
            self.run_command(ctx, &input.module_path, &args, None).await?;
        }
        Ok(())
    }

    async fn remove_states(
        &self,
        ctx: &CancellationToken,
        input: &RemoveStatesInput,
    ) -> Result<()> {
        for address in &input.states {
            tracing::info!("Removing state {address}");
            let args = vec!["state".to_string(), "rm".to_string(), address.clone()];
            self.run_command(ctx, &input.module_path, &args, None).await?;
        }
        Ok(())
    }
}

impl Terraform {
    async fn apply_module(
        &self,
        ctx: &CancellationToken,
        input: &RunInput,
        files: &GeneratedFiles,
    ) -> Result<RunOutput> {
        let state_path = input.module_path.join(LOCAL_STATE_FILE);

        match &files.backend {
            Some(backend) => self.init(ctx, input, Some(backend.as_path())).await?,
            None => {
                if state_path.exists() {
                    tracing::debug!("Deleting stale local state {}", state_path.display());
                    fs::remove_file(&state_path).await?;
                }
                self.init(ctx, input, None).await?;
                if let Some(state) = input.state.as_deref().filter(|s| !s.is_empty()) {
                    tracing::debug!("Loading local state from runtime state");
                    fs::write(&state_path, state)
                        .await
                        .map_err(|source| TerraformError::WriteFile {
                            path: state_path.clone(),
                            source,
                        })?;
                }
            }
        }

        let args = action_args(input, &files.variables);
        tracing::info!(
            "terraform {} {}",
            args[0],
            input.module_path.display()
        );
        self.run_command(ctx, &input.module_path, &args, Some(input.log_file.as_path()))
            .await?;

        let outputs = self.output(ctx, &input.module_path).await?;

        let state = if files.backend.is_none() && state_path.exists() {
            fs::read_to_string(&state_path).await?
        } else {
            String::new()
        };

        Ok(RunOutput { outputs, state })
    }
}
