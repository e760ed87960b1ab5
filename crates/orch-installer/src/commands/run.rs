use crate::utils::{print_installer_error, spawn_signal_handler};
use crate::{RunArgs, StateStore, logging};
use anyhow::Context;
use colored::Colorize;
use orch_installer_aws::{AwsCloudHelper, AwsStageOptions, S3StatePersister, aws_stages};
use orch_installer_config::{
    Action, Config, ConfigStore, FileConfigStore, RuntimeState, ensure_deployment_id,
};
use orch_installer_core::{
    CancellationToken, Canceller, FileStatePersister, Installer, StatePersister,
};
use orch_installer_terraform::Terraform;
use std::sync::Arc;

pub async fn handle(action: Action, args: RunArgs) -> anyhow::Result<()> {
    logging::init(&args.log_dir, &args.log_level)?;

    let store = FileConfigStore::new(&args.config, &args.runtime_state);
    let config = load_config(&store)?;
    if !config.is_aws() {
        anyhow::bail!(
            "provider '{}' is not supported, only 'aws' is",
            config.provider
        );
    }

    let existing = store
        .read_runtime_state_if_exists()
        .context("failed to read runtime state")?;
    let mut rs = prepare_runtime_state(existing, action, &args);
    tracing::info!(
        "Starting {action} of {} (deployment {})",
        config.global.orch_name,
        rs.deployment_id
    );

    let runner = Terraform::new(&args.terraform)?;
    let helper = AwsCloudHelper::new();
    let persister: Arc<dyn StatePersister> = match args.state_store {
        StateStore::File => Arc::new(FileStatePersister::new(&args.runtime_state)),
        StateStore::S3 => Arc::new(S3StatePersister::new(helper.clone())),
    };
    let stages = aws_stages(AwsStageOptions {
        root_path: args.root.clone(),
        keep_generated_files: args.keep_generated_files,
        runner: Arc::new(runner),
        helper: Arc::new(helper),
        persister,
    });

    let canceller = Canceller::default();
    let ctx = CancellationToken::new();
    spawn_signal_handler(canceller.clone(), ctx.clone());

    let mut installer = Installer::with_canceller(stages, canceller);
    let result = installer.run(&ctx, &config, &mut rs).await;

    store
        .write_runtime_state(&rs)
        .with_context(|| format!("failed to write {}", args.runtime_state.display()))?;

    match result {
        Ok(()) if installer.is_cancelled() || ctx.is_cancelled() => {
            println!("{}", format!("{action} cancelled").yellow().bold());
            Ok(())
        }
        Ok(()) => {
            println!("{}", format!("✓ {action} completed").green().bold());
            Ok(())
        }
        Err(err) => {
            tracing::error!("{action} failed: {}", err.message);
            print_installer_error(&err);
            std::process::exit(1);
        }
    }
}

fn load_config(store: &FileConfigStore) -> anyhow::Result<Config> {
    let config = store
        .read_config()
        .with_context(|| format!("failed to load {}", store.config_path().display()))?;
    config.validate().context("invalid installer config")?;
    Ok(config)
}

/// Resume from the stored runtime state when there is one, then apply this
/// run's action and flags.
fn prepare_runtime_state(
    existing: Option<RuntimeState>,
    action: Action,
    args: &RunArgs,
) -> RuntimeState {
    let mut rs = existing.unwrap_or_else(|| RuntimeState::new(action));
    rs.action = action.to_string();
    rs.log_dir = args.log_dir.to_string_lossy().to_string();
    rs.dry_run = args.dry_run;
    if ensure_deployment_id(&mut rs) {
        tracing::info!("Generated deployment ID {}", rs.deployment_id);
    }
    rs
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["test", "--config", "config.yaml"];
        argv.extend_from_slice(extra);
        TestCli::parse_from(argv).args
    }

    #[test]
    fn test_defaults() {
        let args = args(&[]);
        assert_eq!(args.runtime_state, PathBuf::from("runtime-state.yaml"));
        assert_eq!(args.state_store, StateStore::File);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_new_runtime_state_gets_deployment_id() {
        let rs = prepare_runtime_state(None, Action::Install, &args(&["--dry-run"]));
        assert_eq!(rs.action, "install");
        assert_eq!(rs.deployment_id.len(), 8);
        assert_eq!(rs.log_dir, ".logs");
        assert!(rs.dry_run);
    }

    #[test]
    fn test_existing_runtime_state_is_resumed() {
        let mut existing = RuntimeState::new(Action::Install);
        existing.deployment_id = "ab12cd34".to_string();
        existing.aws.vpc_id = "vpc-0abc".to_string();

        let rs = prepare_runtime_state(
            Some(existing),
            Action::Uninstall,
            &args(&["--log-dir", "/var/log/orch"]),
        );
        assert_eq!(rs.action, "uninstall");
        assert_eq!(rs.deployment_id, "ab12cd34");
        assert_eq!(rs.aws.vpc_id, "vpc-0abc");
        assert_eq!(rs.log_dir, "/var/log/orch");
    }

    #[tokio::test]
    async fn test_phase_writes_land_in_resumed_file() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("my-state.yaml");
        let args = args(&["--runtime-state", state_file.to_str().unwrap()]);

        let mut rs = prepare_runtime_state(None, Action::Install, &args);
        rs.aws.vpc_id = "vpc-0abc".to_string();
        let persister = FileStatePersister::new(&args.runtime_state);
        persister.persist(&Config::default(), &rs).await.unwrap();

        let store = FileConfigStore::new(&args.config, &args.runtime_state);
        let resumed = store.read_runtime_state_if_exists().unwrap().unwrap();
        assert_eq!(resumed, rs);
        assert!(!dir.path().join("runtime-state.yaml").exists());
    }
}
