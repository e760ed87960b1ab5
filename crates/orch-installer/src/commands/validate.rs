use colored::Colorize;
use orch_installer_config::Config;
use std::path::Path;

pub fn handle(path: &Path) -> anyhow::Result<()> {
    println!("{}", "Validating config...".blue());

    let config = match std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|data| Ok(Config::from_yaml(&data)?))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Cannot read config".red().bold());
            eprintln!("  {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!();
        eprintln!("{}", "✗ Config error".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    println!("{}", "✓ Config is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  Orchestrator: {}", config.global.orch_name.cyan());
    println!("  Provider: {}", config.provider.cyan());
    if config.is_aws() {
        println!("  Region: {}", config.aws.region.cyan());
        if !config.aws.vpc_id.is_empty() {
            println!("  Existing VPC: {}", config.aws.vpc_id.cyan());
        }
    }
    if !config.advanced.target_labels.is_empty() {
        println!(
            "  Target labels: {}",
            config.advanced.target_labels.join(", ").cyan()
        );
    }
    Ok(())
}
