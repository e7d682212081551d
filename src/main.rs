use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vpath::fs::{BackendMetrics, Instrumented};
use vpath::providers::{self, BackendOptions};
use vpath::{DatasetConfig, Location, VersionResolver};

/// Inspect dataset versions and resolve load/save paths
#[derive(Parser)]
#[command(name = "vpath", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON dataset config; a LOCATION argument overrides its base_location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend credential, may be repeated (e.g. -c key=AKIA... -c region=eu-west-1)
    #[arg(short = 'c', long = "credential", global = true, value_name = "KEY=VALUE", value_parser = parse_key_val)]
    credentials: Vec<(String, String)>,

    /// Print backend call statistics
    #[arg(long, global = true)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List existing versions, oldest first
    Versions { location: Option<String> },

    /// Resolve the path a load would read
    LoadPath {
        location: Option<String>,
        /// Explicit version instead of the latest
        #[arg(long)]
        version: Option<String>,
    },

    /// Resolve the path a save would write, checking for conflicts
    SavePath {
        location: Option<String>,
        /// Explicit version instead of a fresh timestamp
        #[arg(long)]
        version: Option<String>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the config file, positional location and flags into one config
fn build_config(cli: &Cli, location: Option<&str>) -> Result<DatasetConfig> {
    let mut config = match &cli.config {
        Some(path) => DatasetConfig::from_file(path)?,
        None => {
            let location = location.context("a LOCATION or --config is required")?;
            DatasetConfig::new(location)
        }
    };
    if let (Some(location), Some(_)) = (location, &cli.config) {
        config.base_location = location.to_string();
    }
    config.credentials.extend(cli.credentials.iter().cloned());
    Ok(config)
}

async fn resolver_for(
    config: &DatasetConfig,
    metrics: Arc<BackendMetrics>,
) -> Result<(Location, VersionResolver)> {
    let (location, spec) = config.validate()?;
    let Some(spec) = spec else {
        bail!("dataset '{}' is not versioned", config.base_location);
    };

    let options = BackendOptions::default()
        .with_credentials(config.credentials.clone())
        .versioned(true);
    let fs = providers::filesystem_for(&location, &options).await?;
    let fs = Arc::new(Instrumented::with_metrics(fs, metrics));
    let resolver = VersionResolver::for_location(&location, spec, fs)?;
    Ok((location, resolver))
}

async fn run(cli: Cli) -> Result<()> {
    let metrics = BackendMetrics::new();

    match &cli.command {
        Command::Versions { location } => {
            let config = build_config(&cli, location.as_deref())?;
            let (location, resolver) = resolver_for(&config, Arc::clone(&metrics)).await?;
            let versions = resolver.list_versions().await?;

            if versions.is_empty() {
                println!("{} no versions under {}", "-".dimmed(), location);
            }
            let latest = versions.last().cloned();
            for version in &versions {
                if Some(version) == latest.as_ref() {
                    println!("{} {}", version.as_str().green().bold(), "(latest)".dimmed());
                } else {
                    println!("{version}");
                }
            }
        }

        Command::LoadPath { location, version } => {
            let mut config = build_config(&cli, location.as_deref())?;
            if version.is_some() {
                config.load_version = version.clone();
            }
            let (location, mut resolver) = resolver_for(&config, Arc::clone(&metrics)).await?;
            let path = resolver.resolve_load_path().await?;
            println!("{}{}", location.prefix(), path);
        }

        Command::SavePath { location, version } => {
            let mut config = build_config(&cli, location.as_deref())?;
            if version.is_some() {
                config.save_version = version.clone();
            }
            let (location, mut resolver) = resolver_for(&config, Arc::clone(&metrics)).await?;
            let path = resolver.resolve_save_path().await?;
            println!("{}{}", location.prefix(), path);
        }
    }

    if cli.stats {
        eprintln!(
            "{} {} exists, {} glob, {:?} total",
            "backend calls:".cyan(),
            metrics.exists_calls(),
            metrics.glob_calls(),
            metrics.total_time()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("endpoint_url=http://localhost:4566").unwrap(),
            ("endpoint_url".to_string(), "http://localhost:4566".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vpath",
            "load-path",
            "s3a://bucket/cars",
            "--version",
            "v1",
            "-c",
            "region=eu-west-1",
            "--stats",
        ])
        .unwrap();
        assert!(cli.stats);
        assert_eq!(cli.credentials, vec![("region".to_string(), "eu-west-1".to_string())]);
        assert!(matches!(cli.command, Command::LoadPath { version: Some(ref v), .. } if v == "v1"));
    }

    #[test]
    fn test_build_config_requires_location() {
        let cli = Cli::try_parse_from(["vpath", "versions"]).unwrap();
        assert!(build_config(&cli, None).is_err());

        let cli = Cli::try_parse_from(["vpath", "versions", "data/cars", "-c", "user=etl"]).unwrap();
        let config = build_config(&cli, Some("data/cars")).unwrap();
        assert_eq!(config.base_location, "data/cars");
        assert_eq!(config.credentials["user"], "etl");
    }
}
