//! CLI argument parsing and command dispatch

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use containerburn_core::BurnConfig;

pub use commands::dispatch;

#[derive(Parser)]
#[command(name = "containerburn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Churn containers until stopped (the default)
    Run(RunArgs),
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Remove networks left behind by earlier runs
    Prune {
        /// Path to configuration file (for the marker labels)
        #[arg(short, long, env = "CONTAINERBURN_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Status line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, env = "CONTAINERBURN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Image every workload runs
    #[arg(long, env = "CONTAINERBURN_IMAGE")]
    pub image: Option<String>,

    /// Number of networks to spread workloads over
    #[arg(long)]
    pub networks: Option<usize>,

    /// Name prefix for created networks
    #[arg(long)]
    pub network_prefix: Option<String>,

    /// Explicit worker count
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Workers per available core when no explicit count is given
    #[arg(long)]
    pub worker_multiplier: Option<usize>,

    /// Minimum workload sleep in seconds
    #[arg(long)]
    pub min_sleep: Option<u64>,

    /// Maximum workload sleep in seconds
    #[arg(long)]
    pub max_sleep: Option<u64>,

    /// Stop after this many seconds
    #[arg(long, value_name = "SECS")]
    pub run_for: Option<u64>,

    /// Status line format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Layer command-line overrides on top of a loaded configuration
    pub fn apply(&self, mut config: BurnConfig) -> BurnConfig {
        if let Some(image) = &self.image {
            config.image = image.clone();
        }
        if let Some(count) = self.networks {
            config.network_count = count;
        }
        if let Some(prefix) = &self.network_prefix {
            config.network_prefix = prefix.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(multiplier) = self.worker_multiplier {
            config.worker_multiplier = multiplier;
        }
        if let Some(min) = self.min_sleep {
            config.min_sleep_secs = min;
        }
        if let Some(max) = self.max_sleep {
            config.max_sleep_secs = max;
        }
        config
    }
}

/// Load the config file if one was given, otherwise the defaults
pub fn load_config(path: Option<&Path>) -> Result<BurnConfig> {
    match path {
        Some(path) => BurnConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(BurnConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["containerburn"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "containerburn",
            "run",
            "--image",
            "docker.io/busybox:latest",
            "--networks",
            "5",
            "--workers",
            "8",
            "--min-sleep",
            "2",
            "--max-sleep",
            "4",
            "--run-for",
            "30",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);

        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.run_for, Some(30));
        assert_eq!(args.format, OutputFormat::Json);

        let config = args.apply(BurnConfig::default());
        assert_eq!(config.image, "docker.io/busybox:latest");
        assert_eq!(config.network_count, 5);
        assert_eq!(config.pool_size(), 8);
        assert_eq!((config.min_sleep_secs, config.max_sleep_secs), (2, 4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let base = BurnConfig::default().with_network_count(7);
        let config = RunArgs::default().apply(base.clone());
        assert_eq!(config, base);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/containerburn.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/containerburn.json"));
    }
}
