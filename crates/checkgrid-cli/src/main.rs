//! checkctl — browse, inspect, and run checks from the terminal.
//!
//! # Usage
//!
//! ```text
//! checkctl --config checkgrid.toml groups
//! checkctl --url https://checks.example.org/api --env data run indexing_progress --set limit=10 --wait
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use checkgrid_client::HttpCheckService;
use checkgrid_core::CheckGridConfig;
use checkgrid_engine::Engine;

mod commands;

#[derive(Parser)]
#[command(
    name = "checkctl",
    about = "CheckGrid — browse, inspect, and run checks",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to a checkgrid.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Check service base URL (overrides [service].base_url)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Environment to operate on (overrides [service].environment)
    #[arg(long = "env", global = true)]
    environment: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List check groups, their checks, and the workers that run them
    Groups {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show the latest result of a check
    Result {
        check: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show the run history of a check
    History {
        check: String,
        /// Number of rows to print
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Print the kwargs a run would be submitted with
    Kwargs {
        check: String,
        /// Override one argument, e.g. --set limit=10
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Submit an ad-hoc run of a check.
    ///
    /// Kwargs are resolved from the check's schedule for the environment,
    /// its registered defaults, then any --set overrides. With --wait, the
    /// command waits for the settle delay and prints the refreshed history.
    Run {
        check: String,
        /// Override one argument, e.g. --set primary=true
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Wait for the run to settle and show the newest history row
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = resolve_config(&cli)?;
    let service =
        HttpCheckService::from_config(&config).context("failed to build check service client")?;
    let mut engine = Engine::from_config(service, &config)?;

    match cli.command {
        Commands::Groups { format } => commands::groups::list(&mut engine, &format).await,
        Commands::Result { check, format } => {
            commands::result::show(&mut engine, &check, &format).await
        }
        Commands::History { check, limit } => {
            commands::history::show(&mut engine, &check, limit).await
        }
        Commands::Kwargs { check, set } => commands::kwargs::show(&mut engine, &check, &set).await,
        Commands::Run { check, set, wait } => {
            commands::run::submit(&mut engine, &check, &set, wait).await
        }
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("checkctl=info,checkgrid=info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Config file first, then `--url` / `--env` on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<CheckGridConfig> {
    let mut config = match &cli.config {
        Some(path) => CheckGridConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            let url = cli
                .url
                .as_deref()
                .context("either --config or --url is required")?;
            let environment = cli
                .environment
                .as_deref()
                .context("--env is required when no config file is given")?;
            CheckGridConfig::new(url, environment)
        }
    };

    if let Some(url) = &cli.url {
        config.service.base_url = url.clone();
    }
    if let Some(environment) = &cli.environment {
        config.service.environment = environment.clone();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn flags_alone_build_a_config() {
        let cli = parse(&["checkctl", "--url", "http://localhost:8000/api", "--env", "data", "groups"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.service.base_url, "http://localhost:8000/api");
        assert_eq!(config.service.environment, "data");
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[service]\nbase_url = \"https://checks.example.org/api\"\nenvironment = \"data\"\n\n[engine]\nsettle_delay = \"30s\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&["checkctl", "--config", path, "groups", "--env", "staging"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.service.base_url, "https://checks.example.org/api");
        assert_eq!(config.service.environment, "staging");
        assert_eq!(config.settle_delay().unwrap().as_secs(), 30);
    }

    #[test]
    fn missing_service_is_an_error() {
        let cli = parse(&["checkctl", "groups"]);
        assert!(resolve_config(&cli).is_err());

        let cli = parse(&["checkctl", "--url", "http://localhost", "groups"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn run_collects_overrides() {
        let cli = parse(&[
            "checkctl", "--url", "http://localhost", "--env", "data", "run", "indexing_progress",
            "--set", "limit=10", "--set", "primary=true", "--wait",
        ]);
        match cli.command {
            Commands::Run { check, set, wait } => {
                assert_eq!(check, "indexing_progress");
                assert_eq!(set, vec!["limit=10", "primary=true"]);
                assert!(wait);
            }
            _ => panic!("expected run"),
        }
    }
}
