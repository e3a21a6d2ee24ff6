use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use sophia_config_core::{Engine, EngineSettings, PersistMode};
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Parser)]
#[command(name = "sophia-config")]
#[command(about = "Detect the environment, resolve configuration and repair what is broken")]
#[command(version)]
struct Cli {
    /// Project root holding `.env` files and `config/environments/`
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Settings file (defaults to ~/.config/sophia/engine.yaml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Also read secrets from the system keychain under this service name
    #[arg(long, global = true, value_name = "SERVICE")]
    keychain: Option<String>,

    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which environment is active and why
    Detect {
        #[arg(long)]
        json: bool,
    },
    /// Resolve every configuration key and show where it came from
    Resolve {
        #[arg(long)]
        json: bool,
    },
    /// Print one resolved value
    Get {
        key: String,
    },
    /// Check authentication and remote context access
    Validate {
        #[arg(long)]
        json: bool,
    },
    /// Validate, then attempt automatic repairs
    Repair {
        #[arg(long)]
        json: bool,
    },
    /// Full startup sequence and configuration report (default)
    Report {
        #[arg(long)]
        json: bool,
        /// Exit with status 1 when the configuration is critical
        #[arg(long)]
        strict: bool,
    },
    /// Write identity variables to the shell profiles
    Persist {
        /// Drop older exports of the same variable instead of appending
        #[arg(long)]
        replace: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<EngineSettings> {
    let mut settings = match &cli.settings {
        Some(path) => EngineSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => EngineSettings::load().context("failed to load settings")?,
    };
    if let Some(root) = &cli.project_root {
        settings = settings.with_project_root(root);
    }
    if let Some(service) = &cli.keychain {
        settings = settings.with_keychain(service);
    }
    tracing::debug!(?settings, "settings loaded");
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = Engine::new(load_settings(&cli)?);
    let command = cli.command.unwrap_or(Commands::Report {
        json: false,
        strict: false,
    });

    match command {
        Commands::Detect { json } => {
            let detected = engine.detect().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&detected)?);
            } else {
                output::print_detected(&detected);
            }
        }
        Commands::Resolve { json } => {
            let entries = engine.resolve().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                if let Some(detected) = engine.detected() {
                    output::print_detected(&detected);
                }
                output::print_entries(&entries);
            }
        }
        Commands::Get { key } => {
            engine.resolve().await;
            match engine.get(&key) {
                Some(value) => println!("{}", value),
                None => {
                    eprintln!("{} is not set", key);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Validate { json } => {
            let health = engine.validate().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                output::print_health(&health);
            }
        }
        Commands::Repair { json } => {
            engine.validate().await;
            let repairs = engine.repair().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&repairs)?);
            } else {
                output::print_repairs(&repairs);
            }
        }
        Commands::Report { json, strict } => {
            let report = engine.startup().await;
            if json {
                println!("{}", report.to_json()?);
            } else {
                output::print_report(&report, &engine.entries());
            }
            if strict && report.is_critical() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Persist { replace } => {
            engine.detect().await;
            let mode = if replace {
                PersistMode::ReplaceByKey
            } else {
                engine.settings().persist_mode
            };
            let summary = engine.persist_with_mode(mode);
            output::print_persist(&summary);
        }
    }

    Ok(ExitCode::SUCCESS)
}
