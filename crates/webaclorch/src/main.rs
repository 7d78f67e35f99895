//! webaclorch entry point.
//!
//! Reconciles a Web ACL described by a JSON document against the local
//! file-backed WAF backend.

use clap::{Parser, Subcommand};
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;
use waf_webaclorch::commands;
use waf_webaclorch::config_file::DEFAULT_CONFIG_PATH;
use waf_webaclorch::WebAclOrchConfig;

/// WAF Web ACL orchestrator
#[derive(Parser, Debug)]
#[command(name = "webaclorch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Backend state file (overrides backend.state_file)
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate desired attributes and print the calls apply would make
    Plan {
        /// Desired attributes (JSON object)
        desired: PathBuf,

        /// Resource document from a previous apply
        #[arg(short = 'r', long)]
        resource: Option<PathBuf>,
    },

    /// Create or update the Web ACL and record it in the resource document
    Apply {
        /// Desired attributes (JSON object)
        desired: PathBuf,

        /// Resource document, created when missing
        #[arg(short = 'r', long)]
        resource: PathBuf,
    },

    /// Refresh the resource document from the backend and print it
    Show {
        /// Resource document
        resource: PathBuf,
    },

    /// Remove all rules from the Web ACL and delete it
    Destroy {
        /// Resource document
        resource: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Error messages already embed their causes.
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = WebAclOrchConfig::load_or_default(&args.config)?;
    if let Some(state_file) = args.state_file {
        config.backend.state_file = state_file;
    }
    config.validate()?;
    debug!("Configuration: {:?}", config);

    match args.command {
        Command::Plan { desired, resource } => {
            let recorded = match resource {
                Some(path) => commands::read_resource(&path)?,
                None => None,
            };
            let plan = commands::plan(commands::read_desired(&desired)?, recorded)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Apply { desired, resource } => {
            let desired = commands::read_desired(&desired)?;
            let state = commands::apply(&config, desired, &resource)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Show { resource } => {
            let state = commands::show(&config, &resource)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Destroy { resource } => commands::destroy(&config, &resource)?,
    }
    Ok(())
}
