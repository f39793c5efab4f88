//! Digito CLI: publish and validate SSM automation documents.
#![forbid(unsafe_code)]

mod commands;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use digito_common::config::{ConfigOverrides, DigitoConfig};
use digito_common::logging::{LogFormat, init_logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "digito",
    version,
    about = "Publish and validate Digito SSM automation documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level or tracing filter directive (env: DIGITO_LOG_LEVEL)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Root directory holding <service>/<category>/<name>/<date>/Documents trees
    #[arg(long, global = true)]
    documents_root: Option<PathBuf>,

    /// Directory of Python sources referenced by SCRIPT_PLACEHOLDER tokens
    #[arg(long, global = true)]
    scripts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update documents in SSM
    Publish {
        /// AWS region (env: DIGITO_REGION, AWS_REGION)
        #[arg(short, long)]
        region: Option<String>,

        /// Manifest listing one document name per line
        #[arg(short = 'f', long = "file-name")]
        file_name: Option<PathBuf>,

        /// Validate and assemble without calling SSM
        #[arg(long)]
        dry_run: bool,

        /// Document names to publish (dependencies are added automatically)
        names: Vec<String>,
    },

    /// Validate metadata, uniqueness and document rules for the whole corpus
    Validate {
        /// Services whose violations are reported as warnings only
        #[arg(long, value_delimiter = ',')]
        warn_only: Vec<String>,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Alarm template tooling
    Alarms {
        #[command(subcommand)]
        action: AlarmCommands,
    },
}

#[derive(Subcommand)]
enum AlarmCommands {
    /// Deploy an alarm template, report metrics without data, then tear it down
    Check {
        /// Alarm reference id, <service>:alarm:<name>:<version>
        reference_id: String,

        /// Template variable binding, NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Look-back window in multiples of each metric's period
        #[arg(long, default_value_t = 5)]
        lookback: u32,

        /// AWS region (env: DIGITO_REGION, AWS_REGION)
        #[arg(short, long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let region = match &cli.command {
        Commands::Publish { region, .. } => region.clone(),
        Commands::Alarms {
            action: AlarmCommands::Check { region, .. },
        } => region.clone(),
        Commands::Validate { .. } => None,
    };
    let (config, env_errors) = DigitoConfig::load(ConfigOverrides {
        documents_root: cli.documents_root,
        scripts_dir: cli.scripts_dir,
        region,
        log_level: cli.log_level,
    });
    if !env_errors.is_empty() {
        let mut codes = Vec::new();
        for err in &env_errors {
            let code = err.code();
            eprintln!("[{}] {err}", code.code_string());
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        for code in codes {
            eprintln!("\n{}", code.entry().format_full());
        }
        bail!("refusing to start with {} configuration error(s)", env_errors.len());
    }

    let format = if config.json_logs.value {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(err) = init_logging(&config.log_level.value, format) {
        eprintln!("{}", err.code().entry().format_full());
        return Err(err.into());
    }

    match cli.command {
        Commands::Publish {
            file_name,
            dry_run,
            names,
            ..
        } => commands::publish::run(&config, file_name.as_deref(), &names, dry_run).await,
        Commands::Validate { warn_only, json } => commands::validate::run(&config, &warn_only, json),
        Commands::Alarms {
            action:
                AlarmCommands::Check {
                    reference_id,
                    vars,
                    lookback,
                    ..
                },
        } => commands::alarms::check(&config, &reference_id, &vars, lookback).await,
    }
}
