//! # compat-cli
//!
//! Command-line front end for schema compatibility checks and protobuf
//! change-impact detection.
//!
//! Exit codes: `0` compatible, `1` incompatible, `2` input or usage error.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::{ImpactArgs, Outcome};
use compat_core::Format;
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_INCOMPATIBLE: u8 = 1;
const EXIT_INPUT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "compat")]
#[command(about = "Schema compatibility checker")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a candidate schema against its historical versions
    Check {
        /// Schema format (FORMAT_PROTOBUF, FORMAT_JSON, FORMAT_AVRO or short names)
        #[arg(short, long)]
        format: Option<Format>,

        /// Compatibility mode, e.g. BACKWARD or FULL_TRANSITIVE
        #[arg(short, long)]
        mode: Option<String>,

        /// Candidate schema file
        candidate: PathBuf,

        /// Historical schema files, most recent first
        historicals: Vec<PathBuf>,
    },

    /// List the diffs between two schemas under a rule set
    Diff {
        /// Schema format
        #[arg(short, long)]
        format: Option<Format>,

        /// Rule set: backward, forward or full
        #[arg(short, long, default_value = "backward")]
        rules: String,

        /// Current schema file
        current: PathBuf,

        /// Previous schema file
        previous: PathBuf,
    },

    /// Detect a protobuf change and print the impact event as JSON
    Impact {
        /// Namespace the schema belongs to
        #[arg(long)]
        namespace: String,

        /// Schema name
        #[arg(long)]
        name: String,

        /// Version being written
        #[arg(long, default_value_t = 1)]
        version: i32,

        /// Stored descriptor set
        old: PathBuf,

        /// Descriptor set being written
        new: PathBuf,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let config = Config::load(cli.config.as_deref()).await?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Check {
            format,
            mode,
            candidate,
            historicals,
        } => commands::check(&config, format, mode, &candidate, &historicals).await,
        Commands::Diff {
            format,
            rules,
            current,
            previous,
        } => commands::diff(&config, format, &rules, &current, &previous).await,
        Commands::Impact {
            namespace,
            name,
            version,
            old,
            new,
        } => {
            let meta = ImpactArgs {
                namespace: &namespace,
                name: &name,
                version,
            };
            commands::impact(meta, &old, &new).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(Outcome::Compatible) => ExitCode::SUCCESS,
        Ok(Outcome::Incompatible) => ExitCode::from(EXIT_INCOMPATIBLE),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(EXIT_INPUT_ERROR)
        }
    }
}
