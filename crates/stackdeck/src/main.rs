//! stackdeck — drive the simulated WordPress stack from the command line.
//!
//! # Usage
//!
//! ```text
//! stackdeck render --format terraform
//! stackdeck export --out-dir ./out
//! stackdeck simulate scale:wordpress=5 wait:1 deploy
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stackdeck_core::ConfigFormat;

mod commands;

#[derive(Parser)]
#[command(
    name = "stackdeck",
    about = "stackdeck — simulated WordPress stack and its IaC configs",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to stackdeck.toml (default: ./stackdeck.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one generated configuration
    Render {
        /// kubernetes, terraform or ansible
        #[arg(short, long, value_parser = parse_format)]
        format: ConfigFormat,
    },
    /// Write every generated configuration to a directory
    Export {
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the current deployment state
    State {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a scripted sequence of operations and print every change.
    ///
    /// Steps: scale:<service>=<replicas>, deploy, rollback, fail:<service>,
    /// nodes:<count>, wait:<seconds>.
    Simulate {
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Generate a stackdeck.toml scaffold describing the built-in stack
    Init {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing stackdeck.toml
        #[arg(long)]
        force: bool,
    },
}

fn parse_format(s: &str) -> Result<ConfigFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stackdeck=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render { format } => commands::render::render(&config, format),
        Commands::Export { out_dir } => commands::export::export(&config, &out_dir),
        Commands::State { json } => commands::state::state(&config, json),
        Commands::Simulate { steps } => commands::simulate::simulate(&config, &steps).await,
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
