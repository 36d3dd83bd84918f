//! # Dockhand Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `dockhand` CLI:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command group handlers
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! dockhand --help
//!
//! # Build against a remote daemon, with debug logging
//! dockhand -vv --host tcp://10.0.0.5:2375 image build .
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Route to the command handler
//! 4. Print any error and exit with status 1
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;

#[derive(Parser, Debug)]
#[command(
    name = "dockhand",
    about = "Docker client: streaming builds, pulls, logs, export and upload",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Daemon address (`unix:///path`, `tcp://host:port`). Overrides `[daemon] host`.
    #[arg(short = 'H', long, env = "DOCKER_HOST", global = true)]
    host: Option<String>,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "i")]
    Image(commands::image::ImageArgs),
    #[command(alias = "c")]
    Container(commands::container::ContainerArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let host = cli.host.as_deref();
    let command_result = match cli.command {
        Commands::Image(args) => commands::image::handle_image(args, host).await,
        Commands::Container(args) => commands::container::handle_container(args, host).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
