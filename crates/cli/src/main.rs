//! voxloop CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP endpoint
//! - `chat`: Run one turn from the terminal
//! - `history`: Print a stored transcript as JSON
//! - `config`: Show the effective configuration (secrets redacted)

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use voxloop_config::{AppConfig, EnvSnapshot};

mod commands;

#[derive(Parser)]
#[command(
    name = "voxloop",
    about = "voxloop: a tool-calling voice assistant endpoint",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (default: ~/.voxloop/config.toml)
    #[arg(long, global = true, env = "VOXLOOP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP endpoint
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message through the assistant
    Chat {
        /// Conversation to continue
        #[arg(long, default_value = "cli")]
        chat_id: String,

        /// Date/time shown to the model (default: now)
        #[arg(long)]
        date: Option<String>,

        /// JPEG image to attach (repeatable); image turns are not stored
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// The message text
        message: Vec<String>,
    },

    /// Print a conversation transcript as JSON
    History {
        /// Conversation id
        chat_id: String,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let env = EnvSnapshot::capture();
    let config = AppConfig::load(cli.config.as_deref(), &env).context("Failed to load config")?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Chat {
            chat_id,
            date,
            images,
            message,
        } => commands::chat::run(config, chat_id, date, images, message.join(" ")).await?,
        Commands::History { chat_id } => commands::history::run(config, chat_id).await?,
        Commands::Config => commands::config_cmd::run(&config),
    }

    Ok(())
}
