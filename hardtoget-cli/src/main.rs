mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hardtoget_core::{ChatPersona, EngineError, GameConfig, GameEngine, PersonaConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hardtoget")]
#[command(about = "Hard To Get - dating-sim jackpot game")]
#[command(version)]
struct Cli {
    /// Data directory for game storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Persona API key (falls back to HARDTOGET_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Persona endpoint base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Persona model name
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a player (idempotent when a key is supplied)
    Register {
        /// Display name
        nickname: String,
        /// Existing player key to re-attach to
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Send one message as a registered player
    Chat {
        /// Player key
        key: String,
        /// Message to send
        message: String,
    },

    /// Show the current game state
    Status {
        /// Player key, to include your own balance
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Administrative top-up back to the starting balance
    ResetBalance {
        /// Player key
        key: String,
    },

    /// Interactive session: register and chat until you quit (or win)
    Play {
        /// Display name
        #[arg(short, long)]
        nickname: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "hardtoget={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    tracing::debug!("Using data dir {}", data_dir.display());

    // Wire the persona collaborator
    let mut persona_config = PersonaConfig::default();
    if let Some(url) = cli.base_url {
        persona_config.base_url = url;
    }
    if let Some(model) = cli.model {
        persona_config.model = model;
    }
    persona_config.api_key = cli
        .api_key
        .or_else(|| std::env::var("HARDTOGET_API_KEY").ok())
        .unwrap_or_default();

    let engine = GameEngine::new(
        &data_dir,
        GameConfig::default(),
        Arc::new(ChatPersona::new(persona_config)),
    )
    .await?;

    // Execute command
    let result = match cli.command {
        Commands::Register { nickname, key } => {
            commands::handle_register(&engine, &nickname, key.as_deref()).await
        }
        Commands::Chat { key, message } => commands::handle_chat(&engine, &key, &message).await,
        Commands::Status { key } => commands::handle_status(&engine, key.as_deref()).await,
        Commands::ResetBalance { key } => commands::handle_reset_balance(&engine, &key).await,
        Commands::Play { nickname } => commands::handle_play(&engine, nickname.as_deref()).await,
    };

    if let Err(e) = result {
        match e {
            EngineError::InsufficientFunds { need, available } => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {}, Available: {}", need, available);
                eprintln!("Use 'hardtoget reset-balance <key>' to top up");
            }
            EngineError::PlayerNotFound { key } => {
                eprintln!("Error: Player '{}' not found", key);
                eprintln!("Use 'hardtoget register <nickname>' first");
            }
            EngineError::Validation(msg) => {
                eprintln!("Error: {}", msg);
            }
            _ => {
                eprintln!("Error: {}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
