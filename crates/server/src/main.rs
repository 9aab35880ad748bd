//! vecgate
//!
//! Main entry point for the vecgate server and command-line tool.
//! Embeds text with an external provider and stores or queries the vectors
//! in Milvus or Pinecone, and answers chat messages with retrieved context.

mod api;
mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ChatCommand, CleanupCommand, EmbedCommand, HistoryCommand, SearchCommand, ServeCommand,
};
use std::path::PathBuf;
use tracing::Instrument;
use vecgate_core::{config::AppConfig, logging, AppResult};

/// vecgate - text embedding gateway over pluggable vector stores
#[derive(Parser, Debug)]
#[command(name = "vecgate")]
#[command(about = "Text embedding gateway over pluggable vector stores", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "VECGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Vector store backend (milvus, pinecone)
    #[arg(short, long, global = true, env = "VECTOR_DB_TYPE")]
    backend: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Embed a text and store it
    Embed(EmbedCommand),

    /// Search stored texts by similarity
    Search(SearchCommand),

    /// Delete entries older than a timestamp
    Cleanup(CleanupCommand),

    /// Send a chat message and print the reply
    Chat(ChatCommand),

    /// Show a user's chat history
    History(HistoryCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // --config takes the place of VECGATE_CONFIG when loading
    let config_path = cli.config.clone();
    let config = AppConfig::load_from(|key| match (key, &config_path) {
        ("VECGATE_CONFIG", Some(path)) => Some(path.display().to_string()),
        _ => std::env::var(key).ok(),
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(cli.backend, cli.log_level, cli.verbose, cli.no_color);

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("vecgate starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Backend: {}", config.vector.backend);
    tracing::debug!(
        "Embedding: {} / {}",
        config.embedding.provider,
        config.embedding.model
    );

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Embed(_) => "embed",
        Commands::Search(_) => "search",
        Commands::Cleanup(_) => "cleanup",
        Commands::Chat(_) => "chat",
        Commands::History(_) => "history",
    };
    let span = tracing::info_span!("command", name = command_name);

    // Route to command handlers
    let result = async {
        match &cli.command {
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Embed(cmd) => cmd.execute(&config).await,
            Commands::Search(cmd) => cmd.execute(&config).await,
            Commands::Cleanup(cmd) => cmd.execute(&config).await,
            Commands::Chat(cmd) => cmd.execute(&config).await,
            Commands::History(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
