//! Concierge - self-hosted assistant chat service with an OpenAI-compatible backend

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concierge::api::{self, AppState};
use concierge::assistant::{AssistantService, DEFAULT_INSTRUCTIONS};
use concierge::config::Config;
use concierge::model::OpenAiClient;
use concierge::store::ChatStore;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Self-hosted assistant chat service with an OpenAI-compatible backend")]
#[command(version)]
struct Cli {
    /// Path to data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4040")]
        port: u16,
    },

    /// Create an assistant
    Create {
        /// Assistant identifier
        id: String,

        /// Instructions for the assistant (defaults to the built-in prompt)
        #[arg(long)]
        instructions: Option<String>,
    },

    /// Send a message to an assistant and print the reply
    Chat {
        /// Assistant identifier
        id: String,

        /// Message to send
        message: String,
    },

    /// Print the conversation history of an assistant
    History {
        /// Assistant identifier
        id: String,

        /// Only show messages at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("concierge={},tower_http=debug", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    let _ = dotenvy::dotenv();

    // Load config
    let config = if let Some(data_dir) = &cli.data_dir {
        Config::load_from(data_dir.clone())?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Serve { port } => {
            let state = initialize_state(&config)?;

            tracing::info!("Starting HTTP server on port {}", port);

            let router = api::create_router(state);
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

            println!("Concierge server running at http://localhost:{}", port);
            println!("  API:      http://localhost:{}/assistants/...", port);
            println!("  API Docs: http://localhost:{}/api/docs", port);
            println!("  Health:   http://localhost:{}/health", port);

            axum::serve(listener, router).await?;
        }

        Commands::Create { id, instructions } => {
            let state = initialize_state(&config)?;

            let instructions = instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS);
            state.service.create(&id, instructions)?;

            println!("✓ Assistant '{}' created", id);
        }

        Commands::Chat { id, message } => {
            let state = initialize_state(&config)?;

            let chat_state = state.service.post_message(&id, &message).await?;
            match chat_state.recent_messages.first() {
                Some(reply) => println!("{}", reply.content),
                None => anyhow::bail!("assistant returned no reply"),
            }
        }

        Commands::History { id, since } => {
            let state = initialize_state(&config)?;

            let since = since
                .map(|raw| raw.parse::<chrono::DateTime<chrono::Utc>>())
                .transpose()?;
            let chat_state = state.service.chat_state(&id, since)?;

            if !chat_state.exists {
                println!("No assistant found with id '{}'", id);
            } else if chat_state.recent_messages.is_empty() {
                println!("No messages");
            } else {
                for message in &chat_state.recent_messages {
                    println!(
                        "[{}] {}: {}",
                        message.created_at.format("%Y-%m-%d %H:%M:%S"),
                        message.role.as_str(),
                        message.content
                    );
                }
            }
        }
    }

    Ok(())
}

fn initialize_state(config: &Config) -> anyhow::Result<AppState> {
    std::fs::create_dir_all(&config.data_path)?;

    let store = Arc::new(ChatStore::open(&config.db_path())?);
    let client = Arc::new(OpenAiClient::from_env()?);
    let service = Arc::new(AssistantService::new(config, store, client));

    Ok(AppState { service })
}
