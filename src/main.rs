//! Aerin - conversational AI assistant web service
//!
#![doc = "Main entry point for the Aerin server."]

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aerin::cli::Cli;
use aerin::config::Config;
use aerin::conversations::ConversationStore;
use aerin::providers::AnthropicProvider;
use aerin::server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    let storage = aerin::storage::backend(&config.storage)?;
    let store = ConversationStore::new(storage);
    let provider = Arc::new(AnthropicProvider::new(&config.provider)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store, provider);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aerin=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
