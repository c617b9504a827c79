//! Broadside multiplayer match server.

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod room;
mod scripted;
mod server;
mod store;

use config::ServerConfig;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!("Starting Broadside server...");

    let state = Arc::new(ServerState::new(config));

    if let Some(store) = state.store() {
        store.init().await?;
        match store.list_active().await {
            Ok(ids) if !ids.is_empty() => {
                info!("{} unfinished matches left in the snapshot store", ids.len())
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read the snapshot store: {}", e),
        }
    } else {
        info!("Snapshot persistence disabled");
    }

    server::run_server(state).await
}
