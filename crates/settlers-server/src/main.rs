//! Settlers turn tracker server.

use settlers_core::SystemClock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod connections;
mod notify;
mod profiles;
mod protocol;
mod server;
mod service;
mod store;

use config::ServerConfig;
use connections::Connections;
use notify::ConnectionNotifier;
use profiles::{FileProfiles, MemoryProfiles, ProfileStore};
use server::ServerState;
use service::GameService;
use store::{FileStore, GameStore, MemoryStore};

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

    info!("Starting Settlers server...");

    let store: Arc<dyn GameStore>;
    let profiles: Arc<dyn ProfileStore>;
    match &config.data_dir {
        Some(dir) => {
            info!("Storing games and profiles in {}", dir.display());
            store = Arc::new(FileStore::open(dir)?);
            profiles = Arc::new(FileProfiles::open(dir)?);
        }
        None => {
            info!("SETTLERS_DATA_DIR not set, games and profiles are kept in memory");
            store = Arc::new(MemoryStore::new());
            profiles = Arc::new(MemoryProfiles::new());
        }
    }

    let connections = Arc::new(Connections::new());
    let notifier = Arc::new(ConnectionNotifier::new(
        Arc::clone(&connections),
        config.from_email.clone(),
    ));
    let service = GameService::new(store, profiles, notifier, Arc::new(SystemClock));

    let state = Arc::new(ServerState::new(connections, service));

    server::run_server(config.addr, state).await
}
