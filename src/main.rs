use clap::Parser;
use hermes::adapters::mcp_client::HttpToolClient;
use hermes::adapters::session_registry::SessionRegistry;
use hermes::cli::Cli;
use hermes::config::Settings;
use hermes::orchestrator::Orchestrator;
use hermes::persistence::{self, ConversationStore, InMemoryStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Hermes orchestration server on {}:{}", host, port);

    // Pick the conversation store: database when configured, memory otherwise
    let store: Arc<dyn ConversationStore> = match &settings.database.url {
        Some(url) => Arc::new(persistence::open_store(&settings.database, url).await?),
        None => {
            warn!("no database URL configured, conversations will not survive restarts");
            Arc::new(InMemoryStore::new())
        }
    };

    let client = Arc::new(HttpToolClient::new(
        settings.orchestrator.call_timeout(),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        client.clone(),
        settings.orchestrator.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(client));

    let app = hermes::create_app(orchestrator, registry.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    Ok(())
}

async fn shutdown_signal(registry: Arc<SessionRegistry>) {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install shutdown signal handler");
        return;
    }
    info!("shutting down, closing registered sessions");
    registry.shutdown().await;
}
