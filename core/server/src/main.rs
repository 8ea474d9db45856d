use anyhow::Result;
use clap::Parser;
use ryan_planner::{ClaudeProvider, ModelGateway, OpenAIProvider};
use ryan_server::{app, AppState, Args, ServiceInfo};
use ryan_store::{Database, Store};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Ryan Project Manager v{}", env!("CARGO_PKG_VERSION"));

    // Create directory if it doesn't exist
    if let Some(parent) = args.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let store: Arc<dyn Store> = Arc::new(Database::new(&args.db_path)?);
    info!("Database initialized at: {}", args.db_path.display());

    if args.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY not set; general model calls will fail");
    }
    if args.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY not set; reasoning model calls will fail");
    }

    let general = Arc::new(OpenAIProvider::new(args.openai())?);
    let reasoning = Arc::new(ClaudeProvider::new(args.anthropic())?);
    let gateway = Arc::new(ModelGateway::new(general, reasoning, store.clone()));
    info!(
        "Models: general={} reasoning={}",
        args.general_model, args.reasoning_model
    );

    let state = AppState::new(
        store,
        gateway,
        args.scoring(),
        args.prioritizer(),
        ServiceInfo {
            port: args.port,
            susan_url: args.susan_url.clone(),
            clair_url: args.clair_url.clone(),
        },
    );

    let addr = args.bind_addr();
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
