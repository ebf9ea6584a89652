mod config;
mod documents;
mod errors;
mod llm_client;
mod refinement;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{build_generator, ModelRoles};
use crate::refinement::{FixedIterationPolicy, WorkflowEngine};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reflect API v{}", env!("CARGO_PKG_VERSION"));

    // Bind model roles (both roles may point at the same backend)
    let timeout = Duration::from_secs(config.generation_timeout_secs);
    let api_key = config.anthropic_api_key.as_deref();
    let draft = build_generator(&config.draft, timeout, api_key)?;
    let revise = build_generator(&config.revise, timeout, api_key)?;
    info!(
        "Model roles bound: draft={} (t={}), revise={} (t={})",
        draft.describe(),
        config.draft.temperature,
        revise.describe(),
        config.revise.temperature
    );

    // Build the refinement engine
    let policy = Arc::new(FixedIterationPolicy::new(config.max_iterations));
    let engine = WorkflowEngine::new(ModelRoles::new(draft, revise), policy);
    info!("Convergence policy: {}", engine.policy().describe());

    // Build app state
    let state = AppState {
        engine: Arc::new(engine),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the front-end host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
