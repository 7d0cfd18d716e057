mod admission;
mod clock;
mod config;
mod db;
mod errors;
mod limits;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::limits::abuse::AbuseGuard;
use crate::limits::catalog::PlanCatalog;
use crate::limits::quota::QuotaEngine;
use crate::llm_client::{ChatProvider, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobcus API v{}", env!("CARGO_PKG_VERSION"));

    // Plan catalog, patched from PLAN_QUOTA_OVERRIDES when set
    let mut catalog = PlanCatalog::builtin();
    if let Some(raw) = &config.plan_quota_overrides {
        catalog = catalog.with_overrides(raw)?;
        info!("Plan quota overrides applied");
    }

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgStore::new(
        db,
        Duration::from_secs(config.store_timeout_secs),
    ));

    let clock = Arc::new(SystemClock);
    let quota = QuotaEngine::new(Arc::new(catalog), store.clone(), clock.clone());
    let abuse = AbuseGuard::new(
        store.clone(),
        clock,
        config.free_device_daily_limit,
        config.enable_abuse_guard,
    );
    info!(
        "Abuse guard {} (limit {}/device/day)",
        if config.enable_abuse_guard { "on" } else { "off" },
        config.free_device_daily_limit
    );

    // Initialize LLM client and discover which models the key can call
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    let available_models: HashSet<String> = match llm.list_models().await {
        Ok(models) => {
            info!("Model provider serves {} models", models.len());
            models.into_iter().collect()
        }
        Err(e) => {
            warn!("Model discovery failed, allow-lists used unfiltered: {e}");
            HashSet::new()
        }
    };

    // Build app state
    let state = AppState {
        models: config.model_policy(),
        users: store.clone(),
        states: store,
        quota: Arc::new(quota),
        abuse: Arc::new(abuse),
        llm,
        available_models: Arc::new(available_models),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
