use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use smart_reply::api::{self, AppState};
use smart_reply::config::Settings;
use smart_reply::error::Result;

/// How often idle rate-limit buckets are dropped.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (settings, state) = bootstrap().context("starting Smart Reply")?;

    eprintln!("✉️  Smart Reply v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Environment: {}", settings.environment);
    match &settings.llm {
        Some(llm) => eprintln!("   Drafts: provider ({})", llm.model),
        None => eprintln!("   Drafts: local pipeline (no provider key)"),
    }
    eprintln!(
        "   Auth: {}",
        if settings.api_key.is_some() { "x-api-key required" } else { "disabled" }
    );
    eprintln!("   Rate limit: {}/min per client", settings.rate_limit_per_minute);
    eprintln!("   Listening: http://{}\n", settings.bind_addr);

    let limiter = Arc::clone(&state.limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune().await;
        }
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    tracing::info!(addr = %settings.bind_addr, environment = %settings.environment, "Smart Reply started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Smart Reply stopped");
    Ok(())
}

/// Load settings from the environment and assemble handler state.
fn bootstrap() -> Result<(Settings, AppState)> {
    let settings = Settings::from_env()?;
    let state = AppState::from_settings(&settings)?;
    Ok((settings, state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
