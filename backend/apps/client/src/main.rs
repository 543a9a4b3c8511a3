//! Client Entry Point
//!
//! Wires the client core from the environment and exercises the pipeline
//! against the configured API. Uses `anyhow` for startup errors, but
//! library-level errors use `kernel::error::AppError`.

use client::{ClientConfig, ClientCore};
use gateway::SessionEvent;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "client=info,gateway=info,auth=info,optimistic=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        base_url = %config.gateway.base_url,
        dedupe_ttl_ms = config.gateway.dedupe_ttl_ms(),
        security_store = %config.security_store_path.display(),
        "Client configured"
    );

    let core = ClientCore::connect(&config)?;

    let mut events = core.api().credentials().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Expired => tracing::warn!("Session expired, sign in again"),
                other => tracing::info!(event = ?other, "Session event"),
            }
        }
    });

    // Identical concurrent reads collapse into one network call
    let path = std::env::args().nth(1).unwrap_or_else(|| "/health".to_string());
    let (first, second, third) = tokio::join!(
        core.api().get_json::<Value>(&path),
        core.api().get_json::<Value>(&path),
        core.api().get_json::<Value>(&path),
    );
    for result in [first, second, third] {
        match result {
            Ok(body) => tracing::info!(path = %path, body = %body, "Response"),
            Err(e) => tracing::warn!(path = %path, error = %e, "Request failed"),
        }
    }

    let stats = core.deduplication_stats();
    tracing::info!(
        in_flight = stats.in_flight,
        cached = stats.cached,
        "Deduplication stats"
    );

    let cancelled = core.cancel_all_requests();
    tracing::info!(cancelled, "Shutting down");
    Ok(())
}
