use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use uteexpress_api::{
    app::{
        build_app,
        services::{AppServices, spawn_session_sweeper},
    },
    config::ApiConfig,
};
use uteexpress_auth::Argon2Hasher;
use uteexpress_infra::SeedOutcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    uteexpress_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(AppServices::in_memory(
        config.clone(),
        Arc::new(Argon2Hasher::new()),
    )?);

    if config.seed_on_startup {
        match services.seed()? {
            SeedOutcome::Seeded { usernames } => tracing::info!(?usernames, "seed complete"),
            SeedOutcome::Skipped { .. } => {}
        }
    }

    let sweep_every = (config.idle_timeout / 4)
        .to_std()
        .unwrap_or(Duration::from_secs(60))
        .max(Duration::from_secs(1));
    spawn_session_sweeper(services.clone(), sweep_every);

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
