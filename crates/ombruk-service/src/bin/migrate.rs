//! Applies pending schema migrations to the configured database.

use anyhow::Context;
use ombruk_core::config::load_config;
use ombruk_core::logging::init_tracing;
use ombruk_db::db::migrate::run_migrations;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_config().context("failed to load configuration")?;
    init_tracing(&settings.logging).context("failed to initialize tracing")?;

    tracing::info!("Running database migrations");
    run_migrations(&settings.database.url)
        .await
        .context("failed to run database migrations")?;

    Ok(())
}
