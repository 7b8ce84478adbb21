//! Bootstrap: database, shared state, module registry and server lifecycle.

use std::sync::Arc;

use anyhow::Context;
use verdict_db::Db;
use verdict_kernel::{InitCtx, ModuleRegistry, Settings};

use crate::mail::{self, Mailer};
use crate::modules;
use crate::state::AppState;

/// A migrated database with its initialized modules.
pub struct Prepared {
    pub registry: ModuleRegistry,
    pub state: AppState,
    /// Migration keys applied while preparing.
    pub applied: Vec<String>,
}

pub fn build_registry(state: &AppState) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, state);
    registry
}

/// Connect, initialize every module and bring the schema up to date.
pub async fn prepare(settings: &Settings, mailer: Arc<dyn Mailer>) -> anyhow::Result<Prepared> {
    let db = verdict_db::connect(&settings.database)
        .await
        .context("failed to open database")?;
    prepare_with(settings, db, mailer).await
}

/// Same as [`prepare`], over an already opened pool.
pub async fn prepare_with(
    settings: &Settings,
    db: Db,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<Prepared> {
    let state = AppState::new(settings, db, mailer)?;
    let registry = build_registry(&state);
    tracing::info!(modules = registry.module_count(), "modules registered");

    registry.init_modules(&InitCtx { settings }).await?;
    let applied = migrate(&registry, &state.db).await?;

    Ok(Prepared {
        registry,
        state,
        applied,
    })
}

/// Apply pending migrations of every registered module.
pub async fn migrate(registry: &ModuleRegistry, db: &Db) -> anyhow::Result<Vec<String>> {
    let applied = verdict_db::apply_migrations(db, &registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    if applied.is_empty() {
        tracing::info!("database schema is up to date");
    } else {
        tracing::info!(count = applied.len(), "migrations applied");
    }
    Ok(applied)
}

/// Run the HTTP server until ctrl-c, driving module start/stop hooks.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let mailer = mail::from_settings(&settings.mail);
    let Prepared {
        registry, state, ..
    } = prepare(settings, mailer).await?;

    registry.start_modules(&InitCtx { settings }).await?;
    let served = verdict_http::start_server(&registry, settings, shutdown_signal()).await;
    registry.stop_modules().await?;
    state.db.close().await;

    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
