//! MySQL pool factory and startup migration runner.

use std::time::Duration;

use anyhow::Context;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

use folio_kernel::settings::DatabaseSettings;
use folio_kernel::ModuleRegistry;

/// Open a bounded connection pool against the configured database.
///
/// Statements acquire a connection from this pool for their own duration;
/// there is no per-request connect/disconnect.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.database);

    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
        .connect_with(options)
        .await
        .with_context(|| {
            format!(
                "failed to connect to mysql at {}:{}",
                settings.host, settings.port
            )
        })
}

/// Execute every registered module's migrations in registration order.
/// Statements must be idempotent (`CREATE TABLE IF NOT EXISTS` and friends);
/// the runner executes them on every process start.
pub async fn run_migrations(pool: &MySqlPool, registry: &ModuleRegistry) -> anyhow::Result<()> {
    for module in registry.modules() {
        for migration in module.migrations() {
            tracing::info!(
                module = module.name(),
                migration = migration.id,
                "applying migration"
            );
            sqlx::query(migration.up)
                .execute(pool)
                .await
                .with_context(|| {
                    format!(
                        "migration '{}' of module '{}' failed",
                        migration.id,
                        module.name()
                    )
                })?;
        }
    }
    Ok(())
}
