use anyhow::Context;

use folio::modules;
use folio_kernel::settings::Settings;
use folio_kernel::{InitCtx, ModuleRegistry};
use folio_objstore::ObjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load FOLIO settings")?;
    folio_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.host,
        bucket = %settings.object_store.bucket,
        "folio bootstrap starting"
    );

    let pool = folio_db::connect(&settings.database).await?;
    let store = ObjectStore::connect(&settings.object_store).await;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
        store: &store,
    };

    registry.init_all(&ctx).await?;
    folio_db::run_migrations(&pool, &registry).await?;

    tracing::info!("folio bootstrap complete");
    folio_http::start_server(&registry, &ctx).await
}
