//! Recompute `total_views` and `total_responses` from the rows they count
//!
//! Repair tool for counters written before view and submission inserts were
//! transactional. The serving path never depends on it.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forms_public_server::db::create_pool;
use forms_public_server::PgFormStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sync_form_stats=info,forms_public_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Only the database is needed here, not the full server configuration
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = create_pool(&database_url, 2).await?;
    let store = PgFormStore::new(pool);

    tracing::info!("Synchronising form counters...");

    let total = store.count_forms().await?;
    let drifts = store.reconcile_counters().await?;

    for drift in &drifts {
        tracing::info!(
            form_id = %drift.id,
            name = %drift.name,
            views = %format!("{} -> {}", drift.views_before, drift.views_after),
            responses = %format!("{} -> {}", drift.responses_before, drift.responses_after),
            "Counters corrected"
        );
    }

    tracing::info!(
        total_forms = total,
        updated = drifts.len(),
        unchanged = total - drifts.len() as i64,
        "Synchronisation complete"
    );

    Ok(())
}
