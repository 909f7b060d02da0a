use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vireo_core::credits::MonthlyCreditSchedule;
use vireo_worker::jobs::{challenge_prizes, monthly_credits};
use vireo_worker::store::PgStore;

/// Default interval between job passes, in seconds.
const DEFAULT_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vireo_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = vireo_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    let interval_secs: u64 = std::env::var("CRON_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    let store = PgStore::new(pool);
    let schedule = MonthlyCreditSchedule::default();
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    tracing::info!(interval_secs, "Worker started");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Worker stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Utc::now();

                match monthly_credits::run(&store, &store, &schedule, now).await {
                    Ok(summary) => tracing::info!(
                        activated = summary.activated,
                        skipped = summary.skipped,
                        errors = summary.errors,
                        "Monthly credit activation pass complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "Monthly credit activation pass failed"),
                }

                match challenge_prizes::run(&store, &store, now).await {
                    Ok(summary) => tracing::info!(
                        processed = summary.processed,
                        total = summary.total,
                        "Prize distribution pass complete"
                    ),
                    Err(e) => tracing::error!(error = %e, "Prize distribution pass failed"),
                }
            }
        }
    }
}
