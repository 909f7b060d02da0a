use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vireo_api::config::ServerConfig;
use vireo_api::router::build_app_router;
use vireo_api::state::AppState;
use vireo_core::credits::MonthlyCreditSchedule;
use vireo_creem::{CheckoutProvider, CreemClient, ProductCatalog};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vireo_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vireo_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vireo_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    vireo_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Checkout provider ---
    // Missing payment configuration keeps the server bootable; the
    // plan-change endpoints answer with a configuration error instead.
    let checkout: Option<Arc<dyn CheckoutProvider>> = match CreemClient::from_env() {
        Ok(client) => {
            tracing::info!(base_url = client.base_url(), "Creem client configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Payments not configured");
            None
        }
    };

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        checkout,
        catalog: Arc::new(ProductCatalog::from_env()),
        credit_schedule: Arc::new(MonthlyCreditSchedule::default()),
    };

    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
