use std::sync::Arc;

use vireo_core::credits::MonthlyCreditSchedule;
use vireo_creem::{CheckoutProvider, ProductCatalog};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vireo_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Checkout provider, `None` when payments are not configured --
    /// plan-change requests then fail with a configuration error
    /// instead of the whole server refusing to boot.
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
    /// Plan -> Creem product id catalog.
    pub catalog: Arc<ProductCatalog>,
    /// Monthly credit allotments for the activation cron.
    pub credit_schedule: Arc<MonthlyCreditSchedule>,
}
