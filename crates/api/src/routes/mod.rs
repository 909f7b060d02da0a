pub mod cron;
pub mod health;
pub mod subscription;
pub mod video;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/video", video::router())
        .nest("/subscription", subscription::router())
}
