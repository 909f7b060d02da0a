//! Shared response envelope types for API handlers.
//!
//! Internal API responses use a `{ "data": ... }` envelope. Use
//! [`DataResponse`] instead of ad-hoc `serde_json::json!({ "data": ... })`
//! to get compile-time type safety and consistent serialization.
//! (The subscription and cron endpoints keep their historical
//! `{ "success": ... }` shapes, which external callers depend on.)

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
