//! Pure domain logic for the Vireo platform.
//!
//! This crate has zero internal dependencies so the rules it encodes
//! (generation parameter policy, credit pricing, subscription tier
//! ordering, cron batch decisions) can be used by the API server, the
//! worker binary, and any future CLI tooling alike.

pub mod activation;
pub mod credits;
pub mod error;
pub mod plan;
pub mod prizes;
pub mod types;
pub mod video_params;
