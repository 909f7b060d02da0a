//! Client for the Creem checkout provider.
//!
//! Exposes the [`CheckoutProvider`] trait so handlers depend on the
//! seam rather than the concrete HTTP client, plus the env-driven
//! product catalog mapping plan tiers to Creem product ids.

mod catalog;
mod client;

pub use catalog::ProductCatalog;
pub use client::{
    CheckoutMetadata, CheckoutProvider, CheckoutRequest, CheckoutSession, CreemClient, CreemError,
};
