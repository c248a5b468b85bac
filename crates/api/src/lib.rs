//! # Tides API
//!
//! HTTP coordinator for the Tides engine.
//!
//! This crate contains:
//! - The axum router and per-service dispatch
//! - Request authentication and owner scoping
//! - The uniform response envelope
//! - `AppContext` wiring of services over the selected storage backend

pub mod auth;
pub mod context;
pub mod envelope;
pub mod routes;

pub use context::AppContext;
pub use routes::build_router;
