//! # Tides Domain
//!
//! Business domain types and models for the Tides engine.
//!
//! This crate contains:
//! - Domain data types (Tide, FlowSession, EnergySample, TaskLink)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Date-boundary arithmetic for hierarchical bucketing
//!
//! ## Architecture
//! - No dependencies on other Tides crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod boundaries;
pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
