//! # Tides Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite storage backend (relational-hybrid)
//! - Filesystem object-store backend
//! - Storage selector with fallback policy
//! - Configuration loader
//! - HTTP model-capability client
//!
//! ## Architecture
//! - Implements traits defined in `tides-core`
//! - Depends on `tides-domain` and `tides-core`
//! - Contains all "impure" code (I/O, network)

pub mod config;
pub mod database;
pub mod model;
pub mod objectstore;
pub mod storage;

// Re-export commonly used items
pub use database::{DbManager, SqliteBackend};
pub use model::HttpModelClient;
pub use objectstore::FsObjectStore;
pub use storage::{ReplicatedReads, StorageSelector};
