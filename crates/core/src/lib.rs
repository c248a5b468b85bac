//! # Tides Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The storage backend port and typed store
//! - Tide domain services and the lifecycle state machine
//! - The hierarchical context resolver
//! - Assistant services behind the model port
//!
//! ## Architecture Principles
//! - Only depends on `tides-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod assist;
pub mod context;
pub mod preferences;
pub mod storage;
pub mod tides;

// Re-export specific items to avoid ambiguity
pub use assist::ports::ModelPort;
pub use assist::{AssistService, Timeframe};
pub use context::{ContextService, ContextSnapshot};
pub use preferences::{PreferencesService, PreferencesUpdate};
pub use storage::memory::MemoryBackend;
pub use storage::ports::{RecordFilter, RecordKind, StorageBackend};
pub use storage::store::TideStore;
pub use tides::TideService;
