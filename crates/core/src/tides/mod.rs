//! Tide domain model operations and lifecycle state machine

mod report;
mod service;

pub use report::render_report;
pub use service::TideService;
