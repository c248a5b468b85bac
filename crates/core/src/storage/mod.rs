//! Storage port, typed store, and the in-memory backend

pub mod memory;
pub mod ports;
pub mod store;
