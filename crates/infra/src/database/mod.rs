//! SQLite persistence: connection manager and the relational-hybrid backend

mod manager;
mod sqlite_backend;

pub use manager::DbManager;
pub use sqlite_backend::SqliteBackend;
