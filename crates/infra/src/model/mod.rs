//! External model capability adapter.

mod client;

pub use client::HttpModelClient;
