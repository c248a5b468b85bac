//! Backend selection and read-fallback policy.

mod selector;

pub use selector::{ReplicatedReads, SelectedStorage, StorageSelector};
