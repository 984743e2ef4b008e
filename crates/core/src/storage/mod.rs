//! Receipt and report file storage.

pub mod error;
pub mod service;

pub use error::StorageError;
pub use service::DocumentStore;
