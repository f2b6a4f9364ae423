// Imports all of the components needed for gcs::client
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Implementation of the `StorageBackend` trait for our GCS `Client`.
mod storage_backend;

/// GCS `Client`, talking to the JSON API.
mod client;

pub use client::*;
