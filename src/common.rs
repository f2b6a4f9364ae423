// Common traits and types
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client_config;
mod error;
mod human_size;
mod listing;
mod provider;
mod size_unit;
mod storage_backend;

pub use client_config::*;
pub use error::*;
pub use human_size::*;
pub use listing::*;
pub use provider::*;
pub use size_unit::*;
pub use storage_backend::*;

// These are used by both the S3 and GCS backends.
pub type BucketNames = Vec<String>;
