//! Object storage operations for s3gate
//!
//! This crate wraps the object-store primitives the gateway needs behind the
//! [`ObjectStore`] trait, with an AWS SDK backend and an in-memory backend.

pub mod storage;

pub use storage::{
    EphemeralObjectStore, ObjectStore, ObjectSummary, S3ObjectStore, StorageError,
};
