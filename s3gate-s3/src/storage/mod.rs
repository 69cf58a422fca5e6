//! Object storage backends

mod aws;
mod ephemeral;
mod traits;


pub use aws::S3ObjectStore;
pub use ephemeral::EphemeralObjectStore;
pub use traits::{ObjectStore, ObjectSummary, StorageError};
