//! s3gate - HTTP gateway for S3 uploads
//!
//! Proxies uploads, presigned downloads and deletes to one bucket, after a
//! startup pass that creates the bucket and grants a managed IAM policy
//! access to it.

pub mod bootstrap;
pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;

pub use bootstrap::{BootstrapError, BootstrapOutcome, BootstrapTarget};
pub use clients::ClientBundle;
pub use handlers::AppState;
pub use router::create_router;
