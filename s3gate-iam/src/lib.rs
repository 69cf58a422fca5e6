//! IAM support for s3gate
//!
//! Provides the [`PolicyService`] seam over managed policies and their
//! versions, and a typed [`PolicyDocument`] that can be patched with new
//! resource ARNs without losing fields it does not model.

pub mod arn;
pub mod document;
pub mod service;

pub use arn::{bucket_arn, Partition};
pub use document::{DocumentError, PolicyDocument, Resource, Statement, StatementEntry, Statements};
pub use service::{
    AwsPolicyService, EphemeralPolicyService, PolicyError, PolicyInfo, PolicyService,
    PolicyVersionInfo,
};
