//! Policy service backends

mod aws;
mod ephemeral;
mod traits;

pub use aws::AwsPolicyService;
pub use ephemeral::EphemeralPolicyService;
pub use traits::{PolicyError, PolicyInfo, PolicyService, PolicyVersionInfo};
