//! Application services.
//!
//! Services orchestrate domain entities through the port traits and are
//! generic over the adapter implementations, so every workflow here can
//! be exercised with in-memory fakes.

pub mod provisioning;
pub mod session;

pub use provisioning::{ProvisioningConfig, ProvisioningService};
pub use session::{SessionManager, Subscription};
