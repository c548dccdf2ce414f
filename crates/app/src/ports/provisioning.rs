//! Provisioning ports — identity persistence, bundle import, issuance,
//! and policy management.
//!
//! The credential and policy services are black boxes behind these
//! traits; the workflow in
//! [`ProvisioningService`](crate::services::provisioning::ProvisioningService)
//! only cares about their observable outcomes.

use std::future::Future;

use roost_domain::error::RoostError;
use roost_domain::identity::{CredentialPackage, CsrFields, DeviceIdentity, IssuedIdentity};

/// Durable storage for the device identity.
///
/// The identity is written once on first provisioning and read back on
/// every subsequent launch, so implementations must survive process
/// restarts. `clear` removes the record for explicit re-issuance.
pub trait IdentityStore: Send + Sync {
    /// Load the persisted identity, if any.
    fn load(&self) -> impl Future<Output = Result<Option<DeviceIdentity>, RoostError>> + Send;

    /// Persist the identity, replacing any previous record atomically.
    fn save(
        &self,
        identity: &DeviceIdentity,
    ) -> impl Future<Output = Result<(), RoostError>> + Send;

    /// Remove the persisted identity. A no-op when none exists.
    fn clear(&self) -> impl Future<Output = Result<(), RoostError>> + Send;
}

/// Discovery of pre-provisioned credential packages shipped with the
/// application.
pub trait BundleScanner: Send + Sync {
    /// Return the first credential package found, or `None` when the
    /// bundle carries none. A package that is present but unreadable is
    /// an error, not a `None`.
    fn find_package(
        &self,
    ) -> impl Future<Output = Result<Option<CredentialPackage>, RoostError>> + Send;
}

/// Certificate issuance through the cloud credential service.
pub trait CredentialIssuer: Send + Sync {
    /// Submit a CSR built from the given subject fields and return the
    /// issued identity.
    fn issue(
        &self,
        csr: &CsrFields,
    ) -> impl Future<Output = Result<IssuedIdentity, RoostError>> + Send;
}

/// Policy attachment through the cloud policy service.
pub trait PolicyManager: Send + Sync {
    /// Attach the named policy to the identity.
    fn attach_policy(
        &self,
        policy_name: &str,
        identity_arn: &str,
    ) -> impl Future<Output = Result<(), RoostError>> + Send;

    /// Check whether the named policy is visible as attached to the
    /// identity. Attachments propagate with a lag, so a `false` here may
    /// become `true` moments later.
    fn is_policy_attached(
        &self,
        policy_name: &str,
        identity_arn: &str,
    ) -> impl Future<Output = Result<bool, RoostError>> + Send;
}
