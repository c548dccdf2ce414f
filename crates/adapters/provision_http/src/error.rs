//! Provisioning adapter error types.

use roost_domain::error::{ProvisioningError, RoostError};

/// Errors specific to the HTTP provisioning adapter.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionHttpError {
    /// The HTTP client could not be built from the configuration.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The certificate issuance request failed.
    #[error("issuance request failed")]
    Issue(#[source] reqwest::Error),

    /// The policy attachment request failed.
    #[error("policy attachment request failed")]
    Attach(#[source] reqwest::Error),

    /// The attachment verification request failed.
    #[error("attachment check failed")]
    Verify(#[source] reqwest::Error),
}

impl ProvisionHttpError {
    /// Convert into the provisioning error this failure maps to.
    #[must_use]
    pub fn into_domain(self) -> RoostError {
        match self {
            err @ (Self::Attach(_) | Self::Verify(_)) => {
                RoostError::Provisioning(ProvisioningError::PolicyAttach(Box::new(err)))
            }
            err => RoostError::Provisioning(ProvisioningError::Issuance(Box::new(err))),
        }
    }
}

impl From<ProvisionHttpError> for RoostError {
    fn from(err: ProvisionHttpError) -> Self {
        err.into_domain()
    }
}
