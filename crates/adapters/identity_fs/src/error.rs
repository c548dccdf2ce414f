//! Filesystem identity adapter error types.

use std::path::PathBuf;

use roost_domain::error::{ProvisioningError, RoostError};

/// Errors specific to the filesystem identity adapter.
#[derive(Debug, thiserror::Error)]
pub enum IdentityFsError {
    /// An identity or package file could not be read or written.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted identity file holds something other than an
    /// identity record.
    #[error("malformed identity record at {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The identity record could not be serialized.
    #[error("failed to encode identity record")]
    Encode(#[from] toml::ser::Error),

    /// A credential package was found but does not contain both a
    /// certificate and a private key.
    #[error("credential package {name} is missing a certificate or private key")]
    Package { name: String },
}

impl IdentityFsError {
    /// Convert into a domain error for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> RoostError {
        match self {
            err @ Self::Package { .. } => {
                RoostError::Provisioning(ProvisioningError::BundleImport(Box::new(err)))
            }
            other => RoostError::Storage(Box::new(other)),
        }
    }
}

impl From<IdentityFsError> for RoostError {
    fn from(err: IdentityFsError) -> Self {
        err.into_domain()
    }
}
