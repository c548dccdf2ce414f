//! Device identity — the credential pair a device presents to the broker.
//!
//! An identity is created once per installation and reused on every
//! subsequent launch. It comes from one of two places: a credential
//! package shipped alongside the application, or a certificate issued by
//! the cloud credential service from a CSR.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::IdentityId;

/// ARN marker recorded for identities imported from a bundled package,
/// which have no cloud-side registration of their own.
pub const BUNDLE_IDENTITY_ARN: &str = "from-bundle";

/// How a device identity came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Imported from a credential package found in the bundle directory.
    Imported,
    /// Issued by the credential service from a CSR.
    Issued,
}

/// The persisted device identity.
///
/// Immutable once persisted, except for explicit re-issuance (clearing
/// the store and provisioning from scratch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Certificate identifier.
    pub id: IdentityId,
    /// Cloud-side resource name of the certificate, or
    /// [`BUNDLE_IDENTITY_ARN`] for imported identities.
    pub arn: String,
    /// Where the identity came from.
    pub source: IdentitySource,
    /// Device certificate, PEM encoded.
    pub certificate_pem: String,
    /// Private key matching the certificate, PEM encoded.
    pub private_key_pem: String,
    /// When the identity was provisioned.
    pub created_at: DateTime<Utc>,
}

impl DeviceIdentity {
    /// Build an identity from a freshly issued certificate.
    #[must_use]
    pub fn issued(issued: IssuedIdentity) -> Self {
        Self {
            id: issued.identity_id,
            arn: issued.identity_arn,
            source: IdentitySource::Issued,
            certificate_pem: issued.certificate_pem,
            private_key_pem: issued.private_key_pem,
            created_at: Utc::now(),
        }
    }

    /// Build an identity from a bundled credential package.
    ///
    /// The package name becomes the identity id; the ARN is the fixed
    /// [`BUNDLE_IDENTITY_ARN`] marker.
    #[must_use]
    pub fn imported(package: CredentialPackage) -> Self {
        Self {
            id: IdentityId::new(package.name),
            arn: BUNDLE_IDENTITY_ARN.to_owned(),
            source: IdentitySource::Imported,
            certificate_pem: package.certificate_pem,
            private_key_pem: package.private_key_pem,
            created_at: Utc::now(),
        }
    }
}

/// Subject fields submitted with a certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrFields {
    pub common_name: String,
    pub country_name: String,
    pub organization_name: String,
    pub organizational_unit_name: String,
}

impl Default for CsrFields {
    fn default() -> Self {
        Self {
            common_name: "roost device".to_owned(),
            country_name: "US".to_owned(),
            organization_name: "roost".to_owned(),
            organizational_unit_name: "fleet".to_owned(),
        }
    }
}

/// Response of the credential service to a successful CSR submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedIdentity {
    pub identity_id: IdentityId,
    pub identity_arn: String,
    pub certificate_pem: String,
    pub private_key_pem: String,
}

/// A pre-provisioned credential package found in the bundle directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPackage {
    /// Package name (the file stem), used as the identity id on import.
    pub name: String,
    pub certificate_pem: String,
    pub private_key_pem: String,
}
