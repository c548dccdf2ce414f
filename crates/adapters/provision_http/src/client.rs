//! HTTP client for the credential and policy services.

use std::time::Duration;

use roost_app::ports::{CredentialIssuer, PolicyManager};
use roost_domain::error::RoostError;
use roost_domain::identity::{CsrFields, IssuedIdentity};
use serde::{Deserialize, Serialize};

use crate::config::ProvisionConfig;
use crate::error::ProvisionHttpError;

/// Client for the REST provisioning surface.
///
/// Cheap to clone; clones share the connection pool, so the same value
/// can serve as both the issuer and the policy manager.
#[derive(Debug, Clone)]
pub struct HttpProvisioner {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AttachRequest<'a> {
    target_arn: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct AttachmentStatus {
    attached: bool,
}

impl HttpProvisioner {
    /// Build a provisioner for the configured service.
    ///
    /// # Errors
    ///
    /// Fails when the underlying HTTP client cannot be constructed.
    pub fn new(config: &ProvisionConfig) -> Result<Self, ProvisionHttpError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()
            .map_err(ProvisionHttpError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn attachments_url(&self, policy_name: &str) -> String {
        format!("{}/v1/policies/{policy_name}/attachments", self.base_url)
    }
}

impl CredentialIssuer for HttpProvisioner {
    async fn issue(&self, csr: &CsrFields) -> Result<IssuedIdentity, RoostError> {
        let url = format!("{}/v1/identities", self.base_url);
        let issued = self
            .http
            .post(url)
            .json(csr)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(ProvisionHttpError::Issue)?
            .json::<IssuedIdentity>()
            .await
            .map_err(ProvisionHttpError::Issue)?;
        tracing::debug!(id = %issued.identity_id, "certificate issued");
        Ok(issued)
    }
}

impl PolicyManager for HttpProvisioner {
    async fn attach_policy(&self, policy_name: &str, identity_arn: &str) -> Result<(), RoostError> {
        self.http
            .put(self.attachments_url(policy_name))
            .json(&AttachRequest {
                target_arn: identity_arn,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(ProvisionHttpError::Attach)?;
        tracing::debug!(policy = policy_name, "policy attached");
        Ok(())
    }

    async fn is_policy_attached(
        &self,
        policy_name: &str,
        identity_arn: &str,
    ) -> Result<bool, RoostError> {
        let status = self
            .http
            .get(self.attachments_url(policy_name))
            .query(&[("target", identity_arn)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(ProvisionHttpError::Verify)?
            .json::<AttachmentStatus>()
            .await
            .map_err(ProvisionHttpError::Verify)?;
        Ok(status.attached)
    }
}
