//! Device provisioning workflow.
//!
//! Resolves the device identity in three steps: reuse the persisted
//! identity, import a bundled credential package, or issue a fresh
//! certificate and attach the authorization policy to it.

use std::time::Duration;

use roost_domain::error::RoostError;
use roost_domain::identity::{CsrFields, DeviceIdentity};

use crate::ports::{BundleScanner, CredentialIssuer, IdentityStore, PolicyManager};

/// Tuning knobs for the provisioning workflow.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Subject fields submitted with certificate signing requests.
    pub csr: CsrFields,
    /// Policy attached to freshly issued identities.
    pub policy_name: String,
    /// How many times to check for the policy attachment before moving
    /// on without confirmation.
    pub verify_attempts: u32,
    /// Pause between attachment checks.
    pub verify_interval: Duration,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            csr: CsrFields::default(),
            policy_name: "roost-device".to_owned(),
            verify_attempts: 8,
            verify_interval: Duration::from_millis(250),
        }
    }
}

/// Establishes the device identity used for broker authentication.
pub struct ProvisioningService<S, B, I, P> {
    store: S,
    scanner: B,
    issuer: I,
    policies: P,
    config: ProvisioningConfig,
}

impl<S, B, I, P> ProvisioningService<S, B, I, P>
where
    S: IdentityStore,
    B: BundleScanner,
    I: CredentialIssuer,
    P: PolicyManager,
{
    pub fn new(store: S, scanner: B, issuer: I, policies: P, config: ProvisioningConfig) -> Self {
        Self {
            store,
            scanner,
            issuer,
            policies,
            config,
        }
    }

    /// Resolve the device identity, provisioning one if needed.
    ///
    /// A persisted identity wins over everything else. Without one, a
    /// credential package found in the bundle directory is imported and
    /// persisted as is; imported identities have no cloud registration,
    /// so no policy is attached to them. Only when neither exists is a
    /// certificate issued, persisted, and the configured policy attached
    /// to it.
    ///
    /// # Errors
    ///
    /// Fails when the identity store cannot be read or written, when a
    /// present credential package cannot be imported, or when issuance
    /// or policy attachment fails. Nothing is persisted when issuance
    /// fails, so the next call starts from scratch.
    pub async fn ensure_identity(&self) -> Result<DeviceIdentity, RoostError> {
        if let Some(identity) = self.store.load().await? {
            tracing::debug!(id = %identity.id, "reusing persisted identity");
            return Ok(identity);
        }
        if let Some(package) = self.scanner.find_package().await? {
            let identity = DeviceIdentity::imported(package);
            self.store.save(&identity).await?;
            tracing::info!(id = %identity.id, "imported bundled credential package");
            return Ok(identity);
        }
        let issued = self.issuer.issue(&self.config.csr).await?;
        let identity = DeviceIdentity::issued(issued);
        self.store.save(&identity).await?;
        self.policies
            .attach_policy(&self.config.policy_name, &identity.arn)
            .await?;
        self.verify_attachment(&identity.arn).await;
        tracing::info!(id = %identity.id, "issued new device identity");
        Ok(identity)
    }

    /// Remove the persisted identity so the next
    /// [`ensure_identity`](Self::ensure_identity) provisions from
    /// scratch.
    ///
    /// # Errors
    ///
    /// Fails when the identity store cannot be written.
    pub async fn clear_identity(&self) -> Result<(), RoostError> {
        self.store.clear().await
    }

    /// Poll until the policy attachment becomes visible.
    ///
    /// Attachments propagate with a lag, so this replaces a fixed settle
    /// delay with a bounded number of checks. Running out of attempts is
    /// not fatal; the connection attempt that follows surfaces any real
    /// authorization problem.
    async fn verify_attachment(&self, identity_arn: &str) {
        for attempt in 1..=self.config.verify_attempts {
            match self
                .policies
                .is_policy_attached(&self.config.policy_name, identity_arn)
                .await
            {
                Ok(true) => {
                    tracing::debug!(attempt, "policy attachment confirmed");
                    return;
                }
                Ok(false) => {}
                Err(err) => tracing::debug!(%err, attempt, "attachment check failed"),
            }
            if attempt < self.config.verify_attempts {
                tokio::time::sleep(self.config.verify_interval).await;
            }
        }
        tracing::warn!(
            policy = %self.config.policy_name,
            "policy attachment not confirmed, connecting anyway"
        );
    }
}
