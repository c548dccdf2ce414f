//! Common error types used across the workspace.
//!
//! Every failure is terminal for the operation that produced it; nothing
//! in this system retries on its own. Adapters wrap their library errors
//! in their own enums and convert into these via `into_domain`.

/// Top-level error for the provisioning and session workflows.
#[derive(Debug, thiserror::Error)]
pub enum RoostError {
    /// The device identity could not be located or created.
    #[error("provisioning error")]
    Provisioning(#[from] ProvisioningError),

    /// The broker session failed or was misused.
    #[error("session error")]
    Session(#[from] SessionError),

    /// Durable local storage failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures while locating or creating the device identity.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    /// The credential service failed to issue a certificate. Nothing is
    /// persisted when this happens.
    #[error("certificate issuance failed")]
    Issuance(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The policy service could not attach the authorization policy to
    /// the freshly issued identity.
    #[error("policy attachment failed")]
    PolicyAttach(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A bundled credential package was found but could not be imported.
    #[error("credential package import failed")]
    BundleImport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures while establishing or using a broker session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The broker actively refused the connection.
    #[error("connection refused by the broker")]
    Refused,

    /// The broker and client disagreed at the protocol level.
    #[error("broker protocol error")]
    Protocol(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The underlying transport failed (socket, TLS, timeout).
    #[error("broker transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The broker reported a status this client does not recognize.
    #[error("broker reported an unrecognized state")]
    UnknownState,

    /// A connect was requested while an attempt was already in flight
    /// or a session was established.
    #[error("a connection attempt is already active")]
    AlreadyActive,

    /// An operation that needs a live session was called without one.
    #[error("no active broker session")]
    NotConnected,
}
