//! MQTT adapter error types.

use std::path::PathBuf;

use roost_domain::error::{RoostError, SessionError};

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The CA certificate for the TLS transport could not be read.
    #[error("failed to read CA certificate at {}", path.display())]
    CaCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Request(#[from] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a domain error for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> RoostError {
        RoostError::Session(SessionError::Transport(Box::new(self)))
    }
}

impl From<MqttError> for RoostError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
