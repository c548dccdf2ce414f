//! Session state machine — how a broker connection attempt progresses.
//!
//! The lifecycle is `Disconnected → Connecting → {Connected | Refused |
//! TransportError | ProtocolError}`. An explicit disconnect returns to
//! `Disconnected` from `Connected`; failure states end the attempt and a
//! new one must be started explicitly. `Unknown` is the catch-all for
//! broker status codes this client does not recognize.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ClientId, IdentityId};

/// Connection lifecycle state of the broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session, or the last one ended cleanly.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The broker accepted the connection.
    Connected,
    /// The broker actively refused the connection.
    Refused,
    /// The broker and client disagreed at the protocol level.
    ProtocolError,
    /// The underlying transport failed (socket, TLS, timeout).
    TransportError,
    /// The broker reported a status this client does not recognize.
    Unknown,
}

impl SessionState {
    /// Whether a connection attempt is currently in progress or
    /// established.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Whether the state marks a failed attempt.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Refused | Self::ProtocolError | Self::TransportError | Self::Unknown
        )
    }

    /// Whether the attempt is over, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Disconnected || self.is_failure()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connecting => f.write_str("Connecting..."),
            Self::Connected => f.write_str("Connected"),
            Self::Refused => f.write_str("Connection Refused"),
            Self::ProtocolError => f.write_str("Protocol Error"),
            Self::TransportError => f.write_str("Connection Error"),
            Self::Unknown => f.write_str("Unknown State"),
        }
    }
}

/// Raw connection status reported by the broker transport.
///
/// Adapters emit these on the status channel of a connect attempt; the
/// session manager folds them into [`SessionState`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerStatus {
    Connecting,
    Connected,
    Disconnected,
    ConnectionRefused,
    ConnectionError,
    ProtocolError,
    Unknown,
}

impl From<BrokerStatus> for SessionState {
    fn from(status: BrokerStatus) -> Self {
        match status {
            BrokerStatus::Connecting => Self::Connecting,
            BrokerStatus::Connected => Self::Connected,
            BrokerStatus::Disconnected => Self::Disconnected,
            BrokerStatus::ConnectionRefused => Self::Refused,
            BrokerStatus::ConnectionError => Self::TransportError,
            BrokerStatus::ProtocolError => Self::ProtocolError,
            BrokerStatus::Unknown => Self::Unknown,
        }
    }
}

/// Notification published whenever the session state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// Client id of the attempt the change belongs to.
    pub client_id: ClientId,
    /// The state entered.
    pub state: SessionState,
    /// When the change was observed.
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    /// Record a state change happening now.
    #[must_use]
    pub fn new(client_id: ClientId, state: SessionState) -> Self {
        Self {
            client_id,
            state,
            at: Utc::now(),
        }
    }
}

/// The single active broker session of a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSession {
    /// Client id generated for this attempt.
    pub client_id: ClientId,
    /// Identity the session authenticated with.
    pub identity: IdentityId,
    /// Current lifecycle state.
    pub state: SessionState,
}

/// Delivery guarantee class for published and subscribed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityOfService {
    /// Fire and forget.
    #[default]
    AtMostOnce,
    /// Acknowledged delivery; duplicates possible.
    AtLeastOnce,
}

/// An active subscription on the current session.
///
/// Lifetime is bounded by the session: removed on unsubscribe and
/// dropped wholesale on teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSubscription {
    pub topic: String,
    pub qos: QualityOfService,
}
