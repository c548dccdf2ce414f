//! Broker ports — dialing a connection attempt and driving the live
//! session it produces.

use std::future::Future;

use roost_domain::error::RoostError;
use roost_domain::id::ClientId;
use roost_domain::identity::DeviceIdentity;
use roost_domain::message::InboundMessage;
use roost_domain::session::{BrokerStatus, QualityOfService};
use tokio::sync::mpsc;

/// Everything a dialer needs to start one connection attempt.
#[derive(Debug)]
pub struct ConnectRequest {
    /// Client identifier for this attempt. Callers mint a fresh one per
    /// attempt so the broker never sees two attempts under the same id.
    pub client_id: ClientId,
    /// Ask the broker to discard any state from a previous session under
    /// this client id.
    pub clean_session: bool,
    /// Credentials presented to the broker.
    pub identity: DeviceIdentity,
    /// Status channel for the attempt.
    ///
    /// The dialer emits [`BrokerStatus::Connecting`] once the attempt is
    /// underway and a terminal status as its last message, then drops the
    /// sender. Dialers never reconnect on their own; a closed channel
    /// means the attempt is over.
    pub status_tx: mpsc::Sender<BrokerStatus>,
}

/// Starts broker connection attempts.
pub trait BrokerDialer: Send + Sync {
    /// Handle for the live connection produced by [`dial`](Self::dial).
    type Session: BrokerSession;

    /// Start a connection attempt.
    ///
    /// Returns as soon as the attempt is in flight; the outcome arrives
    /// on `request.status_tx`. An `Err` here means the attempt could not
    /// start at all, and nothing was sent on the channel.
    fn dial(
        &self,
        request: ConnectRequest,
    ) -> impl Future<Output = Result<Self::Session, RoostError>> + Send;
}

/// A live broker connection.
///
/// All operations are fire-and-forget from the caller's point of view:
/// an `Ok` means the request was handed to the broker link, not that the
/// broker acted on it.
pub trait BrokerSession: Send + Sync {
    /// Subscribe to a topic filter and return the inbox that receives
    /// matching messages. Each delivery shows up on exactly one inbox
    /// receive.
    fn subscribe(
        &self,
        topic: &str,
        qos: QualityOfService,
    ) -> impl Future<Output = Result<mpsc::Receiver<InboundMessage>, RoostError>> + Send;

    /// Remove a subscription. The matching inbox stops receiving and
    /// closes.
    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), RoostError>> + Send;

    /// Publish a payload to a topic.
    fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), RoostError>> + Send;

    /// Close the connection. Idempotent; calling it on an already closed
    /// session is a no-op.
    fn disconnect(&self) -> impl Future<Output = Result<(), RoostError>> + Send;
}
