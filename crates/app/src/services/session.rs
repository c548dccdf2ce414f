//! Broker session lifecycle.
//!
//! One manager owns at most one broker session. `connect` starts an
//! attempt and returns once it is in flight; the outcome arrives as
//! [`SessionEvent`]s and through the state watch. A driver task folds
//! the raw statuses reported by the transport into state changes, so
//! the transport, not the caller, decides how an attempt ends. Explicit
//! `disconnect` is the one exception: it tears the session down off the
//! driver path.

use roost_domain::error::{RoostError, SessionError};
use roost_domain::id::{ClientId, IdentityId};
use roost_domain::identity::DeviceIdentity;
use roost_domain::message::{InboundMessage, TextMessage};
use roost_domain::session::{
    BrokerStatus, ConnectionSession, QualityOfService, SessionEvent, SessionState,
    TopicSubscription,
};
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::ports::{BrokerDialer, BrokerSession, ConnectRequest};

/// Capacity of the session event broadcast channel.
const EVENT_CAPACITY: usize = 32;
/// Capacity of the per-attempt broker status channel.
const STATUS_CAPACITY: usize = 16;

/// Owns the single broker session and publishes its state changes.
pub struct SessionManager<D: BrokerDialer> {
    dialer: D,
    events: broadcast::Sender<SessionEvent>,
    state: watch::Sender<SessionState>,
    active: Mutex<Option<ActiveLink<D::Session>>>,
}

/// The live connection attempt and its bookkeeping.
struct ActiveLink<S> {
    client_id: ClientId,
    identity: IdentityId,
    session: S,
    driver: JoinHandle<()>,
    subscriptions: Vec<TopicSubscription>,
}

impl<D: BrokerDialer> SessionManager<D> {
    #[must_use]
    pub fn new(dialer: D) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state, _) = watch::channel(SessionState::default());
        Self {
            dialer,
            events,
            state,
            active: Mutex::new(None),
        }
    }

    /// Start a broker connection attempt with a fresh client id.
    ///
    /// The state is `Connecting` by the time this returns. Whatever
    /// happens next comes from the transport: a `Connected`, a failure
    /// state, or a `Disconnected`, each published as a [`SessionEvent`].
    /// No retry happens on failure; connecting again is an explicit
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyActive`] when an attempt is
    /// already connecting or connected, and the dialer's error when the
    /// attempt could not start (in which case the state is untouched).
    pub async fn connect(&self, identity: &DeviceIdentity) -> Result<ClientId, RoostError> {
        let mut active = self.active.lock().await;
        if self.state().is_active() {
            return Err(SessionError::AlreadyActive.into());
        }
        if let Some(stale) = active.take() {
            // Leftover of a failed attempt; its terminal state has
            // already been published.
            tracing::debug!(client_id = %stale.client_id, "discarding finished session");
            stale.driver.abort();
        }
        let client_id = ClientId::new();
        let (status_tx, status_rx) = mpsc::channel(STATUS_CAPACITY);
        let session = self
            .dialer
            .dial(ConnectRequest {
                client_id,
                clean_session: true,
                identity: identity.clone(),
                status_tx,
            })
            .await?;
        // Connecting is set before the driver starts, so the driver can
        // only ever move the state forward from there.
        transition(
            &self.state,
            &self.events,
            client_id,
            SessionState::Connecting,
        );
        let driver = tokio::spawn(drive_status(
            client_id,
            status_rx,
            self.state.clone(),
            self.events.clone(),
        ));
        *active = Some(ActiveLink {
            client_id,
            identity: identity.id.clone(),
            session,
            driver,
            subscriptions: Vec::new(),
        });
        tracing::info!(%client_id, "broker connection attempt started");
        Ok(client_id)
    }

    /// Tear down the current session.
    ///
    /// Waits for the driver to fold the final transport status, then
    /// makes sure the state reads `Disconnected` before returning. A
    /// call without an active session is a no-op, and a call on a
    /// finished (failed) attempt only discards the leftover link.
    ///
    /// # Errors
    ///
    /// Returns the session's teardown error, after the state has still
    /// been moved to `Disconnected` and the session cleared.
    pub async fn disconnect(&self) -> Result<(), RoostError> {
        let mut active = self.active.lock().await;
        let Some(link) = active.take() else {
            return Ok(());
        };
        let ActiveLink {
            client_id,
            session,
            driver,
            ..
        } = link;
        if !self.state().is_active() {
            driver.abort();
            let _ = driver.await;
            return Ok(());
        }
        let teardown = session.disconnect().await;
        if let Err(err) = &teardown {
            tracing::warn!(%err, %client_id, "broker disconnect request failed");
            driver.abort();
        }
        let _ = driver.await;
        // The transport normally reports Disconnected itself; this is a
        // no-op then, and the fallback when it could not.
        transition(
            &self.state,
            &self.events,
            client_id,
            SessionState::Disconnected,
        );
        tracing::info!(%client_id, "broker session closed");
        teardown
    }

    /// Subscribe to a topic on the active session.
    ///
    /// Subscribing again to the same topic replaces the previous
    /// subscription; its handle stops yielding messages.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] without an active session,
    /// or the session's error when the broker request fails.
    pub async fn subscribe(
        &self,
        topic: &str,
        qos: QualityOfService,
    ) -> Result<Subscription, RoostError> {
        let mut active = self.active.lock().await;
        if !self.state().is_active() {
            return Err(SessionError::NotConnected.into());
        }
        let link = active.as_mut().ok_or(SessionError::NotConnected)?;
        let inbox = link.session.subscribe(topic, qos).await?;
        link.subscriptions.retain(|sub| sub.topic != topic);
        link.subscriptions.push(TopicSubscription {
            topic: topic.to_owned(),
            qos,
        });
        tracing::debug!(topic, "subscribed");
        Ok(Subscription {
            topic: topic.to_owned(),
            inbox,
        })
    }

    /// Remove a subscription from the active session. Its handle stops
    /// yielding messages.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] without an active session,
    /// or the session's error when the broker request fails.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), RoostError> {
        let mut active = self.active.lock().await;
        if !self.state().is_active() {
            return Err(SessionError::NotConnected.into());
        }
        let link = active.as_mut().ok_or(SessionError::NotConnected)?;
        link.session.unsubscribe(topic).await?;
        link.subscriptions.retain(|sub| sub.topic != topic);
        tracing::debug!(topic, "unsubscribed");
        Ok(())
    }

    /// Publish a payload on the active session. Fire and forget beyond
    /// what the QoS class implies.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] without an active session,
    /// or the session's error when the broker request fails.
    pub async fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> Result<(), RoostError> {
        let active = self.active.lock().await;
        if !self.state().is_active() {
            return Err(SessionError::NotConnected.into());
        }
        let link = active.as_ref().ok_or(SessionError::NotConnected)?;
        link.session.publish(topic, qos, payload).await
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch the lifecycle state as it changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Subscribe to state change notifications. Only changes after this
    /// call are delivered.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current session, if any.
    pub async fn session(&self) -> Option<ConnectionSession> {
        let active = self.active.lock().await;
        active.as_ref().map(|link| ConnectionSession {
            client_id: link.client_id,
            identity: link.identity.clone(),
            state: self.state(),
        })
    }

    /// Topics subscribed on the current session.
    pub async fn subscriptions(&self) -> Vec<TopicSubscription> {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(link) => link.subscriptions.clone(),
            None => Vec::new(),
        }
    }
}

/// Fold a state change into the watch and publish an event when the
/// state actually changed.
fn transition(
    state: &watch::Sender<SessionState>,
    events: &broadcast::Sender<SessionEvent>,
    client_id: ClientId,
    next: SessionState,
) {
    let previous = state.send_replace(next);
    if previous == next {
        return;
    }
    tracing::debug!(%client_id, from = %previous, to = %next, "session state changed");
    // broadcast::send fails only when there are no receivers, which is
    // fine to ignore.
    let _ = events.send(SessionEvent::new(client_id, next));
}

/// Apply every status the transport reports until it drops the channel.
async fn drive_status(
    client_id: ClientId,
    mut status_rx: mpsc::Receiver<BrokerStatus>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
) {
    while let Some(status) = status_rx.recv().await {
        transition(&state, &events, client_id, SessionState::from(status));
    }
}

/// Live handle on one topic subscription.
///
/// Messages matching the topic arrive here, each delivery exactly once.
/// The stream ends when the subscription is removed or the session torn
/// down.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    inbox: mpsc::Receiver<InboundMessage>,
}

impl Subscription {
    /// Topic filter this subscription covers.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next raw message, or `None` once the stream ends.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbox.recv().await
    }

    /// Receive the next message decoded as UTF-8 text (lossy), or
    /// `None` once the stream ends.
    pub async fn recv_text(&mut self) -> Option<TextMessage> {
        self.inbox.recv().await.map(InboundMessage::into_text)
    }
}
