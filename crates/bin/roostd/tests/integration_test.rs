//! End-to-end flows for the full agent stack.
//!
//! Each test wires the real `ProvisioningService` and `SessionManager`
//! against in-memory ports: a shared identity store, a counting issuer, a
//! recording policy manager, and a loopback broker that routes published
//! payloads back to matching subscriptions. No network, no disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roost_app::ports::{
    BrokerDialer, BrokerSession, BundleScanner, ConnectRequest, CredentialIssuer, IdentityStore,
    PolicyManager,
};
use roost_app::services::{ProvisioningConfig, ProvisioningService, SessionManager};
use roost_domain::error::{RoostError, SessionError};
use roost_domain::id::{ClientId, IdentityId};
use roost_domain::identity::{
    CredentialPackage, CsrFields, DeviceIdentity, IdentitySource, IssuedIdentity,
};
use roost_domain::message::InboundMessage;
use roost_domain::session::{BrokerStatus, QualityOfService, SessionEvent, SessionState};
use tokio::sync::{broadcast, mpsc};

// ---------------------------------------------------------------------------
// In-memory ports
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct MemoryIdentityStore {
    identity: Arc<Mutex<Option<DeviceIdentity>>>,
}

impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Option<DeviceIdentity>, RoostError> {
        Ok(self.identity.lock().unwrap().clone())
    }

    async fn save(&self, identity: &DeviceIdentity) -> Result<(), RoostError> {
        *self.identity.lock().unwrap() = Some(identity.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), RoostError> {
        *self.identity.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CountingScanner {
    package: Arc<Mutex<Option<CredentialPackage>>>,
    scans: Arc<AtomicUsize>,
}

impl BundleScanner for CountingScanner {
    async fn find_package(&self) -> Result<Option<CredentialPackage>, RoostError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(self.package.lock().unwrap().clone())
    }
}

#[derive(Clone, Default)]
struct CountingIssuer {
    issued: Arc<AtomicUsize>,
}

impl CredentialIssuer for CountingIssuer {
    async fn issue(&self, _csr: &CsrFields) -> Result<IssuedIdentity, RoostError> {
        let serial = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(IssuedIdentity {
            identity_id: IdentityId::new(format!("cert-{serial}")),
            identity_arn: format!("arn:cloud:cert/cert-{serial}"),
            certificate_pem: "CERT".to_owned(),
            private_key_pem: "KEY".to_owned(),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingPolicies {
    attached: Arc<Mutex<Vec<(String, String)>>>,
}

impl PolicyManager for RecordingPolicies {
    async fn attach_policy(&self, policy_name: &str, identity_arn: &str) -> Result<(), RoostError> {
        self.attached
            .lock()
            .unwrap()
            .push((policy_name.to_owned(), identity_arn.to_owned()));
        Ok(())
    }

    async fn is_policy_attached(
        &self,
        policy_name: &str,
        identity_arn: &str,
    ) -> Result<bool, RoostError> {
        Ok(self
            .attached
            .lock()
            .unwrap()
            .iter()
            .any(|(policy, arn)| policy == policy_name && arn == identity_arn))
    }
}

/// Broker fake that loops published payloads back into matching
/// subscription inboxes. When `hold_connecting` is set, attempts report
/// Connecting and then stay pending.
#[derive(Clone, Default)]
struct LoopbackBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Default)]
struct BrokerInner {
    hold_connecting: AtomicBool,
    dials: AtomicUsize,
    requests: Mutex<Vec<(ClientId, bool, IdentityId)>>,
    pending: Mutex<Option<mpsc::Sender<BrokerStatus>>>,
    inboxes: Mutex<HashMap<String, mpsc::Sender<InboundMessage>>>,
}

struct LoopbackSession {
    inner: Arc<BrokerInner>,
}

impl BrokerDialer for LoopbackBroker {
    type Session = LoopbackSession;

    async fn dial(&self, request: ConnectRequest) -> Result<Self::Session, RoostError> {
        self.inner.dials.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().unwrap().push((
            request.client_id,
            request.clean_session,
            request.identity.id.clone(),
        ));
        request.status_tx.send(BrokerStatus::Connecting).await.unwrap();
        if !self.inner.hold_connecting.load(Ordering::SeqCst) {
            request.status_tx.send(BrokerStatus::Connected).await.unwrap();
        }
        *self.inner.pending.lock().unwrap() = Some(request.status_tx);
        Ok(LoopbackSession {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl BrokerSession for LoopbackSession {
    async fn subscribe(
        &self,
        topic: &str,
        _qos: QualityOfService,
    ) -> Result<mpsc::Receiver<InboundMessage>, RoostError> {
        let (tx, rx) = mpsc::channel(8);
        self.inner.inboxes.lock().unwrap().insert(topic.to_owned(), tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), RoostError> {
        self.inner.inboxes.lock().unwrap().remove(topic);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        _qos: QualityOfService,
        payload: Vec<u8>,
    ) -> Result<(), RoostError> {
        let sender = self.inner.inboxes.lock().unwrap().get(topic).cloned();
        if let Some(sender) = sender {
            sender.send(InboundMessage::new(topic, payload)).await.unwrap();
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), RoostError> {
        let pending = self.inner.pending.lock().unwrap().take();
        if let Some(status_tx) = pending {
            status_tx.send(BrokerStatus::Disconnected).await.unwrap();
        }
        self.inner.inboxes.lock().unwrap().clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

type TestProvisioning =
    ProvisioningService<MemoryIdentityStore, CountingScanner, CountingIssuer, RecordingPolicies>;

struct TestAgent {
    provisioning: TestProvisioning,
    sessions: SessionManager<LoopbackBroker>,
    store: MemoryIdentityStore,
    scanner: CountingScanner,
    issuer: CountingIssuer,
    policies: RecordingPolicies,
    broker: LoopbackBroker,
}

impl TestAgent {
    /// Build a second provisioning service over the same stores, as a
    /// fresh process launch would.
    fn relaunch(&self) -> TestProvisioning {
        ProvisioningService::new(
            self.store.clone(),
            self.scanner.clone(),
            self.issuer.clone(),
            self.policies.clone(),
            provisioning_config(),
        )
    }
}

fn provisioning_config() -> ProvisioningConfig {
    ProvisioningConfig {
        verify_interval: Duration::from_millis(1),
        ..ProvisioningConfig::default()
    }
}

/// Fully-wired agent backed by in-memory ports.
fn agent() -> TestAgent {
    let store = MemoryIdentityStore::default();
    let scanner = CountingScanner::default();
    let issuer = CountingIssuer::default();
    let policies = RecordingPolicies::default();
    let broker = LoopbackBroker::default();

    let provisioning = ProvisioningService::new(
        store.clone(),
        scanner.clone(),
        issuer.clone(),
        policies.clone(),
        provisioning_config(),
    );
    let sessions = SessionManager::new(broker.clone());

    TestAgent {
        provisioning,
        sessions,
        store,
        scanner,
        issuer,
        policies,
        broker,
    }
}

async fn wait_for_state(
    events: &mut broadcast::Receiver<SessionEvent>,
    state: SessionState,
) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event stream open");
            if event.state == state {
                return event;
            }
        }
    })
    .await
    .expect("state should be reached in time")
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_issue_once_and_persist_identity_on_fresh_install() {
    let agent = agent();

    let identity = agent.provisioning.ensure_identity().await.unwrap();

    assert_eq!(identity.source, IdentitySource::Issued);
    assert_eq!(agent.issuer.issued.load(Ordering::SeqCst), 1);
    assert_eq!(
        agent.store.identity.lock().unwrap().as_ref(),
        Some(&identity)
    );
    let attached = agent.policies.attached.lock().unwrap();
    assert_eq!(
        attached.as_slice(),
        [("roost-device".to_owned(), identity.arn.clone())]
    );
}

#[tokio::test]
async fn should_import_bundled_package_instead_of_issuing() {
    let agent = agent();
    *agent.scanner.package.lock().unwrap() = Some(CredentialPackage {
        name: "factory-device".to_owned(),
        certificate_pem: "CERT".to_owned(),
        private_key_pem: "KEY".to_owned(),
    });

    let identity = agent.provisioning.ensure_identity().await.unwrap();

    assert_eq!(identity.source, IdentitySource::Imported);
    assert_eq!(identity.id.as_str(), "factory-device");
    assert_eq!(agent.issuer.issued.load(Ordering::SeqCst), 0);
    assert!(agent.policies.attached.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reuse_persisted_identity_on_relaunch_without_scan_or_issuance() {
    let agent = agent();
    let first = agent.provisioning.ensure_identity().await.unwrap();
    let scans_before = agent.scanner.scans.load(Ordering::SeqCst);

    let second = agent.relaunch().ensure_identity().await.unwrap();

    assert_eq!(second, first);
    assert_eq!(agent.issuer.issued.load(Ordering::SeqCst), 1);
    assert_eq!(agent.scanner.scans.load(Ordering::SeqCst), scans_before);
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_publish_connecting_then_connected_exactly_once() {
    let agent = agent();
    let identity = agent.provisioning.ensure_identity().await.unwrap();
    let mut events = agent.sessions.events();

    let client_id = agent.sessions.connect(&identity).await.unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!(first.state, SessionState::Connecting);
    assert_eq!(second.state, SessionState::Connected);
    assert_eq!(first.client_id, client_id);
    assert_eq!(second.client_id, client_id);
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn should_reject_second_connect_while_first_is_connecting() {
    let agent = agent();
    agent.broker.inner.hold_connecting.store(true, Ordering::SeqCst);
    let identity = agent.provisioning.ensure_identity().await.unwrap();

    agent.sessions.connect(&identity).await.unwrap();
    assert_eq!(agent.sessions.state(), SessionState::Connecting);

    let err = agent.sessions.connect(&identity).await.unwrap_err();

    assert!(matches!(
        err,
        RoostError::Session(SessionError::AlreadyActive)
    ));
    assert_eq!(agent.broker.inner.dials.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn should_deliver_each_published_payload_exactly_once() {
    let agent = agent();
    let identity = agent.provisioning.ensure_identity().await.unwrap();
    let mut events = agent.sessions.events();
    agent.sessions.connect(&identity).await.unwrap();
    wait_for_state(&mut events, SessionState::Connected).await;

    let mut subscription = agent
        .sessions
        .subscribe("/request", QualityOfService::AtLeastOnce)
        .await
        .unwrap();
    agent
        .sessions
        .publish(
            "/request",
            QualityOfService::AtLeastOnce,
            br#"{"gpio":{"pin":2,"state":0}}"#.to_vec(),
        )
        .await
        .unwrap();

    let message = subscription.recv_text().await.unwrap();
    assert_eq!(message.topic, "/request");
    assert_eq!(message.body, r#"{"gpio":{"pin":2,"state":0}}"#);
    let extra = tokio::time::timeout(Duration::from_millis(50), subscription.recv()).await;
    assert!(extra.is_err());
}

#[tokio::test]
async fn should_tear_down_session_and_subscriptions_on_disconnect() {
    let agent = agent();
    let identity = agent.provisioning.ensure_identity().await.unwrap();
    let mut events = agent.sessions.events();
    agent.sessions.connect(&identity).await.unwrap();
    wait_for_state(&mut events, SessionState::Connected).await;
    let mut subscription = agent
        .sessions
        .subscribe("/request", QualityOfService::AtLeastOnce)
        .await
        .unwrap();

    agent.sessions.disconnect().await.unwrap();

    wait_for_state(&mut events, SessionState::Disconnected).await;
    assert_eq!(agent.sessions.state(), SessionState::Disconnected);
    assert!(agent.sessions.session().await.is_none());
    assert!(agent.sessions.subscriptions().await.is_empty());
    assert_eq!(subscription.recv().await, None);
}

#[tokio::test]
async fn should_reconnect_with_fresh_client_id_and_clean_session() {
    let agent = agent();
    let identity = agent.provisioning.ensure_identity().await.unwrap();
    let mut events = agent.sessions.events();

    let first = agent.sessions.connect(&identity).await.unwrap();
    wait_for_state(&mut events, SessionState::Connected).await;
    agent.sessions.disconnect().await.unwrap();
    wait_for_state(&mut events, SessionState::Disconnected).await;

    let second = agent.sessions.connect(&identity).await.unwrap();
    wait_for_state(&mut events, SessionState::Connected).await;

    assert_ne!(first, second);
    let requests = agent.broker.inner.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|(_, clean, id)| *clean && *id == identity.id));
}

#[tokio::test]
async fn should_treat_disconnect_without_session_as_noop() {
    let agent = agent();

    agent.sessions.disconnect().await.unwrap();

    assert_eq!(agent.sessions.state(), SessionState::Disconnected);
    assert_eq!(agent.broker.inner.dials.load(Ordering::SeqCst), 0);
}
