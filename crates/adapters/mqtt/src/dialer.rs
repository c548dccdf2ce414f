//! Broker dialer and session backed by rumqttc.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use roost_app::ports::{BrokerDialer, BrokerSession, ConnectRequest};
use roost_domain::error::RoostError;
use roost_domain::identity::DeviceIdentity;
use roost_domain::message::InboundMessage;
use roost_domain::session::{BrokerStatus, QualityOfService};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, TlsConfiguration, Transport,
};
use tokio::sync::{Mutex, mpsc};

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::route::topic_matches_filter;

/// Capacity of each subscription inbox.
const INBOX_CAPACITY: usize = 64;

/// Subscriptions shared between the session handle and the event loop
/// driver: topic filter → inbox sender.
type SubscriptionMap = Arc<Mutex<HashMap<String, mpsc::Sender<InboundMessage>>>>;

/// Dials MQTT broker connections.
pub struct MqttDialer {
    config: MqttConfig,
}

impl MqttDialer {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    /// Build the TLS transport from the configured CA bundle and the
    /// device credentials. `None` when TLS is not configured.
    async fn transport(&self, identity: &DeviceIdentity) -> Result<Option<Transport>, MqttError> {
        let Some(tls) = &self.config.tls else {
            return Ok(None);
        };
        let ca = tokio::fs::read(&tls.ca_cert_path)
            .await
            .map_err(|source| MqttError::CaCertificate {
                path: tls.ca_cert_path.clone(),
                source,
            })?;
        Ok(Some(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((
                identity.certificate_pem.clone().into_bytes(),
                identity.private_key_pem.clone().into_bytes(),
            )),
        })))
    }
}

impl BrokerDialer for MqttDialer {
    type Session = MqttSession;

    async fn dial(&self, request: ConnectRequest) -> Result<MqttSession, RoostError> {
        let transport = self.transport(&request.identity).await?;
        let mut options = build_options(&self.config, &request);
        if let Some(transport) = transport {
            options.set_transport(transport);
        }
        let (client, eventloop) = AsyncClient::new(options, self.config.queue_capacity);
        let routes: SubscriptionMap = Arc::new(Mutex::new(HashMap::new()));
        // Nothing can fail past this point; the attempt is underway.
        let _ = request.status_tx.send(BrokerStatus::Connecting).await;
        tokio::spawn(drive(
            eventloop,
            request.status_tx,
            Arc::clone(&routes),
            client.clone(),
        ));
        tracing::debug!(
            client_id = %request.client_id,
            host = %self.config.host,
            port = self.config.port,
            "mqtt dial started"
        );
        Ok(MqttSession { client, routes })
    }
}

fn build_options(config: &MqttConfig, request: &ConnectRequest) -> MqttOptions {
    let mut options = MqttOptions::new(
        request.client_id.to_string(),
        config.host.clone(),
        config.port,
    );
    options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
    options.set_clean_session(request.clean_session);
    options
}

/// Drive the rumqttc event loop until the connection ends.
///
/// Progress goes out on the status channel; the last message before the
/// channel is dropped is a terminal status. Received publishes are
/// routed to the subscription inboxes. There is no reconnect here: any
/// error ends the loop.
async fn drive(
    mut eventloop: EventLoop,
    status_tx: mpsc::Sender<BrokerStatus>,
    routes: SubscriptionMap,
    client: AsyncClient,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    if status_tx.send(BrokerStatus::Connected).await.is_err() {
                        break;
                    }
                } else {
                    tracing::warn!(code = ?ack.code, "broker refused connection");
                    let _ = status_tx.send(BrokerStatus::ConnectionRefused).await;
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                deliver(&routes, &client, &publish.topic, publish.payload.to_vec()).await;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                let _ = status_tx.send(BrokerStatus::Disconnected).await;
                break;
            }
            Ok(_) => {}
            Err(err) => {
                let status = classify_poll_error(&err);
                tracing::warn!(%err, ?status, "mqtt event loop ended");
                let _ = status_tx.send(status).await;
                break;
            }
        }
    }
}

/// Map an event loop error onto the broker status it represents.
fn classify_poll_error(err: &ConnectionError) -> BrokerStatus {
    match err {
        ConnectionError::ConnectionRefused(_) => BrokerStatus::ConnectionRefused,
        ConnectionError::MqttState(_) | ConnectionError::NotConnAck(_) => {
            BrokerStatus::ProtocolError
        }
        ConnectionError::Io(_)
        | ConnectionError::NetworkTimeout
        | ConnectionError::FlushTimeout
        | ConnectionError::Tls(_) => BrokerStatus::ConnectionError,
        ConnectionError::RequestsDone => BrokerStatus::Disconnected,
        _ => BrokerStatus::Unknown,
    }
}

/// Route one publish to every matching subscription inbox. Inboxes with
/// a dropped receiver are unsubscribed from the broker and forgotten.
async fn deliver(routes: &SubscriptionMap, client: &AsyncClient, topic: &str, payload: Vec<u8>) {
    let matching: Vec<(String, mpsc::Sender<InboundMessage>)> = {
        let routes = routes.lock().await;
        routes
            .iter()
            .filter(|(filter, _)| topic_matches_filter(filter, topic))
            .map(|(filter, inbox)| (filter.clone(), inbox.clone()))
            .collect()
    };
    for (filter, inbox) in matching {
        if inbox
            .send(InboundMessage::new(topic, payload.clone()))
            .await
            .is_ok()
        {
            continue;
        }
        tracing::debug!(%filter, "dropping subscription with closed inbox");
        routes.lock().await.remove(&filter);
        if let Err(err) = client.unsubscribe(filter).await {
            tracing::debug!(%err, "unsubscribe for closed inbox failed");
        }
    }
}

fn map_qos(qos: QualityOfService) -> rumqttc::QoS {
    match qos {
        QualityOfService::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
    }
}

/// Live MQTT session handle.
pub struct MqttSession {
    client: AsyncClient,
    routes: SubscriptionMap,
}

impl BrokerSession for MqttSession {
    async fn subscribe(
        &self,
        topic: &str,
        qos: QualityOfService,
    ) -> Result<mpsc::Receiver<InboundMessage>, RoostError> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.routes.lock().await.insert(topic.to_owned(), tx);
        if let Err(err) = self.client.subscribe(topic, map_qos(qos)).await {
            self.routes.lock().await.remove(topic);
            return Err(MqttError::Request(err).into());
        }
        Ok(rx)
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), RoostError> {
        self.routes.lock().await.remove(topic);
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|err| MqttError::Request(err).into())
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QualityOfService,
        payload: Vec<u8>,
    ) -> Result<(), RoostError> {
        self.client
            .publish(topic, map_qos(qos), false, payload)
            .await
            .map_err(|err| MqttError::Request(err).into())
    }

    async fn disconnect(&self) -> Result<(), RoostError> {
        self.routes.lock().await.clear();
        if let Err(err) = self.client.disconnect().await {
            // Already closed; the event loop has reported the end.
            tracing::debug!(%err, "mqtt disconnect request ignored");
        }
        Ok(())
    }
}
