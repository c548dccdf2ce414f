//! # roostd — roost device agent
//!
//! Composition root that wires the adapters together and runs the agent.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Construct the filesystem, HTTP, and MQTT adapters
//! - Construct application services, injecting adapters via port traits
//! - Provision the device identity, connect, and run the demo exchange
//! - Handle graceful shutdown (ctrl-c → disconnect)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::time::Duration;

use anyhow::Context as _;
use roost_adapter_identity_fs::{FsBundleScanner, FsIdentityStore};
use roost_adapter_mqtt::MqttDialer;
use roost_adapter_provision_http::HttpProvisioner;
use roost_app::services::{ProvisioningService, SessionManager};
use roost_domain::session::{SessionEvent, SessionState};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// How long to wait for the broker to report Connected before giving up.
const CONNECT_DEADLINE: Duration = Duration::from_secs(30);

/// Demo payload published on the configured topic.
#[derive(Debug, Serialize)]
struct GpioCommand {
    gpio: GpioState,
}

#[derive(Debug, Serialize)]
struct GpioState {
    pin: u8,
    state: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Identity persistence and bundle import
    let store = FsIdentityStore::new(&config.identity.store_path);
    let scanner = FsBundleScanner::new(&config.identity.bundle_dir);

    // Credential and policy services share one HTTP client
    let provisioner =
        HttpProvisioner::new(&config.provisioning.service).context("provisioning client")?;

    // Services
    let provisioning = ProvisioningService::new(
        store,
        scanner,
        provisioner.clone(),
        provisioner,
        config.provisioning_config(),
    );
    let sessions = SessionManager::new(MqttDialer::new(config.broker.clone()));

    if config.identity.reset_on_start {
        provisioning
            .clear_identity()
            .await
            .context("identity reset")?;
        tracing::info!("persisted identity cleared");
    }

    let identity = provisioning
        .ensure_identity()
        .await
        .context("provisioning")?;
    tracing::info!(id = %identity.id, source = ?identity.source, "device identity ready");

    // Subscribe to session events before connecting so none are missed.
    let mut events = sessions.events();
    let client_id = sessions.connect(&identity).await.context("connect")?;
    tracing::info!(%client_id, broker = %config.broker.host, "waiting for broker session");

    wait_for_connected(&mut events).await?;

    let mut inbound = sessions
        .subscribe(&config.demo.topic, config.demo.qos)
        .await
        .context("subscribe")?;
    tokio::spawn(async move {
        while let Some(message) = inbound.recv_text().await {
            tracing::info!(topic = %message.topic, body = %message.body, "message received");
        }
    });

    let command = GpioCommand {
        gpio: GpioState { pin: 2, state: 0 },
    };
    let payload = serde_json::to_vec(&command).context("encode gpio command")?;
    sessions
        .publish(&config.demo.topic, config.demo.qos, payload)
        .await
        .context("publish")?;
    tracing::info!(topic = %config.demo.topic, "gpio command published");

    tokio::signal::ctrl_c().await.context("signal handler")?;
    tracing::info!("shutting down");
    if let Err(err) = sessions.disconnect().await {
        tracing::warn!(%err, "session teardown reported an error");
    }

    Ok(())
}

/// Log session events until the broker reports Connected; fail on a
/// terminal status or once the startup deadline passes.
async fn wait_for_connected(events: &mut broadcast::Receiver<SessionEvent>) -> anyhow::Result<()> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    tracing::info!(state = %event.state, "session event");
                    if event.state == SessionState::Connected {
                        return Ok(());
                    }
                    if event.state.is_terminal() {
                        anyhow::bail!("broker connection failed: {}", event.state);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    anyhow::bail!("session event channel closed")
                }
            }
        }
    };
    tokio::time::timeout(CONNECT_DEADLINE, wait)
        .await
        .context("broker did not report Connected before the startup deadline")?
}
