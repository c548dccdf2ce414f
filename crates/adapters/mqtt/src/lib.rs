//! # roost-adapter-mqtt
//!
//! MQTT implementation of the broker ports via rumqttc.
//!
//! ## Responsibilities
//! - Dial broker connections, plain TCP or mutual TLS with the device
//!   certificate
//! - Drive the rumqttc event loop and report connection progress as
//!   [`BrokerStatus`](roost_domain::session::BrokerStatus) values
//! - Route received publishes to subscription inboxes by topic filter
//!
//! ## Dependency rule
//! Depends on `roost-app` (port traits) and `roost-domain`. Never the
//! other way around.

mod config;
mod dialer;
mod error;
mod route;

pub use config::{MqttConfig, TlsConfig};
pub use dialer::{MqttDialer, MqttSession};
pub use error::MqttError;
