//! MQTT transport configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the MQTT broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Capacity of the outgoing request queue.
    pub queue_capacity: usize,
    /// TLS settings; plain TCP when absent.
    pub tls: Option<TlsConfig>,
}

/// Mutual-TLS settings for the broker connection. The client
/// certificate and key come from the device identity, not from here.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Path to the CA certificate bundle, PEM encoded.
    pub ca_cert_path: PathBuf,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive_secs: 30,
            queue_capacity: 16,
            tls: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.queue_capacity, 16);
        assert!(config.tls.is_none());
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            host = "broker.example.com"
            port = 8883
            keep_alive_secs = 60
            queue_capacity = 32

            [tls]
            ca_cert_path = "/etc/roost/ca.pem"
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.host, "broker.example.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.queue_capacity, 32);
        let tls = config.tls.unwrap();
        assert_eq!(tls.ca_cert_path, PathBuf::from("/etc/roost/ca.pem"));
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.host, "192.168.1.100");
        assert_eq!(config.port, 1883);
        assert!(config.tls.is_none());
    }
}
