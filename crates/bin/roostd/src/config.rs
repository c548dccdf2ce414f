//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `roost.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use roost_adapter_mqtt::MqttConfig;
use roost_adapter_provision_http::ProvisionConfig;
use roost_app::services::ProvisioningConfig;
use roost_domain::identity::CsrFields;
use roost_domain::session::QualityOfService;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection settings.
    pub broker: MqttConfig,
    /// Credential and policy service settings.
    pub provisioning: ProvisioningSection,
    /// Identity persistence settings.
    pub identity: IdentitySection,
    /// Demo messaging settings.
    pub demo: DemoSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

/// Provisioning workflow configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProvisioningSection {
    /// Credential and policy service endpoint.
    pub service: ProvisionConfig,
    /// Policy attached to freshly issued identities.
    pub policy_name: String,
    /// CSR subject fields submitted on issuance.
    pub csr: CsrFields,
    /// Attachment verification attempts before proceeding anyway.
    pub verify_attempts: u32,
    /// Delay between verification attempts, in milliseconds.
    pub verify_interval_ms: u64,
}

/// Identity persistence configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Where the identity record is persisted.
    pub store_path: String,
    /// Directory scanned for bundled credential packages.
    pub bundle_dir: String,
    /// Clear any persisted identity before provisioning.
    pub reset_on_start: bool,
}

/// Demo messaging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DemoSection {
    /// Topic the agent subscribes to and publishes the gpio command on.
    pub topic: String,
    /// Quality of service for the demo topic.
    pub qos: QualityOfService,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `roost.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// the resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("roost.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROOST_BROKER_HOST") {
            self.broker.host = val;
        }
        if let Ok(val) = std::env::var("ROOST_BROKER_PORT") {
            if let Ok(port) = val.parse() {
                self.broker.port = port;
            }
        }
        if let Ok(val) = std::env::var("ROOST_PROVISION_URL") {
            self.provisioning.service.base_url = val;
        }
        if let Ok(val) = std::env::var("ROOST_POLICY_NAME") {
            self.provisioning.policy_name = val;
        }
        if let Ok(val) = std::env::var("ROOST_IDENTITY_PATH") {
            self.identity.store_path = val;
        }
        if let Ok(val) = std::env::var("ROOST_BUNDLE_DIR") {
            self.identity.bundle_dir = val;
        }
        if let Ok(val) = std::env::var("ROOST_TOPIC") {
            self.demo.topic = val;
        }
        if std::env::var("ROOST_RESET_IDENTITY").is_ok_and(|val| val == "1" || val == "true") {
            self.identity.reset_on_start = true;
        }
        if let Ok(val) = std::env::var("ROOST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.port == 0 {
            return Err(ConfigError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        if self.provisioning.service.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "provisioning service url must not be empty".to_string(),
            ));
        }
        if self.provisioning.verify_attempts == 0 {
            return Err(ConfigError::Validation(
                "verify_attempts must be at least 1".to_string(),
            ));
        }
        if self.demo.topic.is_empty() {
            return Err(ConfigError::Validation(
                "demo topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Provisioning settings in the shape the application layer takes.
    #[must_use]
    pub fn provisioning_config(&self) -> ProvisioningConfig {
        ProvisioningConfig {
            csr: self.provisioning.csr.clone(),
            policy_name: self.provisioning.policy_name.clone(),
            verify_attempts: self.provisioning.verify_attempts,
            verify_interval: Duration::from_millis(self.provisioning.verify_interval_ms),
        }
    }
}

impl Default for ProvisioningSection {
    fn default() -> Self {
        Self {
            service: ProvisionConfig::default(),
            policy_name: "roost-device".to_string(),
            csr: CsrFields::default(),
            verify_attempts: 8,
            verify_interval_ms: 250,
        }
    }
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            store_path: "roost-identity.toml".to_string(),
            bundle_dir: "bundle".to_string(),
            reset_on_start: false,
        }
    }
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            topic: "/request".to_string(),
            qos: QualityOfService::AtLeastOnce,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
