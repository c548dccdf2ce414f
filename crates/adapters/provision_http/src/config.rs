//! Provisioning service endpoint configuration.

use serde::Deserialize;

/// Configuration for the credential and policy service client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Base URL of the provisioning REST surface.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u16,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = ProvisionConfig::default();
        assert_eq!(config.base_url, "http://localhost:9090");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            base_url = "https://provision.example.com"
            timeout_secs = 5
        "#;
        let config: ProvisionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "https://provision.example.com");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"base_url = "https://provision.example.com""#;
        let config: ProvisionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timeout_secs, 10);
    }
}
