//! Gateway configuration

use std::time::Duration;

use natsgate_core::{AuthConfig, DeviceIdPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::http::HEALTH_PATH;

/// Where a session's device id comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceIdSource {
    /// The configured `remote_addr`, shared by every session
    #[default]
    Static,
    /// The connecting peer's IP address
    PeerAddress,
    /// The token claim named by `device_id_claim`
    Claim,
}

/// Everything a gateway needs to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path serving the websocket upgrade
    #[serde(default = "default_url_path")]
    pub url_path: String,

    /// Key set used to verify login tokens
    #[serde(default)]
    pub jwks_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u64,

    /// Bus endpoint; `memory://` runs an in-process bus
    #[serde(default = "default_bus_address")]
    pub bus_address: String,

    #[serde(default = "default_bus_pool_size")]
    pub bus_pool_size: usize,

    /// Topics clients may subscribe to
    #[serde(default)]
    pub topics: Vec<String>,

    /// Device id handed to every session under the static policy
    #[serde(default = "default_remote_addr")]
    pub remote_addr: String,

    #[serde(default)]
    pub device_id_policy: DeviceIdSource,

    /// Claim read under the claim policy
    #[serde(default = "default_device_id_claim")]
    pub device_id_claim: String,

    /// Unauthenticated sessions tolerated before a sweep runs
    #[serde(default = "default_max_unauthenticated_sessions")]
    pub max_unauthenticated_sessions: usize,

    /// Age after which an unauthenticated session may be swept
    #[serde(default = "default_unauthenticated_timeout", with = "humantime_serde")]
    pub unauthenticated_timeout: Duration,

    /// Largest frame accepted before login
    #[serde(default = "default_max_unauthenticated_frame_bytes")]
    pub max_unauthenticated_frame_bytes: usize,

    /// Largest frame or message the websocket transport will read at all
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_url_path() -> String {
    "/".to_string()
}

fn default_clock_skew_seconds() -> u64 {
    60
}

fn default_bus_address() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_bus_pool_size() -> usize {
    2
}

fn default_remote_addr() -> String {
    natsgate_core::UNKNOWN_DEVICE.to_string()
}

fn default_device_id_claim() -> String {
    "deviceId".to_string()
}

fn default_max_unauthenticated_sessions() -> usize {
    200
}

fn default_unauthenticated_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_unauthenticated_frame_bytes() -> usize {
    1024
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            url_path: default_url_path(),
            jwks_url: String::new(),
            audience: None,
            issuer: None,
            clock_skew_seconds: default_clock_skew_seconds(),
            bus_address: default_bus_address(),
            bus_pool_size: default_bus_pool_size(),
            topics: Vec::new(),
            remote_addr: default_remote_addr(),
            device_id_policy: DeviceIdSource::default(),
            device_id_claim: default_device_id_claim(),
            max_unauthenticated_sessions: default_max_unauthenticated_sessions(),
            unauthenticated_timeout: default_unauthenticated_timeout(),
            max_unauthenticated_frame_bytes: default_max_unauthenticated_frame_bytes(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl GatewayConfig {
    /// Check the values a gateway cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.bus_pool_size == 0 {
            return Err(ServerError::InvalidConfig(
                "bus_pool_size must be at least 1".to_string(),
            ));
        }
        if !self.url_path.starts_with('/') {
            return Err(ServerError::InvalidConfig(format!(
                "url_path must start with '/': {}",
                self.url_path
            )));
        }
        if self.url_path == HEALTH_PATH {
            return Err(ServerError::InvalidConfig(format!(
                "url_path collides with the health endpoint: {}",
                self.url_path
            )));
        }
        if self.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(ServerError::InvalidConfig(
                "topics must not contain empty names".to_string(),
            ));
        }
        if self.max_frame_bytes < self.max_unauthenticated_frame_bytes {
            return Err(ServerError::InvalidConfig(format!(
                "max_frame_bytes ({}) must be at least max_unauthenticated_frame_bytes ({})",
                self.max_frame_bytes, self.max_unauthenticated_frame_bytes
            )));
        }
        Ok(())
    }

    /// Token validation settings for the JWKS authenticator
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwks_url: self.jwks_url.clone(),
            audience: self.audience.clone(),
            issuer: self.issuer.clone(),
            clock_skew_seconds: self.clock_skew_seconds,
        }
    }

    /// The device-id policy these settings select
    pub fn device_policy(&self) -> DeviceIdPolicy {
        match self.device_id_policy {
            DeviceIdSource::Static => DeviceIdPolicy::fixed(self.remote_addr.as_str()),
            DeviceIdSource::PeerAddress => DeviceIdPolicy::PeerAddress,
            DeviceIdSource::Claim => DeviceIdPolicy::claim(self.device_id_claim.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_address, "0.0.0.0:8080");
        assert_eq!(config.url_path, "/");
        assert_eq!(config.bus_address, "nats://127.0.0.1:4222");
        assert_eq!(config.bus_pool_size, 2);
        assert_eq!(config.max_unauthenticated_sessions, 200);
        assert_eq!(config.unauthenticated_timeout, Duration::from_secs(60));
        assert_eq!(config.max_unauthenticated_frame_bytes, 1024);
        assert_eq!(config.max_frame_bytes, 64 * 1024);
        assert_eq!(config.device_id_policy, DeviceIdSource::Static);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            listen_address = "127.0.0.1:9000"
            topics = ["test.a", "test.b"]
            unauthenticated_timeout = "90s"
            device_id_policy = "peer_address"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_address, "127.0.0.1:9000");
        assert_eq!(config.topics, vec!["test.a", "test.b"]);
        assert_eq!(config.unauthenticated_timeout, Duration::from_secs(90));
        assert_eq!(config.device_policy(), DeviceIdPolicy::PeerAddress);
        assert_eq!(config.bus_pool_size, 2);
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = GatewayConfig {
            topics: vec!["test.a".to_string()],
            ..GatewayConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: GatewayConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_pool = GatewayConfig {
            bus_pool_size: 0,
            ..GatewayConfig::default()
        };
        assert!(zero_pool.validate().is_err());

        let relative_path = GatewayConfig {
            url_path: "ws".to_string(),
            ..GatewayConfig::default()
        };
        assert!(relative_path.validate().is_err());

        let blank_topic = GatewayConfig {
            topics: vec!["ok".to_string(), " ".to_string()],
            ..GatewayConfig::default()
        };
        assert!(blank_topic.validate().is_err());

        let small_transport_cap = GatewayConfig {
            max_frame_bytes: 512,
            ..GatewayConfig::default()
        };
        assert!(small_transport_cap.validate().is_err());
    }

    #[test]
    fn validate_rejects_ws_path_on_health_route() {
        let config = GatewayConfig {
            url_path: HEALTH_PATH.to_string(),
            ..GatewayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerError::InvalidConfig(msg)) if msg.contains("health")
        ));

        let beside = GatewayConfig {
            url_path: "/api/ws".to_string(),
            ..GatewayConfig::default()
        };
        assert!(beside.validate().is_ok());
    }

    #[test]
    fn device_policy_follows_source() {
        let config = GatewayConfig {
            remote_addr: "10.0.0.9".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.device_policy(), DeviceIdPolicy::fixed("10.0.0.9"));

        let config = GatewayConfig {
            device_id_policy: DeviceIdSource::Claim,
            ..GatewayConfig::default()
        };
        assert_eq!(config.device_policy(), DeviceIdPolicy::claim("deviceId"));
    }

    #[test]
    fn auth_config_carries_token_checks() {
        let config = GatewayConfig {
            jwks_url: "https://id.example/jwks.json".to_string(),
            audience: Some("gw".to_string()),
            ..GatewayConfig::default()
        };
        let auth = config.auth_config();
        assert!(auth.is_valid());
        assert_eq!(auth.audience.as_deref(), Some("gw"));
        assert_eq!(auth.clock_skew_seconds, 60);
    }
}
