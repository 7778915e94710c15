use std::time::Duration;

use natsgate_server::{DeviceIdSource, GatewayConfig};
use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
///
/// Keys match [`GatewayConfig`]; anything left unset falls through to the
/// next layer and finally to the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub listen_address: Option<String>,
    pub url_path: Option<String>,
    pub jwks_url: Option<String>,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub clock_skew_seconds: Option<u64>,
    pub bus_address: Option<String>,
    pub bus_pool_size: Option<usize>,
    pub topics: Option<Vec<String>>,
    pub remote_addr: Option<String>,
    pub device_id_policy: Option<DeviceIdSource>,
    pub device_id_claim: Option<String>,
    pub max_unauthenticated_sessions: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    pub unauthenticated_timeout: Option<Duration>,
    pub max_unauthenticated_frame_bytes: Option<usize>,
    pub max_frame_bytes: Option<usize>,
}

impl RawConfig {
    /// Layer `overlay` on top of `self`; set values in the overlay win
    pub fn merge(self, overlay: RawConfig) -> RawConfig {
        RawConfig {
            listen_address: overlay.listen_address.or(self.listen_address),
            url_path: overlay.url_path.or(self.url_path),
            jwks_url: overlay.jwks_url.or(self.jwks_url),
            audience: overlay.audience.or(self.audience),
            issuer: overlay.issuer.or(self.issuer),
            clock_skew_seconds: overlay.clock_skew_seconds.or(self.clock_skew_seconds),
            bus_address: overlay.bus_address.or(self.bus_address),
            bus_pool_size: overlay.bus_pool_size.or(self.bus_pool_size),
            topics: overlay.topics.or(self.topics),
            remote_addr: overlay.remote_addr.or(self.remote_addr),
            device_id_policy: overlay.device_id_policy.or(self.device_id_policy),
            device_id_claim: overlay.device_id_claim.or(self.device_id_claim),
            max_unauthenticated_sessions: overlay
                .max_unauthenticated_sessions
                .or(self.max_unauthenticated_sessions),
            unauthenticated_timeout: overlay
                .unauthenticated_timeout
                .or(self.unauthenticated_timeout),
            max_unauthenticated_frame_bytes: overlay
                .max_unauthenticated_frame_bytes
                .or(self.max_unauthenticated_frame_bytes),
            max_frame_bytes: overlay.max_frame_bytes.or(self.max_frame_bytes),
        }
    }

    /// Apply defaults for everything still unset
    pub fn finalize(self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            listen_address: self.listen_address.unwrap_or(defaults.listen_address),
            url_path: self.url_path.unwrap_or(defaults.url_path),
            jwks_url: self.jwks_url.unwrap_or(defaults.jwks_url),
            audience: self.audience.or(defaults.audience),
            issuer: self.issuer.or(defaults.issuer),
            clock_skew_seconds: self
                .clock_skew_seconds
                .unwrap_or(defaults.clock_skew_seconds),
            bus_address: self.bus_address.unwrap_or(defaults.bus_address),
            bus_pool_size: self.bus_pool_size.unwrap_or(defaults.bus_pool_size),
            topics: self.topics.unwrap_or(defaults.topics),
            remote_addr: self.remote_addr.unwrap_or(defaults.remote_addr),
            device_id_policy: self.device_id_policy.unwrap_or(defaults.device_id_policy),
            device_id_claim: self.device_id_claim.unwrap_or(defaults.device_id_claim),
            max_unauthenticated_sessions: self
                .max_unauthenticated_sessions
                .unwrap_or(defaults.max_unauthenticated_sessions),
            unauthenticated_timeout: self
                .unauthenticated_timeout
                .unwrap_or(defaults.unauthenticated_timeout),
            max_unauthenticated_frame_bytes: self
                .max_unauthenticated_frame_bytes
                .unwrap_or(defaults.max_unauthenticated_frame_bytes),
            max_frame_bytes: self.max_frame_bytes.unwrap_or(defaults.max_frame_bytes),
        }
    }
}
