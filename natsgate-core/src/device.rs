//! Device-id resolution
//!
//! A device id decides which sessions evict each other at login: at most
//! one live session exists per device. How that id is derived is a policy
//! choice made in configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::auth::TokenClaims;
use crate::session::DeviceId;

/// Device id used when a policy has nothing to go on
pub const UNKNOWN_DEVICE: &str = "unknown";

/// How a login resolves its device id
///
/// `Static` is the default and reproduces the historical behaviour of a
/// single configured remote-address value shared by every session. It is
/// provisional: with it, any two logins evict each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum DeviceIdPolicy {
    /// Every session gets the same configured value
    Static { value: String },
    /// The IP address of the connecting peer, without the port
    PeerAddress,
    /// A string claim from the token, or `fallback` when it is absent
    Claim {
        claim: String,
        #[serde(default)]
        fallback: Option<String>,
    },
}

impl Default for DeviceIdPolicy {
    fn default() -> Self {
        Self::Static {
            value: UNKNOWN_DEVICE.to_string(),
        }
    }
}

impl DeviceIdPolicy {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Static {
            value: value.into(),
        }
    }

    pub fn claim(claim: impl Into<String>) -> Self {
        Self::Claim {
            claim: claim.into(),
            fallback: None,
        }
    }

    /// Resolve the device for a validated login
    pub fn resolve(&self, claims: &TokenClaims, peer: Option<SocketAddr>) -> DeviceId {
        match self {
            Self::Static { value } => DeviceId::new(value.as_str()),
            Self::PeerAddress => peer
                .map(|addr| DeviceId::new(addr.ip().to_string()))
                .unwrap_or_else(|| DeviceId::new(UNKNOWN_DEVICE)),
            Self::Claim { claim, fallback } => claims
                .claim(claim)
                .filter(|value| !value.is_empty())
                .or(fallback.as_deref())
                .map(DeviceId::new)
                .unwrap_or_else(|| DeviceId::new(UNKNOWN_DEVICE)),
        }
    }
}
