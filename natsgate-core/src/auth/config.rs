//! Configuration for bearer token validation

use serde::{Deserialize, Serialize};

/// Key set and claim checks applied to login tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// URL of the JSON Web Key Set used to verify token signatures
    #[serde(default)]
    pub jwks_url: String,

    /// Expected `aud` claim; not checked when unset
    #[serde(default)]
    pub audience: Option<String>,

    /// Expected `iss` claim; not checked when unset
    #[serde(default)]
    pub issuer: Option<String>,

    /// Clock skew leeway in seconds for token expiry validation
    #[serde(default = "default_clock_skew")]
    pub clock_skew_seconds: u64,
}

fn default_clock_skew() -> u64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: String::new(),
            audience: None,
            issuer: None,
            clock_skew_seconds: default_clock_skew(),
        }
    }
}

impl AuthConfig {
    /// Create a config for the given key set URL
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Check if the config can be used to validate tokens
    pub fn is_valid(&self) -> bool {
        !self.jwks_url.is_empty()
    }
}
