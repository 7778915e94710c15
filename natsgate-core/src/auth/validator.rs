//! JWT validation against a remote key set, with JWKS caching

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{AuthConfig, AuthError, Authenticator, TokenClaims};

/// JWKS cache TTL (1 hour)
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// RS256 JWT validator with JWKS caching
pub struct JwtValidator {
    config: AuthConfig,
    jwks_cache: Arc<RwLock<JwksCache>>,
    http_client: reqwest::Client,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

impl JwksCache {
    fn new() -> Self {
        Self {
            keys: HashMap::new(),
            fetched_at: None,
        }
    }

    fn is_expired(&self) -> bool {
        match self.fetched_at {
            Some(fetched_at) => fetched_at.elapsed() > JWKS_CACHE_TTL,
            None => true,
        }
    }
}

/// JWKS document
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Individual JWK; non-RSA keys are skipped
#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

impl JwtValidator {
    /// Create a new JwtValidator with the given configuration
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            jwks_cache: Arc::new(RwLock::new(JwksCache::new())),
            http_client: reqwest::Client::new(),
        }
    }

    /// Validate a JWT and return its claims
    pub async fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| {
            AuthError::InvalidFormat("missing kid in token header".to_string())
        })?;

        let key = self.get_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        match &self.config.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &self.config.issuer {
            validation.set_issuer(&[iss]);
        }
        validation.leeway = self.config.clock_skew_seconds;

        let token_data =
            decode::<TokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::JwtError(e),
            })?;

        Ok(token_data.claims)
    }

    /// Get a decoding key by kid, fetching JWKS if needed
    async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if !cache.is_expired() {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        // Cache miss or expired, refresh
        self.refresh_jwks().await?;

        let cache = self.jwks_cache.read().await;
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string()))
    }

    /// Force refresh the JWKS cache
    pub async fn refresh_jwks(&self) -> Result<(), AuthError> {
        let url = &self.config.jwks_url;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let (Some(kid), Some(n), Some(e)) = (jwk.kid, jwk.n, jwk.e) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }
            let key = DecodingKey::from_rsa_components(&n, &e)
                .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;
            keys.insert(kid, key);
        }
        debug!(url = %url, keys = keys.len(), "refreshed JWKS");

        let mut cache = self.jwks_cache.write().await;
        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());

        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[async_trait]
impl Authenticator for JwtValidator {
    async fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate(token).await
    }
}
