//! The authenticator capability consumed by the gateway

use std::collections::HashMap;

use async_trait::async_trait;

use super::{AuthError, TokenClaims};

/// Validates a bearer token and returns its claims
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// Authenticator backed by a fixed token table
///
/// Used by tests and local development where no key set is reachable.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, TokenClaims>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token`, answering with `claims`
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, claims: TokenClaims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown static token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_authenticator_accepts_known_token() {
        let auth = StaticAuthenticator::new().with_token("good", TokenClaims::for_user("min"));

        let claims = auth.authenticate("good").await.unwrap();
        assert_eq!(claims.user_id.as_deref(), Some("min"));
    }

    #[tokio::test]
    async fn static_authenticator_rejects_unknown_token() {
        let auth = StaticAuthenticator::new();
        assert!(matches!(
            auth.authenticate("nope").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
