//! Token claims and bearer parsing

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AuthError;
use crate::session::UserId;

/// Scheme prefix required in front of every login token
pub const BEARER_PREFIX: &str = "Bearer ";

/// Strip the `Bearer ` scheme from a login payload
///
/// The scheme must appear exactly once, at the start, and be followed by
/// a non-empty token.
pub fn parse_bearer(raw: &str) -> Result<&str, AuthError> {
    let token = raw
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MissingBearer)?;
    if token.is_empty() || token.contains(BEARER_PREFIX) {
        return Err(AuthError::MissingBearer);
    }
    Ok(token)
}

/// Claims carried by a validated login token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Designated user id claim
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Display name, used when no user id is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Every other claim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Claims with only a user id, mostly for tests and static tokens
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Add an arbitrary string claim
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Resolve the user: `userId`, falling back to `name`
    pub fn resolve_user_id(&self) -> Result<UserId, AuthError> {
        self.user_id
            .as_deref()
            .or(self.name.as_deref())
            .filter(|id| !id.is_empty())
            .map(UserId::from)
            .ok_or(AuthError::MissingIdentity)
    }

    /// Look up a string claim by name
    pub fn claim(&self, name: &str) -> Option<&str> {
        match name {
            "userId" => self.user_id.as_deref(),
            "name" => self.name.as_deref(),
            "sub" => self.sub.as_deref(),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }
}
