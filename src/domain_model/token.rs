use crate::domain_model::{RefreshTokenId, SessionId, UserId, UserRole, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

/// What callers receive from login and from every rotation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub session_id: SessionId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub id: UserId,
    pub user_type: UserRole,
    pub user_status: UserStatus,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    /// An empty `roles` slice admits every role.
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.is_empty() || roles.contains(&self.user_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: UserId,
    pub sid: SessionId,
    pub rid: RefreshTokenId,
    pub rot: u32,
    pub iat: i64,
    pub exp: i64,
}

/// Input for signing a refresh token.
///
/// `expires_at` pins the expiry (epoch seconds) when a rotation re-signs a
/// session whose lifetime was already decided at login; `None` starts a new
/// lifetime from the configured refresh TTL.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub user_id: UserId,
    pub sid: SessionId,
    pub rid: RefreshTokenId,
    pub rot: u32,
    pub expires_at: Option<i64>,
}
