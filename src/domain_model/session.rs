use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one login session, shared by every refresh token
/// rotated from the same login.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single refresh-token generation. Changes on every rotation.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshTokenId(pub String);

impl RefreshTokenId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefreshTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The stored state of a session.
///
/// `refresh_token_id` always names the only refresh token of the session that
/// may still be rotated. `expires_at` is the absolute expiry (epoch seconds) of
/// that token and is the sole source of the store entry's time-to-live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub refresh_token_id: RefreshTokenId,
    pub user_id: UserId,
    pub revoked: bool,
    pub expires_at: i64,
}

impl SessionRecord {
    /// Seconds the store entry should live, never less than one.
    pub fn ttl_secs(&self) -> u64 {
        ttl_secs_until(self.expires_at, Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}

fn ttl_secs_until(expires_at: i64, now: DateTime<Utc>) -> u64 {
    let secs = expires_at - now.timestamp();
    if secs <= 0 { 1 } else { secs as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: i64) -> SessionRecord {
        SessionRecord {
            session_id: SessionId("sid-1".to_string()),
            refresh_token_id: RefreshTokenId("rid-1".to_string()),
            user_id: UserId(7),
            revoked: false,
            expires_at,
        }
    }

    #[test]
    fn ttl_follows_embedded_expiry() {
        let now = Utc::now();
        assert_eq!(ttl_secs_until(now.timestamp() + 900, now), 900);
    }

    #[test]
    fn ttl_never_drops_below_one_second() {
        let now = Utc::now();
        assert_eq!(ttl_secs_until(now.timestamp(), now), 1);
        assert_eq!(ttl_secs_until(now.timestamp() - 30, now), 1);
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(record(1_700_000_000)).unwrap();
        assert_eq!(value["sessionId"], "sid-1");
        assert_eq!(value["refreshTokenId"], "rid-1");
        assert_eq!(value["userId"], 7);
        assert_eq!(value["revoked"], false);
        assert_eq!(value["expiresAt"], 1_700_000_000);
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        assert!(record(now.timestamp()).is_expired_at(now));
        assert!(!record(now.timestamp() + 1).is_expired_at(now));
    }
}
