use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The record was missing, revoked, or already advanced past the expected
    /// refresh-token id.
    Conflict,
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Unconditionally write `record` under its session id.
    async fn set_with_ttl(
        &self,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError>;

    /// Write `record` only if the stored record for the same session exists, is
    /// not revoked, and still carries `expected` as its refresh-token id.
    /// The check and the write happen as one atomic step.
    async fn compare_and_set(
        &self,
        expected: &RefreshTokenId,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<CasOutcome, SessionStoreError>;

    /// Set `revoked` on the stored record, keeping its TTL. Returns `false`
    /// when there is no record; a missing record is never created.
    async fn mark_revoked(&self, sid: &SessionId) -> Result<bool, SessionStoreError>;

    async fn delete(&self, sid: &SessionId) -> Result<(), SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store timed out after {0:?}")]
    Timeout(Duration),
    #[error("session store error: {0}")]
    Store(String),
}
