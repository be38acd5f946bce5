use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, FromRedisValue, RedisError, RedisResult, Script, Value};
const SESSION_CAS: &str = include_str!("session_cas.lua");
const SESSION_REVOKE: &str = include_str!("session_revoke.lua");

/// Session records stored as JSON strings under `<prefix>:<sid>` with `EX`
/// set from the record's expiry.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    cas: Script,
    revoke: Script,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            cas: Script::new(SESSION_CAS),
            revoke: Script::new(SESSION_REVOKE),
        }
    }

    fn key(&self, sid: &SessionId) -> String {
        format!("{}:{}", self.prefix, sid)
    }
}

fn encode_record(record: &SessionRecord) -> Result<String, SessionStoreError> {
    serde_json::to_string(record).map_err(|e| SessionStoreError::Store(e.to_string()))
}

impl FromRedisValue for SessionRecord {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let raw: String = redis::from_redis_value(v)?;
        let record = serde_json::from_str::<SessionRecord>(&raw).map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid session record",
                e.to_string(),
            ))
        })?;
        Ok(record)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, SessionStoreError> {
        let key = self.key(sid);
        let mut conn = self.conn.clone();
        let record: Option<SessionRecord> = conn
            .get(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(record)
    }

    async fn set_with_ttl(
        &self,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let key = self.key(&record.session_id);
        let payload = encode_record(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, payload, ttl_secs.max(1))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected: &RefreshTokenId,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<CasOutcome, SessionStoreError> {
        let key = self.key(&record.session_id);
        let payload = encode_record(record)?;
        let mut conn = self.conn.clone();
        let status: i64 = self
            .cas
            .key(&key)
            .arg(expected.as_str())
            .arg(payload)
            .arg(ttl_secs.max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        match status {
            1 => Ok(CasOutcome::Applied),
            0 => Ok(CasOutcome::Conflict),
            other => Err(SessionStoreError::Store(format!(
                "unknown script status: {}",
                other
            ))),
        }
    }

    async fn mark_revoked(&self, sid: &SessionId) -> Result<bool, SessionStoreError> {
        let key = self.key(sid);
        let mut conn = self.conn.clone();
        let status: i64 = self
            .revoke
            .key(&key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(status == 1)
    }

    async fn delete(&self, sid: &SessionId) -> Result<(), SessionStoreError> {
        let key = self.key(sid);
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }
}
