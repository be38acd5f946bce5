use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

struct Entry {
    record: SessionRecord,
    deadline: Instant,
}

/// Process-local [`SessionStore`] with per-entry expiry.
///
/// Compare-and-set holds the shard write lock for the check and the write, so
/// it gives the same per-session ordering as the Redis script.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: DashMap<SessionId, Entry>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn entry(record: &SessionRecord, ttl_secs: u64) -> Entry {
        Entry {
            record: record.clone(),
            deadline: Instant::now() + Duration::from_secs(ttl_secs),
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, SessionStoreError> {
        let now = Instant::now();
        let live = match self.entries.get(sid) {
            Some(entry) if entry.deadline > now => Some(entry.record.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if live.is_none() {
            self.entries.remove_if(sid, |_, entry| entry.deadline <= now);
        }
        Ok(live)
    }

    async fn set_with_ttl(
        &self,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        self.entries
            .insert(record.session_id.clone(), Self::entry(record, ttl_secs));
        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected: &RefreshTokenId,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<CasOutcome, SessionStoreError> {
        let now = Instant::now();
        match self.entries.get_mut(&record.session_id) {
            Some(mut current)
                if current.deadline > now
                    && !current.record.revoked
                    && current.record.refresh_token_id == *expected =>
            {
                *current = Self::entry(record, ttl_secs);
                Ok(CasOutcome::Applied)
            }
            _ => Ok(CasOutcome::Conflict),
        }
    }

    async fn mark_revoked(&self, sid: &SessionId) -> Result<bool, SessionStoreError> {
        let now = Instant::now();
        match self.entries.get_mut(sid) {
            Some(mut current) if current.deadline > now => {
                current.record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, sid: &SessionId) -> Result<(), SessionStoreError> {
        self.entries.remove(sid);
        Ok(())
    }
}
