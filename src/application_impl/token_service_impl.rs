use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RealTokenService {
    codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    identities: Arc<dyn IdentityDirectory>,
    ids: Arc<dyn IdGenerator>,
    store_timeout: Duration,
    revoke_on_reuse: bool,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        identities: Arc<dyn IdentityDirectory>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            codec,
            session_store,
            identities,
            ids,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            revoke_on_reuse: false,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Also revoke the session whenever a superseded refresh token is
    /// presented. Benign double submits then force a full sign-in.
    pub fn with_revoke_on_reuse(mut self, enabled: bool) -> Self {
        self.revoke_on_reuse = enabled;
        self
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, TokenError>
    where
        F: Future<Output = Result<T, SessionStoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(TokenError::from),
            Err(_) => Err(SessionStoreError::Timeout(self.store_timeout).into()),
        }
    }

    fn expiry_of(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        let exp = self
            .codec
            .peek_expiry(token)
            .ok_or_else(|| TokenError::InternalError("signed token has no expiry".to_string()))?;
        DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::InternalError(format!("expiry out of range: {}", exp)))
    }

    /// Sign a fresh pair and build the session record that makes the new
    /// refresh token the only rotatable one.
    fn mint(
        &self,
        identity: &Identity,
        grant: RefreshGrant,
    ) -> Result<(TokenPair, SessionRecord), TokenError> {
        let session_id = grant.sid.clone();
        let refresh_token_id = grant.rid.clone();

        let access_token = self.codec.sign_access(identity)?;
        let refresh_token = self.codec.sign_refresh(grant)?;
        let access_token_expires_at = self.expiry_of(&access_token.0)?;
        let refresh_token_expires_at = self.expiry_of(&refresh_token.0)?;

        let record = SessionRecord {
            session_id: session_id.clone(),
            refresh_token_id,
            user_id: identity.id,
            revoked: false,
            expires_at: refresh_token_expires_at.timestamp(),
        };
        let pair = TokenPair {
            session_id,
            access_token,
            refresh_token,
            access_token_expires_at,
            refresh_token_expires_at,
        };
        Ok((pair, record))
    }

    async fn current_identity(&self, id: UserId) -> Result<Identity, TokenError> {
        let identity = self
            .identities
            .get_identity(id)
            .await?
            .ok_or(TokenError::IdentityNotFound)?;
        if !identity.status.is_active() {
            return Err(TokenError::IdentityInactive);
        }
        Ok(identity)
    }

    /// Load the record a refresh token points at. Records that are gone, stale,
    /// or owned by someone else all read as "no session".
    async fn load_session(&self, presented: &RefreshClaims) -> Result<SessionRecord, TokenError> {
        let record = self
            .bounded(self.session_store.get(&presented.sid))
            .await?
            .ok_or(TokenError::SessionNotFound)?;
        if record.user_id != presented.id || record.is_expired_at(Utc::now()) {
            return Err(TokenError::SessionNotFound);
        }
        Ok(record)
    }

    async fn mark_revoked(&self, sid: &SessionId) -> Result<(), TokenError> {
        if self.bounded(self.session_store.mark_revoked(sid)).await? {
            info!(sid = %sid, "session revoked");
        } else {
            debug!(sid = %sid, "revoke requested for unknown session");
        }
        Ok(())
    }

    async fn reject_reuse(&self, record: &SessionRecord, presented: &RefreshClaims) -> TokenError {
        warn!(
            sid = %record.session_id,
            user_id = %record.user_id,
            presented_rot = presented.rot,
            "superseded refresh token presented"
        );
        if self.revoke_on_reuse {
            if let Err(e) = self.mark_revoked(&record.session_id).await {
                error!(sid = %record.session_id, "failed to revoke session after reuse: {}", e);
            }
        }
        TokenError::RefreshTokenReused
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_login_tokens(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        if !identity.status.is_active() {
            return Err(TokenError::IdentityInactive);
        }

        let grant = RefreshGrant {
            user_id: identity.id,
            sid: SessionId(self.ids.next_id()),
            rid: RefreshTokenId(self.ids.next_id()),
            rot: 0,
            expires_at: None,
        };
        let (pair, record) = self.mint(identity, grant)?;

        self.bounded(self.session_store.set_with_ttl(&record, record.ttl_secs()))
            .await?;

        debug!(sid = %record.session_id, user_id = %identity.id, "login tokens issued");
        Ok(pair)
    }

    async fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.codec.verify_access(&AccessToken(token.to_string()))
    }

    async fn authorize(&self, token: &str, roles: &[UserRole]) -> Result<AccessClaims, TokenError> {
        let claims = self.verify_access(token).await?;
        if !claims.has_any_role(roles) {
            debug!(user_id = %claims.id, role = %claims.user_type, "role not permitted");
            return Err(TokenError::Forbidden);
        }
        Ok(claims)
    }

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let presented = self
            .codec
            .verify_refresh(&RefreshToken(refresh_token.to_string()))?;

        let record = self.load_session(&presented).await?;
        if record.revoked {
            warn!(sid = %record.session_id, user_id = %record.user_id, "rotation attempted on revoked session");
            return Err(TokenError::SessionRevoked);
        }
        if record.refresh_token_id != presented.rid {
            return Err(self.reject_reuse(&record, &presented).await);
        }

        // Role and status come from the directory, not from the old token.
        let identity = self.current_identity(presented.id).await?;

        let grant = RefreshGrant {
            user_id: identity.id,
            sid: presented.sid.clone(),
            rid: RefreshTokenId(self.ids.next_id()),
            rot: presented.rot.saturating_add(1),
            expires_at: Some(presented.exp),
        };
        let (pair, next) = self.mint(&identity, grant)?;

        let outcome = self
            .bounded(self.session_store.compare_and_set(
                &record.refresh_token_id,
                &next,
                next.ttl_secs(),
            ))
            .await?;
        match outcome {
            CasOutcome::Applied => {
                debug!(
                    sid = %next.session_id,
                    rot = presented.rot.saturating_add(1),
                    "refresh token rotated"
                );
                Ok(pair)
            }
            CasOutcome::Conflict => Err(self.reject_reuse(&record, &presented).await),
        }
    }

    async fn revoke_session(&self, sid: &SessionId) -> Result<(), TokenError> {
        self.mark_revoked(sid).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), TokenError> {
        let presented = self
            .codec
            .verify_refresh(&RefreshToken(refresh_token.to_string()))?;

        let record = match self.load_session(&presented).await {
            Ok(record) => record,
            Err(TokenError::SessionNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        if !record.revoked && record.refresh_token_id != presented.rid {
            return Err(self.reject_reuse(&record, &presented).await);
        }

        self.bounded(self.session_store.delete(&presented.sid)).await?;
        info!(sid = %presented.sid, user_id = %presented.id, "session logged out");
        Ok(())
    }
}
