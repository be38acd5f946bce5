use crate::domain_model::*;
use crate::domain_port::SessionStoreError;
use serde::Serialize;
use crate::logger::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    MalformedToken,
    #[error("token signature invalid")]
    SignatureInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("session not found")]
    SessionNotFound,
    #[error("session revoked")]
    SessionRevoked,
    #[error("refresh token reused")]
    RefreshTokenReused,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("identity not found")]
    IdentityNotFound,
    #[error("identity is not active")]
    IdentityInactive,
    #[error("role not permitted")]
    Forbidden,
    #[error("internal error: {0}")]
    InternalError(String),
}

impl TokenError {
    /// Only a store outage is worth retrying, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenError::StoreUnavailable(_))
    }

    pub fn code(&self) -> TokenErrorCode {
        TokenErrorCode::from(self)
    }
}

impl From<SessionStoreError> for TokenError {
    fn from(error: SessionStoreError) -> Self {
        TokenError::StoreUnavailable(error.to_string())
    }
}

/// Caller-visible outcome of a failed token operation.
///
/// Several internal errors collapse into [`TokenErrorCode::SignInRequired`] so
/// an end user cannot tell which detection fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum TokenErrorCode {
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token expired: token rotation required")]
    TokenExpired,
    #[error("Session ended, please sign in again")]
    SignInRequired,
    #[error("Account is not available")]
    AccountUnavailable,
    #[error("Access denied: User does not have the required permissions")]
    Forbidden,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl From<&TokenError> for TokenErrorCode {
    fn from(error: &TokenError) -> Self {
        match error {
            TokenError::MalformedToken | TokenError::SignatureInvalid => {
                TokenErrorCode::InvalidToken
            }
            TokenError::TokenExpired => TokenErrorCode::TokenExpired,
            TokenError::SessionNotFound
            | TokenError::SessionRevoked
            | TokenError::RefreshTokenReused => TokenErrorCode::SignInRequired,
            TokenError::IdentityNotFound | TokenError::IdentityInactive => {
                TokenErrorCode::AccountUnavailable
            }
            TokenError::Forbidden => TokenErrorCode::Forbidden,
            TokenError::StoreUnavailable(e) => {
                warn!("session store unavailable: {}", e);
                TokenErrorCode::ServiceUnavailable
            }
            TokenError::InternalError(e) => {
                warn!("Internal error: {}", e);
                TokenErrorCode::InternalError
            }
        }
    }
}

/// Signs and verifies access and refresh tokens.
///
/// Access and refresh tokens are signed with different secrets, so a token of
/// one kind never verifies as the other.
pub trait TokenCodec: Send + Sync {
    fn sign_access(&self, identity: &Identity) -> Result<AccessToken, TokenError>;
    fn sign_refresh(&self, grant: RefreshGrant) -> Result<RefreshToken, TokenError>;
    fn verify_access(&self, token: &AccessToken) -> Result<AccessClaims, TokenError>;
    fn verify_refresh(&self, token: &RefreshToken) -> Result<RefreshClaims, TokenError>;
    /// Reads `exp` without checking the signature. Only for TTL bookkeeping.
    fn peek_expiry(&self, token: &str) -> Option<i64>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue_login_tokens(&self, identity: &Identity) -> Result<TokenPair, TokenError>;
    /// Stateless: a revoked session's access tokens stay valid until they
    /// expire, so revocation lags by at most the access-token TTL.
    async fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError>;
    async fn authorize(&self, token: &str, roles: &[UserRole]) -> Result<AccessClaims, TokenError>;
    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;
    async fn revoke_session(&self, sid: &SessionId) -> Result<(), TokenError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), TokenError>;
}
