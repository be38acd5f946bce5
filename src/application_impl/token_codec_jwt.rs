use crate::application_port::*;
use crate::domain_model::*;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    pub access_secret: Vec<u8>,
    pub access_ttl: TimeDelta,
    pub refresh_secret: Vec<u8>,
    pub refresh_ttl: TimeDelta,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("access_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryOnly {
    exp: i64,
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
        _ => TokenError::MalformedToken,
    }
}

// The library accepts `exp == now`; a token must be strictly in its lifetime.
fn ensure_unexpired(exp: i64) -> Result<(), TokenError> {
    if exp <= Utc::now().timestamp() {
        Err(TokenError::TokenExpired)
    } else {
        Ok(())
    }
}

pub struct JwtHmacCodec {
    cfg: JwtConfig,
}

impl JwtHmacCodec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHmacCodec { cfg }
    }

    fn encode_claims<T: Serialize>(&self, claims: &T, secret: &[u8]) -> Result<String, TokenError> {
        encode(
            &Header::new(self.cfg.algorithm),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| TokenError::InternalError(e.to_string()))
    }

    fn decode_claims<T: DeserializeOwned>(
        &self,
        token: &str,
        secret: &[u8],
    ) -> Result<T, TokenError> {
        let mut v = Validation::new(self.cfg.algorithm);
        v.leeway = 0;
        v.validate_exp = true;
        let data = decode::<T>(token, &DecodingKey::from_secret(secret), &v)
            .map_err(map_decode_error)?;
        Ok(data.claims)
    }
}

impl TokenCodec for JwtHmacCodec {
    fn sign_access(&self, identity: &Identity) -> Result<AccessToken, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            id: identity.id,
            user_type: identity.role,
            user_status: identity.status,
            iat,
            exp: iat + self.cfg.access_ttl.num_seconds(),
        };
        let token = self.encode_claims(&claims, &self.cfg.access_secret)?;
        Ok(AccessToken(token))
    }

    fn sign_refresh(&self, grant: RefreshGrant) -> Result<RefreshToken, TokenError> {
        let iat = Utc::now().timestamp();
        let exp = grant
            .expires_at
            .unwrap_or(iat + self.cfg.refresh_ttl.num_seconds());
        let claims = RefreshClaims {
            id: grant.user_id,
            sid: grant.sid,
            rid: grant.rid,
            rot: grant.rot,
            iat,
            exp,
        };
        let token = self.encode_claims(&claims, &self.cfg.refresh_secret)?;
        Ok(RefreshToken(token))
    }

    fn verify_access(&self, token: &AccessToken) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode_claims(&token.0, &self.cfg.access_secret)?;
        ensure_unexpired(claims.exp)?;
        Ok(claims)
    }

    fn verify_refresh(&self, token: &RefreshToken) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode_claims(&token.0, &self.cfg.refresh_secret)?;
        ensure_unexpired(claims.exp)?;
        Ok(claims)
    }

    fn peek_expiry(&self, token: &str) -> Option<i64> {
        let mut v = Validation::new(self.cfg.algorithm);
        v.insecure_disable_signature_validation();
        v.validate_exp = false;
        v.required_spec_claims.clear();
        decode::<ExpiryOnly>(token, &DecodingKey::from_secret(&[]), &v)
            .ok()
            .map(|data| data.claims.exp)
    }
}
