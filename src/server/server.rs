use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::parse_expiry_secs;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::{Context, anyhow};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Owns the token service and the session store connection it runs on.
pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    session_store: Arc<dyn SessionStore>,
}

pub fn jwt_config(token: &settings::Token) -> anyhow::Result<JwtConfig> {
    let algorithm = Algorithm::from_str(&token.algorithm)
        .map_err(|e| anyhow!("unknown signing algorithm {:?}: {}", token.algorithm, e))?;
    if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
        return Err(anyhow!(
            "signing algorithm must be an HMAC algorithm, got {:?}",
            token.algorithm
        ));
    }
    if token.access_secret.is_empty() || token.refresh_secret.is_empty() {
        return Err(anyhow!("token secrets must not be empty"));
    }
    if token.access_secret == token.refresh_secret {
        return Err(anyhow!("access and refresh secrets must differ"));
    }

    Ok(JwtConfig {
        algorithm,
        access_secret: token.access_secret.clone().into_bytes(),
        access_ttl: ttl_from(&token.access_expires_in).context("token.access_expires_in")?,
        refresh_secret: token.refresh_secret.clone().into_bytes(),
        refresh_ttl: ttl_from(&token.refresh_expires_in).context("token.refresh_expires_in")?,
    })
}

// Token expiries must stay representable as timestamps for the process lifetime.
fn ttl_from(expiry: &str) -> anyhow::Result<TimeDelta> {
    let secs = parse_expiry_secs(expiry)?;
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| anyhow!("expiry {:?} is out of range", expiry))
}

impl Server {
    pub async fn try_new(
        settings: &Settings,
        identities: Arc<dyn IdentityDirectory>,
    ) -> anyhow::Result<Self> {
        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHmacCodec::new(jwt_config(&settings.token)?));

        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "memory" => Arc::new(InMemorySessionStore::new()),
            "redis" => {
                let url = settings
                    .session
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("session.redis_url is required for the redis backend"))?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session.key_prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown session backend: {}", other)),
        };

        let token_service: Arc<dyn TokenService> = Arc::new(
            RealTokenService::new(
                token_codec,
                session_store.clone(),
                identities,
                Arc::new(NanoIdGenerator::new()),
            )
            .with_store_timeout(Duration::from_millis(settings.session.timeout_ms))
            .with_revoke_on_reuse(settings.token.revoke_on_reuse),
        );

        info!(backend = %settings.session.backend, "token service started");

        Ok(Self {
            token_service,
            session_store,
        })
    }

    /// Drop the store handle. The Redis connection manager closes its
    /// connection once the last clone is gone.
    pub async fn shutdown(self) {
        info!("token service shutting down...");
        let Self {
            token_service,
            session_store,
        } = self;
        drop(token_service);
        drop(session_store);
        info!("token service stopped");
    }
}
