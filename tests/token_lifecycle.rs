//! End-to-end behaviour of issuance, verification, rotation and revocation
//! against the in-memory session store.

use chrono::{TimeDelta, Utc};
use futures_util::future::join_all;
use jsonwebtoken::Algorithm;
use std::sync::Arc;
use tokenkeeper::application_impl::*;
use tokenkeeper::application_port::*;
use tokenkeeper::domain_model::*;
use tokenkeeper::domain_port::*;
use tokenkeeper::infra_memory::*;
use tokio::sync::Barrier;
use tokio::task::JoinSet;

fn identity() -> Identity {
    Identity {
        id: UserId(1001),
        role: UserRole::Customer,
        status: UserStatus::Active,
    }
}

fn jwt_config(refresh_ttl: TimeDelta) -> JwtConfig {
    JwtConfig {
        algorithm: Algorithm::HS256,
        access_secret: b"lifecycle-access".to_vec(),
        access_ttl: TimeDelta::minutes(15),
        refresh_secret: b"lifecycle-refresh".to_vec(),
        refresh_ttl,
    }
}

fn service_with(store: Arc<dyn SessionStore>, refresh_ttl: TimeDelta) -> RealTokenService {
    RealTokenService::new(
        Arc::new(JwtHmacCodec::new(jwt_config(refresh_ttl))),
        store,
        Arc::new(InMemoryIdentityDirectory::from_identities([identity()])),
        Arc::new(NanoIdGenerator::new()),
    )
}

fn service() -> RealTokenService {
    service_with(Arc::new(InMemorySessionStore::new()), TimeDelta::days(7))
}

/// Decode refresh claims the way a client would inspect them.
fn refresh_claims(token: &RefreshToken) -> RefreshClaims {
    JwtHmacCodec::new(jwt_config(TimeDelta::days(7)))
        .verify_refresh(token)
        .expect("refresh token should verify")
}

#[tokio::test]
async fn issued_access_token_verifies_to_the_same_identity() {
    let tokens = service();
    let pair = tokens.issue_login_tokens(&identity()).await.unwrap();

    let claims = tokens.verify_access(&pair.access_token.0).await.unwrap();
    assert_eq!(claims.id, identity().id);
    assert_eq!(claims.user_type, UserRole::Customer);
    assert_eq!(claims.user_status, UserStatus::Active);
}

#[tokio::test]
async fn rotation_invalidates_the_previous_refresh_token() {
    let tokens = service();
    let t1 = tokens.issue_login_tokens(&identity()).await.unwrap();
    let _t2 = tokens.rotate(&t1.refresh_token.0).await.unwrap();

    assert_eq!(
        tokens.rotate(&t1.refresh_token.0).await.unwrap_err(),
        TokenError::RefreshTokenReused
    );
}

#[tokio::test]
async fn rotation_keeps_sid_and_advances_rot_by_one() {
    let tokens = service();
    let t1 = tokens.issue_login_tokens(&identity()).await.unwrap();
    let t2 = tokens.rotate(&t1.refresh_token.0).await.unwrap();
    let t3 = tokens.rotate(&t2.refresh_token.0).await.unwrap();

    let c1 = refresh_claims(&t1.refresh_token);
    let c2 = refresh_claims(&t2.refresh_token);
    let c3 = refresh_claims(&t3.refresh_token);

    assert_eq!(c1.sid, c2.sid);
    assert_eq!(c2.sid, c3.sid);
    assert_eq!(c1.rot, 0);
    assert_eq!(c2.rot, c1.rot + 1);
    assert_eq!(c3.rot, c2.rot + 1);
    assert_ne!(c1.rid, c2.rid);
    assert_ne!(c2.rid, c3.rid);
    assert_eq!(t2.session_id, t1.session_id);
}

#[tokio::test]
async fn chain_of_rotations_stays_usable() {
    let tokens = service();
    let mut current = tokens.issue_login_tokens(&identity()).await.unwrap();
    for _ in 0..10 {
        current = tokens.rotate(&current.refresh_token.0).await.unwrap();
    }
    assert_eq!(refresh_claims(&current.refresh_token).rot, 10);
}

#[tokio::test]
async fn revocation_is_terminal_even_for_the_latest_token() {
    let tokens = service();
    let t1 = tokens.issue_login_tokens(&identity()).await.unwrap();
    let t2 = tokens.rotate(&t1.refresh_token.0).await.unwrap();

    tokens.revoke_session(&t1.session_id).await.unwrap();

    assert_eq!(
        tokens.rotate(&t2.refresh_token.0).await.unwrap_err(),
        TokenError::SessionRevoked
    );
    assert_eq!(
        tokens.rotate(&t1.refresh_token.0).await.unwrap_err(),
        TokenError::SessionRevoked
    );
    // Revoking twice changes nothing.
    tokens.revoke_session(&t1.session_id).await.unwrap();
    assert_eq!(
        tokens.rotate(&t2.refresh_token.0).await.unwrap_err(),
        TokenError::SessionRevoked
    );
}

#[tokio::test]
async fn revocation_only_touches_its_own_session() {
    let tokens = service();
    let laptop = tokens.issue_login_tokens(&identity()).await.unwrap();
    let phone = tokens.issue_login_tokens(&identity()).await.unwrap();
    assert_ne!(laptop.session_id, phone.session_id);

    tokens.revoke_session(&laptop.session_id).await.unwrap();
    assert!(tokens.rotate(&phone.refresh_token.0).await.is_ok());
}

#[tokio::test]
async fn zero_ttl_refresh_token_cannot_rotate() {
    let tokens = service_with(Arc::new(InMemorySessionStore::new()), TimeDelta::zero());
    let pair = tokens.issue_login_tokens(&identity()).await.unwrap();

    assert_eq!(
        tokens.rotate(&pair.refresh_token.0).await.unwrap_err(),
        TokenError::TokenExpired
    );
}

#[tokio::test]
async fn negative_ttl_refresh_token_cannot_rotate() {
    let tokens = service_with(Arc::new(InMemorySessionStore::new()), TimeDelta::seconds(-30));
    let pair = tokens.issue_login_tokens(&identity()).await.unwrap();
    assert!(pair.refresh_token_expires_at < Utc::now());

    assert_eq!(
        tokens.rotate(&pair.refresh_token.0).await.unwrap_err(),
        TokenError::TokenExpired
    );
}

#[tokio::test]
async fn garbage_and_foreign_tokens_are_rejected_without_touching_the_store() {
    let tokens = service();
    assert_eq!(
        tokens.rotate("definitely.not.a-jwt").await.unwrap_err(),
        TokenError::MalformedToken
    );

    let pair = tokens.issue_login_tokens(&identity()).await.unwrap();
    // An access token is signed with the other secret.
    assert_eq!(
        tokens.rotate(&pair.access_token.0).await.unwrap_err(),
        TokenError::SignatureInvalid
    );
    assert!(tokens.rotate(&pair.refresh_token.0).await.is_ok());
}

#[test]
fn duration_parser_accepts_common_forms() {
    assert_eq!(parse_expiry_secs("15m"), Ok(900));
    assert_eq!(parse_expiry_secs("7 Days"), Ok(604_800));
    assert_eq!(parse_expiry_secs("60"), Ok(60));
    assert!(matches!(
        parse_expiry_secs("abc"),
        Err(ExpiryError::InvalidDurationFormat(_))
    ));
    assert!(matches!(
        parse_expiry_secs("10xyz"),
        Err(ExpiryError::UnsupportedUnit(_))
    ));
}

/// Forces every caller to finish its read before any of them may write, which
/// is the interleaving an unconditional overwrite gets wrong.
struct ReadBarrierStore {
    inner: InMemorySessionStore,
    barrier: Barrier,
}

#[async_trait::async_trait]
impl SessionStore for ReadBarrierStore {
    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, SessionStoreError> {
        let record = self.inner.get(sid).await;
        self.barrier.wait().await;
        record
    }

    async fn set_with_ttl(
        &self,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        self.inner.set_with_ttl(record, ttl_secs).await
    }

    async fn compare_and_set(
        &self,
        expected: &RefreshTokenId,
        record: &SessionRecord,
        ttl_secs: u64,
    ) -> Result<CasOutcome, SessionStoreError> {
        self.inner.compare_and_set(expected, record, ttl_secs).await
    }

    async fn mark_revoked(&self, sid: &SessionId) -> Result<bool, SessionStoreError> {
        self.inner.mark_revoked(sid).await
    }

    async fn delete(&self, sid: &SessionId) -> Result<(), SessionStoreError> {
        self.inner.delete(sid).await
    }
}

#[tokio::test]
async fn interleaved_rotations_of_one_token_have_exactly_one_winner() {
    let store = Arc::new(ReadBarrierStore {
        inner: InMemorySessionStore::new(),
        barrier: Barrier::new(2),
    });
    let tokens = service_with(store, TimeDelta::days(7));
    let t1 = tokens.issue_login_tokens(&identity()).await.unwrap();

    let (a, b) = tokio::join!(
        tokens.rotate(&t1.refresh_token.0),
        tokens.rotate(&t1.refresh_token.0)
    );

    let results = [a, b];
    let winners: Vec<&TokenPair> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<&TokenError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(winners.len(), 1, "{results:?}");
    assert_eq!(losers, vec![&TokenError::RefreshTokenReused]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_rotations_across_threads_have_exactly_one_winner() {
    const CONCURRENCY: usize = 16;

    let tokens = Arc::new(service());
    for _ in 0..20 {
        let t1 = tokens.issue_login_tokens(&identity()).await.unwrap();

        let mut set = JoinSet::new();
        for _ in 0..CONCURRENCY {
            let tokens = tokens.clone();
            let presented = t1.refresh_token.0.clone();
            set.spawn(async move { tokens.rotate(&presented).await });
        }

        let mut successes = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined.expect("task should not panic") {
                Ok(pair) => successes.push(pair),
                Err(e) => assert_eq!(e, TokenError::RefreshTokenReused),
            }
        }
        assert_eq!(successes.len(), 1);

        // The winner's token is the one that keeps the session alive.
        let winner = successes.pop().unwrap();
        assert!(tokens.rotate(&winner.refresh_token.0).await.is_ok());
    }
}

#[tokio::test]
async fn many_sessions_rotate_independently() {
    let tokens = service();
    let who = identity();
    let logins = join_all((0..8).map(|_| tokens.issue_login_tokens(&who))).await;
    let rotations = join_all(
        logins
            .iter()
            .map(|pair| tokens.rotate(&pair.as_ref().unwrap().refresh_token.0)),
    )
    .await;
    assert!(rotations.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn stateless_access_survives_revocation_until_it_expires() {
    let tokens = service();
    let pair = tokens.issue_login_tokens(&identity()).await.unwrap();
    tokens.revoke_session(&pair.session_id).await.unwrap();

    let claims = tokens.verify_access(&pair.access_token.0).await.unwrap();
    assert_eq!(claims.id, identity().id);
    assert!(claims.exp > Utc::now().timestamp());
}
