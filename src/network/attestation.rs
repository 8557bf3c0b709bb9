//! Score Attestation
//!
//! Decides whether a submitted score may be recorded. Four gates run in
//! order and the first failure ends the request:
//!
//! 1. A bearer credential is present and well formed
//! 2. The attestation digest binds this exact score to this exact token
//! 3. The credential verifies and has not expired
//! 4. The score is reachable in the time since the credential was issued
//!
//! Only then is the score handed to the store's keep-maximum update.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::hash::{attestation_signature, digests_match};
use crate::economy::record::PlayerId;
use crate::network::auth::{bearer_token, AuthError, SessionSigner};
use crate::store::{PlayerStore, StoreError};

/// Default maximum scoring rate (points per second).
pub const DEFAULT_MAX_SCORE_RATE: u64 = 20;

/// Default flat allowance added to the time-based bound.
pub const DEFAULT_SCORE_TOLERANCE: u64 = 500;

/// Plausibility bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    /// Points per second a legitimate run can earn at most.
    pub max_score_rate: u64,
    /// Flat allowance on top of the rate bound.
    pub tolerance: u64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            max_score_rate: DEFAULT_MAX_SCORE_RATE,
            tolerance: DEFAULT_SCORE_TOLERANCE,
        }
    }
}

impl ScorePolicy {
    /// Create policy from environment variables.
    pub fn from_env() -> Self {
        let parse = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };
        Self {
            max_score_rate: parse("MAX_SCORE_RATE", DEFAULT_MAX_SCORE_RATE),
            tolerance: parse("SCORE_TOLERANCE", DEFAULT_SCORE_TOLERANCE),
        }
    }

    /// Highest score accepted for a session that has run `session_secs` seconds.
    pub fn max_plausible_score(&self, session_secs: u64) -> u64 {
        session_secs
            .saturating_mul(self.max_score_rate)
            .saturating_add(self.tolerance)
    }
}

/// A score that passed every gate and was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedScore {
    /// Player the score was recorded for.
    pub identity: PlayerId,
    /// The submitted score.
    pub score: u64,
    /// Session the score was earned in.
    pub session_id: String,
}

/// Attestation failures, one per gate plus the final write.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Bearer credential absent or malformed.
    #[error("missing or malformed session token: {0}")]
    MissingCredential(AuthError),

    /// Digest does not bind the score to the token.
    #[error("score signature mismatch")]
    SignatureMismatch,

    /// Credential failed verification or expired.
    #[error("invalid session: {0}")]
    InvalidSession(AuthError),

    /// Score exceeds what the session's duration allows.
    #[error("implausible score {score} (max {max_allowed} after {session_secs}s)")]
    ImplausibleScore {
        /// Submitted score.
        score: u64,
        /// Bound for this session.
        max_allowed: u64,
        /// Seconds since issuance.
        session_secs: u64,
    },

    /// Keep-maximum update failed.
    #[error("failed to record score: {0}")]
    Persistence(#[from] StoreError),
}

/// Verifies and records score submissions.
pub struct ScoreVerifier<S> {
    store: Arc<S>,
    signer: SessionSigner,
    policy: ScorePolicy,
}

impl<S: PlayerStore> ScoreVerifier<S> {
    /// Create a verifier.
    pub fn new(store: Arc<S>, signer: SessionSigner, policy: ScorePolicy) -> Self {
        Self { store, signer, policy }
    }

    /// Run the gates for one submission and record the score if all pass.
    ///
    /// `authorization` is the raw `Authorization` header value.
    #[instrument(skip(self, authorization, signature))]
    pub async fn submit(
        &self,
        authorization: Option<&str>,
        score: u64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptedScore, AttestationError> {
        let token = bearer_token(authorization).map_err(AttestationError::MissingCredential)?;

        let expected = attestation_signature(score, token);
        if !digests_match(expected.as_bytes(), signature.trim().as_bytes()) {
            warn!("Score signature mismatch for submitted score {}", score);
            return Err(AttestationError::SignatureMismatch);
        }

        let claims = self
            .signer
            .verify(token, now)
            .map_err(AttestationError::InvalidSession)?;
        let identity = claims.player_id().map_err(AttestationError::InvalidSession)?;
        let issued_at = claims.issued_at().map_err(AttestationError::InvalidSession)?;

        let session_secs = (now - issued_at).num_seconds().max(0) as u64;
        let max_allowed = self.policy.max_plausible_score(session_secs);
        if score > max_allowed {
            warn!(
                "Implausible score {} from {} (max {} after {}s)",
                score, identity, max_allowed, session_secs
            );
            return Err(AttestationError::ImplausibleScore { score, max_allowed, session_secs });
        }

        debug!("Score {} from {} passed attestation", score, identity);
        self.store
            .keep_max_score(&identity, score, claims.username.as_deref())
            .await?;

        info!("Recorded score {} for {} (session {})", score, identity, claims.jti);

        Ok(AcceptedScore { identity, score, session_id: claims.jti })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::auth::AuthConfig;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn pid(s: &str) -> PlayerId {
        PlayerId::parse(s).unwrap()
    }

    fn test_signer() -> SessionSigner {
        SessionSigner::new(&AuthConfig {
            secret: Some("test-secret-key-256-bits-long!!".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn create_test_verifier() -> (Arc<MemoryStore>, ScoreVerifier<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let verifier = ScoreVerifier::new(store.clone(), test_signer(), ScorePolicy::default());
        (store, verifier)
    }

    fn token_issued_at(at: DateTime<Utc>) -> String {
        test_signer().issue(&pid("1"), Some("alice"), at).unwrap().token
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_plausibility_bound() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.max_plausible_score(0), 500);
        assert_eq!(policy.max_plausible_score(3), 560);
        assert_eq!(policy.max_plausible_score(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_valid_submission_recorded() {
        let (store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now - Duration::seconds(3));
        let sig = attestation_signature(100, &token);

        let accepted = verifier.submit(Some(&bearer(&token)), 100, &sig, now).await.unwrap();
        assert_eq!(accepted.identity, pid("1"));
        assert_eq!(accepted.score, 100);

        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.best_score, 100);
        assert_eq!(record.display_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_bearer_rejected() {
        let (_store, verifier) = create_test_verifier();
        let result = verifier.submit(None, 100, "deadbeef", Utc::now()).await;
        assert!(matches!(
            result,
            Err(AttestationError::MissingCredential(AuthError::MissingToken))
        ));

        let result = verifier.submit(Some("Token abc"), 100, "deadbeef", Utc::now()).await;
        assert!(matches!(
            result,
            Err(AttestationError::MissingCredential(AuthError::InvalidFormat))
        ));
    }

    #[tokio::test]
    async fn test_signature_over_other_score_rejected() {
        let (store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now - Duration::seconds(10));
        let sig_for_50 = attestation_signature(50, &token);

        let result = verifier.submit(Some(&bearer(&token)), 200, &sig_for_50, now).await;
        assert!(matches!(result, Err(AttestationError::SignatureMismatch)));
        assert!(store.get_player(&pid("1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signature_for_other_token_rejected() {
        let (_store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now);
        let other = token_issued_at(now);
        let sig = attestation_signature(10, &other);

        let result = verifier.submit(Some(&bearer(&token)), 10, &sig, now).await;
        assert!(matches!(result, Err(AttestationError::SignatureMismatch)));
    }

    #[tokio::test]
    async fn test_expired_session_rejected_even_with_correct_signature() {
        let (_store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now - Duration::minutes(6));
        let sig = attestation_signature(100, &token);

        let result = verifier.submit(Some(&bearer(&token)), 100, &sig, now).await;
        assert!(matches!(result, Err(AttestationError::InvalidSession(AuthError::Expired))));
    }

    #[tokio::test]
    async fn test_forged_token_rejected() {
        let (_store, verifier) = create_test_verifier();
        let now = Utc::now();
        let forged = SessionSigner::new(&AuthConfig {
            secret: Some("attacker-controlled-secret!!!!".into()),
            ..Default::default()
        })
        .unwrap()
        .issue(&pid("1"), None, now)
        .unwrap()
        .token;
        let sig = attestation_signature(10, &forged);

        let result = verifier.submit(Some(&bearer(&forged)), 10, &sig, now).await;
        assert!(matches!(
            result,
            Err(AttestationError::InvalidSession(AuthError::InvalidSignature))
        ));
    }

    #[tokio::test]
    async fn test_score_above_bound_rejected_and_at_bound_accepted() {
        let (store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now - Duration::seconds(10));
        let bound = 10 * DEFAULT_MAX_SCORE_RATE + DEFAULT_SCORE_TOLERANCE;

        let over = bound + 1;
        let result = verifier
            .submit(Some(&bearer(&token)), over, &attestation_signature(over, &token), now)
            .await;
        assert!(matches!(
            result,
            Err(AttestationError::ImplausibleScore { max_allowed, session_secs: 10, .. })
                if max_allowed == bound
        ));

        verifier
            .submit(Some(&bearer(&token)), bound, &attestation_signature(bound, &token), now)
            .await
            .unwrap();
        assert_eq!(store.get_player(&pid("1")).await.unwrap().unwrap().best_score, bound);
    }

    #[tokio::test]
    async fn test_lower_score_accepted_but_best_kept() {
        let (store, verifier) = create_test_verifier();
        let now = Utc::now();
        let token = token_issued_at(now - Duration::seconds(30));

        verifier
            .submit(Some(&bearer(&token)), 900, &attestation_signature(900, &token), now)
            .await
            .unwrap();
        verifier
            .submit(Some(&bearer(&token)), 200, &attestation_signature(200, &token), now)
            .await
            .unwrap();

        assert_eq!(store.get_player(&pid("1")).await.unwrap().unwrap().best_score, 900);
    }
}
