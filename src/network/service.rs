//! Play Pass Service
//!
//! One value per process tying the store handle, the session issuer and the
//! score verifier together. Request handlers borrow it through an `Arc`;
//! nothing in it is mutated after construction.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::economy::lives::refresh_lives;
use crate::economy::record::PlayerId;
use crate::network::attestation::{ScorePolicy, ScoreVerifier};
use crate::network::auth::{AuthConfig, AuthError, SessionSigner};
use crate::network::error::ApiError;
use crate::network::leaderboard::{player_rank, top_scores, LEADERBOARD_SIZE};
use crate::network::protocol::{
    PlaySessionRequest, PlaySessionResponse, SubmitScoreRequest, SubmitScoreResponse,
    UserStatusResponse,
};
use crate::network::session::{SessionGrant, SessionIssuer};
use crate::store::{LeaderboardEntry, PlayerStore, RankEntry};

/// The lives / session / score service.
pub struct PlayPassService<S> {
    store: Arc<S>,
    issuer: SessionIssuer<S>,
    verifier: ScoreVerifier<S>,
}

impl<S: PlayerStore> PlayPassService<S> {
    /// Build the service. Fails if no signing secret is configured.
    pub fn new(store: Arc<S>, auth: &AuthConfig, policy: ScorePolicy) -> Result<Self, AuthError> {
        let signer = SessionSigner::new(auth)?;
        Ok(Self {
            issuer: SessionIssuer::new(store.clone(), signer.clone()),
            verifier: ScoreVerifier::new(store.clone(), signer, policy),
            store,
        })
    }

    /// Current lives, regenerating and lazily creating the record.
    #[instrument(skip(self))]
    pub async fn user_status(
        &self,
        identity: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<UserStatusResponse, ApiError> {
        let identity = require_fid(identity)?;
        let play_lives = refresh_lives(self.store.as_ref(), &identity, now)
            .await
            .map_err(|e| ApiError::persistence("Failed to fetch user status", e))?;
        Ok(UserStatusResponse { play_lives })
    }

    /// Spend a life and hand out a session credential.
    #[instrument(skip(self, request))]
    pub async fn play_session(
        &self,
        request: PlaySessionRequest,
        now: DateTime<Utc>,
    ) -> Result<PlaySessionResponse, ApiError> {
        let identity = require_fid(request.fid)?;
        let display_name = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let response = match self.issuer.start_session(&identity, display_name, now).await? {
            SessionGrant::Granted { lives_remaining, session } => {
                PlaySessionResponse::granted(lives_remaining, session.token)
            }
            SessionGrant::NoLivesLeft => PlaySessionResponse::out_of_lives(),
        };
        Ok(response)
    }

    /// Verify and record a score.
    #[instrument(skip(self, authorization, request))]
    pub async fn submit_score(
        &self,
        authorization: Option<&str>,
        request: SubmitScoreRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmitScoreResponse, ApiError> {
        let score = request
            .score
            .ok_or_else(|| ApiError::Validation("score is required".into()))?;
        let signature = request
            .signature
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("signature is required".into()))?;

        self.verifier.submit(authorization, score, &signature, now).await?;
        Ok(SubmitScoreResponse { success: true })
    }

    /// Public leaderboard.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        top_scores(self.store.as_ref(), LEADERBOARD_SIZE)
            .await
            .map_err(|e| ApiError::persistence("Failed to fetch leaderboard", e))
    }

    /// One player's rank.
    #[instrument(skip(self))]
    pub async fn user_rank(&self, identity: Option<PlayerId>) -> Result<RankEntry, ApiError> {
        let identity = require_fid(identity)?;
        player_rank(self.store.as_ref(), &identity)
            .await
            .map_err(|e| ApiError::persistence("Failed to fetch user rank", e))?
            .ok_or_else(|| ApiError::NotFound("Player not found".into()))
    }
}

fn require_fid(identity: Option<PlayerId>) -> Result<PlayerId, ApiError> {
    identity.ok_or_else(|| ApiError::Validation("FID is required".into()))
}

// =============================================================================
// TESTS
// =============================================================================
