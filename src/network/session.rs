//! Play Session Issuance
//!
//! Spending a life and minting the credential that proves it was spent.
//! The decrement is one atomic store call; the credential is only minted
//! after the store confirms a life was actually taken.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::economy::record::PlayerId;
use crate::network::auth::{AuthError, IssuedSession, SessionSigner};
use crate::store::{LifeConsumption, PlayerStore, StoreError};

/// Outcome of a play-session request.
#[derive(Debug, Clone)]
pub enum SessionGrant {
    /// A life was spent and a credential minted.
    Granted {
        /// Lives left after this session.
        lives_remaining: u32,
        /// The signed credential.
        session: IssuedSession,
    },
    /// No lives left; nothing was spent.
    NoLivesLeft,
}

impl SessionGrant {
    /// Whether the player may start a run.
    pub fn can_play(&self) -> bool {
        matches!(self, SessionGrant::Granted { .. })
    }
}

/// Session issuance errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The atomic life consumption failed.
    #[error("failed to consume life: {0}")]
    Persistence(#[from] StoreError),

    /// The credential could not be minted.
    #[error("failed to mint session credential: {0}")]
    Credential(#[from] AuthError),
}

/// Issues play sessions against a player store.
pub struct SessionIssuer<S> {
    store: Arc<S>,
    signer: SessionSigner,
}

impl<S: PlayerStore> SessionIssuer<S> {
    /// Create an issuer.
    pub fn new(store: Arc<S>, signer: SessionSigner) -> Self {
        Self { store, signer }
    }

    /// Spend one life for `identity` and mint a credential.
    ///
    /// Store failures are returned as-is and never retried: a retried
    /// decrement could spend a second life if the first one actually landed.
    #[instrument(skip(self))]
    pub async fn start_session(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionGrant, SessionError> {
        let remaining = match self.store.consume_life(identity, display_name, now).await? {
            LifeConsumption::Consumed { remaining } => remaining,
            LifeConsumption::NoLivesLeft => {
                info!("Player {} has no lives left", identity);
                return Ok(SessionGrant::NoLivesLeft);
            }
        };

        let session = self.signer.issue(identity, display_name, now).map_err(|e| {
            error!("Life consumed for {} but credential minting failed: {}", identity, e);
            e
        })?;

        info!(
            "Session {} started for {} ({} lives left)",
            session.claims.jti, identity, remaining
        );

        Ok(SessionGrant::Granted { lives_remaining: remaining, session })
    }
}
