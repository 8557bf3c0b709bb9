//! Player Records
//!
//! The durable per-player row: lives balance, regeneration clock, best score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::MAX_LIVES;

/// Opaque player identity (the client's `fid`).
///
/// Clients send it either as a JSON string or a JSON integer; both
/// normalise to the same textual identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPlayerId")]
pub struct PlayerId(String);

impl PlayerId {
    /// Parse an identity from text. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire shapes accepted for a player identity.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlayerId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawPlayerId> for PlayerId {
    type Error = String;

    fn try_from(raw: RawPlayerId) -> Result<Self, Self::Error> {
        match raw {
            RawPlayerId::Number(n) => Ok(Self(n.to_string())),
            RawPlayerId::Text(s) => {
                PlayerId::parse(&s).ok_or_else(|| "player id must not be blank".to_string())
            }
        }
    }
}

/// One row of the player record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Primary key.
    pub identity: PlayerId,
    /// Best-effort label, last write wins.
    pub display_name: Option<String>,
    /// Remaining lives, always within `[0, MAX_LIVES]`.
    pub lives_balance: u32,
    /// Last time lives were topped up or consumed.
    pub last_regen_at: DateTime<Utc>,
    /// Highest accepted score. Never decreases.
    pub best_score: u64,
}

impl PlayerRecord {
    /// A record as created on first contact: full lives, clock starting now.
    pub fn fresh(identity: PlayerId, display_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            display_name,
            lives_balance: MAX_LIVES,
            last_regen_at: now,
            best_score: 0,
        }
    }

    /// Overwrite the display name if a non-blank one is supplied.
    pub fn touch_display_name(&mut self, display_name: Option<&str>) {
        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            self.display_name = Some(name.to_string());
        }
    }
}
