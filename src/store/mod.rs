//! Player Record Store
//!
//! The persistence collaborator the core talks to. Everything that has to
//! be race-free under concurrent requests for the same player lives here as
//! a single store-side operation:
//!
//! - `create_player` inserts only if absent and never overwrites a row
//! - `apply_regeneration` writes only if the row is still the one that was read
//! - `consume_life` credits accrued regeneration, then decrements only while
//!   the balance is positive
//! - `keep_max_score` replaces the best score only with a strictly greater one
//!
//! Callers never read-then-write across two round trips for these.
//!
//! The store handle is constructed once at process start and shared by
//! every request through an `Arc`.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::economy::record::{PlayerId, PlayerRecord};

pub use memory::MemoryStore;

/// Outcome of an atomic life consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeConsumption {
    /// One life was taken; this many remain.
    Consumed {
        /// Balance after the decrement.
        remaining: u32,
    },
    /// The balance was already zero. Nothing was written.
    NoLivesLeft,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Display name, if the player ever sent one.
    pub username: Option<String>,
    /// Best score.
    pub high_score: u64,
}

/// A single player's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// 1-based competition rank.
    pub rank: u64,
    /// Best score.
    pub score: u64,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The service rejected or failed an operation.
    #[error("store operation `{operation}` failed: {reason}")]
    OperationFailed {
        /// Operation name.
        operation: &'static str,
        /// Failure reason.
        reason: String,
    },
}

/// Persistence operations required by the core.
///
/// Implementations must be shareable across tokio tasks.
pub trait PlayerStore: Send + Sync + 'static {
    /// Fetch a record, or `None` if the player has never been seen.
    fn get_player(
        &self,
        identity: &PlayerId,
    ) -> impl Future<Output = Result<Option<PlayerRecord>, StoreError>> + Send;

    /// Idempotent upsert of the lives columns keyed by identity.
    ///
    /// The best score of an existing record is preserved and the stored
    /// regeneration timestamp never moves backwards.
    fn upsert_player(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        lives_balance: u32,
        last_regen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a record at full lives unless one exists.
    ///
    /// Returns the stored record: the new one, or the existing one untouched.
    fn create_player(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<PlayerRecord, StoreError>> + Send;

    /// Compare-and-swap of the lives columns.
    ///
    /// Writes `new_balance` and moves the regeneration clock to `now` only if
    /// the stored balance and clock still equal the expected values. Returns
    /// whether the write happened.
    fn apply_regeneration(
        &self,
        identity: &PlayerId,
        expected_balance: u32,
        expected_last_regen_at: DateTime<Utc>,
        new_balance: u32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically take one life, creating the record at full lives if absent.
    ///
    /// Regeneration accrued since the stored clock is credited first, and the
    /// clock moves to `now` with the decrement.
    fn consume_life(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<LifeConsumption, StoreError>> + Send;

    /// Atomically raise the best score to `score` if it is strictly greater.
    fn keep_max_score(
        &self,
        identity: &PlayerId,
        score: u64,
        display_name: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Top `limit` players by best score, descending.
    fn top_scores(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, StoreError>> + Send;

    /// Rank of one player, or `None` if unknown.
    fn rank(
        &self,
        identity: &PlayerId,
    ) -> impl Future<Output = Result<Option<RankEntry>, StoreError>> + Send;
}
