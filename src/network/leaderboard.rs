//! Leaderboard and rank reads. No invariants beyond ordering.

use crate::economy::record::PlayerId;
use crate::store::{LeaderboardEntry, PlayerStore, RankEntry, StoreError};

/// Rows returned by the public leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Top players by best score, descending.
pub async fn top_scores<S: PlayerStore>(
    store: &S,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>, StoreError> {
    store.top_scores(limit).await
}

/// Rank of one player; `None` if the player has no record.
pub async fn player_rank<S: PlayerStore>(
    store: &S,
    identity: &PlayerId,
) -> Result<Option<RankEntry>, StoreError> {
    store.rank(identity).await
}
