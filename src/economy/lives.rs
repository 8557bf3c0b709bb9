//! Lives Regeneration
//!
//! One life comes back per `REGEN_HOURS` since the record's regeneration
//! clock, capped at `MAX_LIVES`. Regeneration is always derived from the
//! stored timestamp, so repeated reads inside the same hour never credit
//! twice.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::record::{PlayerId, PlayerRecord};
use super::{MAX_LIVES, REGEN_HOURS};
use crate::store::{PlayerStore, StoreError};

/// Result of applying regeneration to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regeneration {
    /// Balance after regeneration.
    pub balance: u32,
    /// Whether the balance went up (and the record must be written).
    pub changed: bool,
}

/// Whole hours between two instants. Negative spans (clock skew) count as zero.
pub fn hours_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - since).num_hours().max(0) as u64
}

/// Compute the regenerated balance of a record at `now`. Pure.
pub fn regenerate(record: &PlayerRecord, now: DateTime<Utc>) -> Regeneration {
    let stored = record.lives_balance.min(MAX_LIVES);
    let lives_to_add = hours_elapsed(record.last_regen_at, now) / REGEN_HOURS;
    let balance = (stored as u64 + lives_to_add).min(MAX_LIVES as u64) as u32;

    Regeneration {
        balance,
        changed: balance > record.lives_balance,
    }
}

/// Conditional regeneration writes attempted before reporting without one.
const REGEN_WRITE_ATTEMPTS: usize = 3;

/// Report a player's current lives, persisting any regeneration.
///
/// Unknown players are created at full lives unless a concurrent request
/// created them first. The regeneration write only lands if the record is
/// unchanged since it was read; otherwise the record is re-read and
/// regeneration recomputed from it. A failed write is logged and the computed
/// balance is still returned; a failed read is an error.
#[instrument(skip(store))]
pub async fn refresh_lives<S: PlayerStore>(
    store: &S,
    identity: &PlayerId,
    now: DateTime<Utc>,
) -> Result<u32, StoreError> {
    let mut record = match store.get_player(identity).await? {
        Some(record) => record,
        None => {
            debug!("Creating record for new player {}", identity);
            match store.create_player(identity, None, now).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Failed to create record for {}: {}", identity, e);
                    return Ok(MAX_LIVES);
                }
            }
        }
    };

    let mut regen = regenerate(&record, now);
    for _ in 0..REGEN_WRITE_ATTEMPTS {
        if !regen.changed {
            return Ok(regen.balance);
        }

        debug!(
            "Regenerating {} from {} to {} lives",
            identity, record.lives_balance, regen.balance
        );
        let written = store
            .apply_regeneration(
                identity,
                record.lives_balance,
                record.last_regen_at,
                regen.balance,
                now,
            )
            .await;

        match written {
            Ok(true) => return Ok(regen.balance),
            Ok(false) => {}
            Err(e) => {
                warn!(
                    "Regeneration write failed for {} (reporting {} lives): {}",
                    identity, regen.balance, e
                );
                return Ok(regen.balance);
            }
        }

        let Some(current) = store.get_player(identity).await? else {
            return Ok(regen.balance);
        };
        record = current;
        regen = regenerate(&record, now);
    }

    if regen.changed {
        warn!(
            "Record for {} kept changing; reporting {} lives unpersisted",
            identity, regen.balance
        );
    }
    Ok(regen.balance)
}

// =============================================================================
// TESTS
// =============================================================================
