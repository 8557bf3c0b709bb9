//! In-process Player Store
//!
//! Reference implementation of [`PlayerStore`]. Every operation runs under
//! one `RwLock`, so each mutating call is a single atomic read-modify-write,
//! the same guarantee a stored procedure gives a remote store.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{LeaderboardEntry, LifeConsumption, PlayerStore, RankEntry, StoreError};
use crate::economy::lives::regenerate;
use crate::economy::record::{PlayerId, PlayerRecord};
use crate::economy::MAX_LIVES;

/// Player records held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<PlayerId, PlayerRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a full record. Test and seeding helper.
    pub async fn insert_record(&self, record: PlayerRecord) {
        let mut records = self.records.write().await;
        records.insert(record.identity.clone(), record);
    }
}

impl PlayerStore for MemoryStore {
    async fn get_player(&self, identity: &PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(identity).cloned())
    }

    async fn upsert_player(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        lives_balance: u32,
        last_regen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(identity.clone())
            .or_insert_with(|| PlayerRecord::fresh(identity.clone(), None, last_regen_at));

        record.lives_balance = lives_balance.min(MAX_LIVES);
        record.last_regen_at = record.last_regen_at.max(last_regen_at);
        record.touch_display_name(display_name);
        Ok(())
    }

    async fn create_player(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PlayerRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records.entry(identity.clone()).or_insert_with(|| {
            let mut fresh = PlayerRecord::fresh(identity.clone(), None, now);
            fresh.touch_display_name(display_name);
            fresh
        });
        Ok(record.clone())
    }

    async fn apply_regeneration(
        &self,
        identity: &PlayerId,
        expected_balance: u32,
        expected_last_regen_at: DateTime<Utc>,
        new_balance: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(identity) else {
            return Ok(false);
        };

        if record.lives_balance != expected_balance
            || record.last_regen_at != expected_last_regen_at
        {
            debug!("Record for {} changed since it was read", identity);
            return Ok(false);
        }

        record.lives_balance = new_balance.min(MAX_LIVES);
        record.last_regen_at = record.last_regen_at.max(now);
        Ok(true)
    }

    async fn consume_life(
        &self,
        identity: &PlayerId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<LifeConsumption, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(identity.clone())
            .or_insert_with(|| PlayerRecord::fresh(identity.clone(), None, now));

        let available = regenerate(record, now).balance;
        if available == 0 {
            debug!("Player {} has no lives left", identity);
            return Ok(LifeConsumption::NoLivesLeft);
        }

        record.lives_balance = available - 1;
        record.last_regen_at = record.last_regen_at.max(now);
        record.touch_display_name(display_name);

        Ok(LifeConsumption::Consumed { remaining: record.lives_balance })
    }

    async fn keep_max_score(
        &self,
        identity: &PlayerId,
        score: u64,
        display_name: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(identity.clone())
            .or_insert_with(|| PlayerRecord::fresh(identity.clone(), None, Utc::now()));

        if score > record.best_score {
            record.best_score = score;
        }
        record.touch_display_name(display_name);
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let records = self.records.read().await;
        let mut rows: Vec<&PlayerRecord> = records.values().collect();
        // BTreeMap iteration is identity-ordered, and the sort is stable
        rows.sort_by(|a, b| b.best_score.cmp(&a.best_score));

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|r| LeaderboardEntry {
                username: r.display_name.clone(),
                high_score: r.best_score,
            })
            .collect())
    }

    async fn rank(&self, identity: &PlayerId) -> Result<Option<RankEntry>, StoreError> {
        let records = self.records.read().await;
        let Some(record) = records.get(identity) else {
            return Ok(None);
        };

        let ahead = records
            .values()
            .filter(|r| r.best_score > record.best_score)
            .count() as u64;

        Ok(Some(RankEntry { rank: ahead + 1, score: record.best_score }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pid(s: &str) -> PlayerId {
        PlayerId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_consume_creates_record_at_full_lives() {
        let store = MemoryStore::new();
        let outcome = store
            .consume_life(&pid("1"), Some("alice"), Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome, LifeConsumption::Consumed { remaining: MAX_LIVES - 1 });
        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.display_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_consume_stops_at_zero() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for expected in (0..MAX_LIVES).rev() {
            let outcome = store.consume_life(&pid("1"), None, now).await.unwrap();
            assert_eq!(outcome, LifeConsumption::Consumed { remaining: expected });
        }

        let outcome = store.consume_life(&pid("1"), None, now).await.unwrap();
        assert_eq!(outcome, LifeConsumption::NoLivesLeft);
        assert_eq!(store.get_player(&pid("1")).await.unwrap().unwrap().lives_balance, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_never_goes_negative() {
        let store = Arc::new(MemoryStore::new());
        let mut record = PlayerRecord::fresh(pid("1"), None, Utc::now());
        record.lives_balance = 3;
        store.insert_record(record).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.spawn(async move { store.consume_life(&pid("1"), None, Utc::now()).await });
        }

        let mut consumed = 0;
        while let Some(result) = tasks.join_next().await {
            if let LifeConsumption::Consumed { .. } = result.unwrap().unwrap() {
                consumed += 1;
            }
        }

        assert_eq!(consumed, 3);
        assert_eq!(store.get_player(&pid("1")).await.unwrap().unwrap().lives_balance, 0);
    }

    #[tokio::test]
    async fn test_keep_max_score_never_decreases() {
        let store = MemoryStore::new();
        store.keep_max_score(&pid("1"), 300, Some("alice")).await.unwrap();
        store.keep_max_score(&pid("1"), 100, None).await.unwrap();

        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.best_score, 300);
        assert_eq!(record.lives_balance, MAX_LIVES);
    }

    #[tokio::test]
    async fn test_upsert_clamps_and_keeps_timestamp_monotonic() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let earlier = now - chrono::Duration::hours(2);

        store.upsert_player(&pid("1"), None, 99, now).await.unwrap();
        store.upsert_player(&pid("1"), None, 2, earlier).await.unwrap();

        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.lives_balance, 2);
        assert_eq!(record.last_regen_at, now);
    }

    #[tokio::test]
    async fn test_upsert_preserves_best_score() {
        let store = MemoryStore::new();
        store.keep_max_score(&pid("1"), 250, None).await.unwrap();
        store.upsert_player(&pid("1"), Some("bob"), 1, Utc::now()).await.unwrap();

        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.best_score, 250);
        assert_eq!(record.display_name.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_top_scores_ordering_and_limit() {
        let store = MemoryStore::new();
        store.keep_max_score(&pid("a"), 10, Some("a")).await.unwrap();
        store.keep_max_score(&pid("b"), 30, Some("b")).await.unwrap();
        store.keep_max_score(&pid("c"), 20, Some("c")).await.unwrap();
        store.keep_max_score(&pid("d"), 30, Some("d")).await.unwrap();

        let top = store.top_scores(3).await.unwrap();
        let names: Vec<_> = top.iter().map(|e| e.username.clone().unwrap()).collect();
        assert_eq!(names, vec!["b", "d", "c"]);
        assert_eq!(top[0].high_score, 30);
    }

    #[tokio::test]
    async fn test_rank_uses_competition_ranking() {
        let store = MemoryStore::new();
        store.keep_max_score(&pid("a"), 50, None).await.unwrap();
        store.keep_max_score(&pid("b"), 50, None).await.unwrap();
        store.keep_max_score(&pid("c"), 10, None).await.unwrap();

        let rank_of = |score, rank| Some(RankEntry { rank, score });
        assert_eq!(store.rank(&pid("a")).await.unwrap(), rank_of(50, 1));
        assert_eq!(store.rank(&pid("b")).await.unwrap(), rank_of(50, 1));
        assert_eq!(store.rank(&pid("c")).await.unwrap(), rank_of(10, 3));
        assert_eq!(store.rank(&pid("zzz")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_player_never_overwrites() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.consume_life(&pid("1"), Some("alice"), now).await.unwrap();

        let record = store.create_player(&pid("1"), Some("mallory"), now).await.unwrap();
        assert_eq!(record.lives_balance, MAX_LIVES - 1);
        assert_eq!(record.display_name.as_deref(), Some("alice"));

        let created = store.create_player(&pid("2"), Some("bob"), now).await.unwrap();
        assert_eq!(created.lives_balance, MAX_LIVES);
        assert_eq!(created.display_name.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_apply_regeneration_rejects_stale_expectation() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let last = now - chrono::Duration::hours(2);
        let mut record = PlayerRecord::fresh(pid("1"), None, last);
        record.lives_balance = 1;
        store.insert_record(record).await;

        // A stale balance loses
        assert!(!store.apply_regeneration(&pid("1"), 2, last, 3, now).await.unwrap());
        // A stale clock loses
        assert!(!store.apply_regeneration(&pid("1"), 1, now, 3, now).await.unwrap());
        // Unknown players are never created here
        assert!(!store.apply_regeneration(&pid("9"), 1, last, 3, now).await.unwrap());
        assert_eq!(store.get_player(&pid("9")).await.unwrap(), None);

        assert!(store.apply_regeneration(&pid("1"), 1, last, 3, now).await.unwrap());
        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.lives_balance, 3);
        assert_eq!(record.last_regen_at, now);
    }

    #[tokio::test]
    async fn test_consume_credits_accrued_regeneration() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut record = PlayerRecord::fresh(pid("1"), None, now - chrono::Duration::hours(2));
        record.lives_balance = 0;
        store.insert_record(record).await;

        let outcome = store.consume_life(&pid("1"), None, now).await.unwrap();
        assert_eq!(outcome, LifeConsumption::Consumed { remaining: 1 });

        let record = store.get_player(&pid("1")).await.unwrap().unwrap();
        assert_eq!(record.lives_balance, 1);
        assert_eq!(record.last_regen_at, now);
    }
}
