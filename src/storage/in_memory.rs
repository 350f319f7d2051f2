use super::MatchStore;
use crate::error::{EtlError, Result};
use crate::types::MatchRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory store for development/testing.
///
/// A batch is applied to a staged copy and swapped in only when every row
/// has been applied, mirroring a single committed transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<Mutex<BTreeMap<i32, MatchRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<i32, MatchRecord>>> {
        self.rows.lock().map_err(|_| EtlError::Query {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn migrate(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_matches(&self, matches: &[MatchRecord]) -> Result<usize> {
        let mut rows = self.lock()?;
        let mut staged = rows.clone();
        for record in matches {
            staged.insert(record.match_number, record.clone());
        }
        *rows = staged;

        debug!("Upserted {} rows into memory store", matches.len());
        Ok(matches.len())
    }

    async fn fetch_matches(&self) -> Result<Vec<MatchRecord>> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(match_number: i32, result: Option<&str>) -> MatchRecord {
        MatchRecord {
            match_number,
            round_number: Some(1),
            match_year: Some(2025),
            match_month: Some(12),
            match_day: Some(21),
            match_time: chrono::NaiveTime::from_hms_opt(20, 0, 0),
            location: Some("Rabat".to_string()),
            home_team: Some("Morocco".to_string()),
            away_team: Some("Comoros".to_string()),
            group_name: Some("Group A".to_string()),
            result: result.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn loading_twice_is_idempotent() {
        let store = InMemoryStore::new();
        let batch = vec![record(1, None), record(2, Some("2 - 0"))];

        store.upsert_matches(&batch).await.unwrap();
        let once = store.fetch_matches().await.unwrap();
        store.upsert_matches(&batch).await.unwrap();
        let twice = store.fetch_matches().await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice, batch);
    }

    #[tokio::test]
    async fn last_write_wins_per_key() {
        let store = InMemoryStore::new();
        store.upsert_matches(&[record(5, Some("0 - 0"))]).await.unwrap();
        store.upsert_matches(&[record(5, Some("1 - 2"))]).await.unwrap();

        let rows = store.fetch_matches().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result.as_deref(), Some("1 - 2"));
    }

    #[tokio::test]
    async fn fetch_is_ordered_by_match_number() {
        let store = InMemoryStore::new();
        store
            .upsert_matches(&[record(3, None), record(1, None), record(2, None)])
            .await
            .unwrap();
        let numbers: Vec<i32> = store
            .fetch_matches()
            .await
            .unwrap()
            .iter()
            .map(|r| r.match_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(store.len(), 3);
    }
}
