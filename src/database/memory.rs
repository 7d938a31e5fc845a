use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{SragQuery, SragStore};
use crate::srag::record::{CaseFacts, IngestionRecord, SragRecord};

/// In-process [`SragStore`] used for dry runs and tests.
///
/// Rows whose notification id was already stored are skipped, matching the
/// unique constraint of the Postgres table.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<SragRecord>>,
    create_many_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with pre-built rows, bypassing duplicate detection
    pub fn with_records(records: Vec<SragRecord>) -> Self {
        Self {
            rows: RwLock::new(records),
            create_many_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `create_many` invocations so far
    pub fn create_many_calls(&self) -> usize {
        self.create_many_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    async fn select(&self, query: &SragQuery) -> Vec<SragRecord> {
        let rows = self.rows.read().await;
        let mut selected: Vec<SragRecord> = rows.iter().filter(|r| query.matches(r)).cloned().collect();

        if query.newest_first {
            // DESC NULLS LAST
            selected.sort_by(|a, b| match (a.onset_date, b.onset_date) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        selected.into_iter().skip(offset).take(limit).collect()
    }
}

#[async_trait]
impl SragStore for MemoryStore {
    async fn count(&self, query: &SragQuery) -> Result<i64, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| query.matches(r)).count() as i64)
    }

    async fn create_many(&self, records: Vec<IngestionRecord>) -> Result<u64, DatabaseError> {
        self.create_many_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.write().await;
        let mut seen: HashSet<String> = rows.iter().filter_map(|r| r.notification_id.clone()).collect();
        let now = Utc::now();
        let mut inserted = 0;

        for record in records {
            if let Some(id) = &record.notification_id {
                if !seen.insert(id.clone()) {
                    continue;
                }
            }
            rows.push(SragRecord::from_ingestion(record, Uuid::new_v4(), now));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find_many(&self, query: &SragQuery) -> Result<Vec<SragRecord>, DatabaseError> {
        Ok(self.select(query).await)
    }

    async fn find_facts(&self, query: &SragQuery) -> Result<Vec<CaseFacts>, DatabaseError> {
        Ok(self.select(query).await.iter().map(SragRecord::facts).collect())
    }
}
