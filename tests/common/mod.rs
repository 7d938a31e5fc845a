#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use srag_api::app::AppState;
use srag_api::auth::{generate_jwt, Claims};
use srag_api::config::{IngestionConfig, QueryConfig};
use srag_api::database::{DatabaseError, MemoryStore, SragQuery, SragStore};
use srag_api::srag::{CaseFacts, IngestionRecord, SragRecord, SragService};

pub const HEADER: &str = "NU_NOTIFIC;DT_NOTIFIC;DT_SIN_PRI;SG_UF;CO_MUN_RES;CS_SEXO;NU_IDADE_N;EVOLUCAO;UTI;VACINA_COV";
pub const JWT_SECRET: &str = "test-secret";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write `rows` (already `;`-joined) under `HEADER`
pub fn write_csv(dir: &Path, name: &str, rows: &[String]) -> Result<PathBuf> {
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// `count` distinct, well-formed rows with ids `{prefix}-{i}`
pub fn generated_rows(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let day = (i % 28) + 1;
            format!("{prefix}-{i};2024-01-{day:02};2024-01-{day:02};SP;355030;F;{};1;2;1", 20 + i % 60)
        })
        .collect()
}

pub fn ingestion_config(dir: &Path) -> IngestionConfig {
    IngestionConfig { csv_dir: dir.to_path_buf(), batch_size: 1000, auto_ingest: true }
}

pub fn service(store: Arc<dyn SragStore>, dir: &Path) -> SragService {
    SragService::new(store, ingestion_config(dir), QueryConfig::default())
}

pub struct Case {
    pub id: String,
    pub onset: Option<NaiveDate>,
    pub state: &'static str,
    pub outcome: Option<i32>,
    pub icu: Option<i32>,
    pub vaccinated: Option<i32>,
}

impl Case {
    pub fn new(id: impl Into<String>, onset: Option<NaiveDate>, state: &'static str) -> Self {
        Self { id: id.into(), onset, state, outcome: None, icu: None, vaccinated: None }
    }

    pub fn death(mut self) -> Self {
        self.outcome = Some(2);
        self
    }

    pub fn icu(mut self) -> Self {
        self.icu = Some(1);
        self
    }

    pub fn vaccinated(mut self) -> Self {
        self.vaccinated = Some(1);
        self
    }

    pub fn into_record(self) -> SragRecord {
        SragRecord::from_ingestion(
            IngestionRecord {
                notification_id: Some(self.id),
                onset_date: self.onset,
                state_code: Some(self.state.to_string()),
                municipality_code: Some("355030".to_string()),
                outcome: self.outcome,
                icu: self.icu,
                vaccinated: self.vaccinated,
                ..Default::default()
            },
            uuid::Uuid::new_v4(),
            Utc::now(),
        )
    }
}

pub fn seeded_store(cases: Vec<Case>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_records(cases.into_iter().map(Case::into_record).collect()))
}

/// [`MemoryStore`] that fails inserts of any batch carrying `poison_id`,
/// and every read when `fail_reads` is set
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub poison_id: Option<String>,
    pub fail_reads: bool,
}

impl FaultyStore {
    fn read_guard(&self) -> Result<(), DatabaseError> {
        if self.fail_reads {
            return Err(DatabaseError::QueryError("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SragStore for FaultyStore {
    async fn count(&self, query: &SragQuery) -> Result<i64, DatabaseError> {
        self.read_guard()?;
        self.inner.count(query).await
    }

    async fn create_many(&self, records: Vec<IngestionRecord>) -> Result<u64, DatabaseError> {
        let poisoned = self
            .poison_id
            .as_ref()
            .is_some_and(|poison| records.iter().any(|r| r.notification_id.as_ref() == Some(poison)));
        if poisoned {
            return Err(DatabaseError::QueryError("insert rejected".into()));
        }
        self.inner.create_many(records).await
    }

    async fn find_many(&self, query: &SragQuery) -> Result<Vec<SragRecord>, DatabaseError> {
        self.read_guard()?;
        self.inner.find_many(query).await
    }

    async fn find_facts(&self, query: &SragQuery) -> Result<Vec<CaseFacts>, DatabaseError> {
        self.read_guard()?;
        self.inner.find_facts(query).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.read_guard()
    }
}

pub fn app_state(store: Arc<dyn SragStore>) -> AppState {
    let dir = std::env::temp_dir();
    AppState::new(service(store, &dir), JWT_SECRET)
}

pub fn bearer() -> String {
    let token = generate_jwt(&Claims::new("tester", 1), JWT_SECRET).expect("token");
    format!("Bearer {}", token)
}
