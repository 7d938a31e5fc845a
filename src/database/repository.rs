use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use tracing::info;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::QueryBuilder;
use crate::database::store::{SragQuery, SragStore, DATE_COLUMNS, FACT_COLUMNS, SRAG_TABLE};
use crate::srag::record::{CaseFacts, IngestionRecord, SragRecord};

const CREATE_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS "srag" (
    "id"                UUID PRIMARY KEY,
    "notification_id"   TEXT UNIQUE,
    "notification_date" DATE,
    "onset_date"        DATE,
    "state_code"        TEXT,
    "municipality_code" TEXT,
    "sex"               TEXT,
    "age"               INTEGER,
    "outcome"           INTEGER,
    "icu"               INTEGER,
    "icu_entry_date"    DATE,
    "icu_exit_date"     DATE,
    "vaccinated"        INTEGER,
    "dose1_date"        DATE,
    "dose2_date"        DATE,
    "booster_date"      DATE,
    "created_at"        TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

const CREATE_INDEX_DDL: &[&str] = &[
    r#"CREATE INDEX IF NOT EXISTS "srag_onset_date_idx" ON "srag" ("onset_date")"#,
    r#"CREATE INDEX IF NOT EXISTS "srag_state_code_idx" ON "srag" ("state_code")"#,
];

const INSERT_COLUMNS: usize = 17;
// Postgres caps a statement at 65535 bind parameters
const MAX_ROWS_PER_INSERT: usize = 65_535 / INSERT_COLUMNS;

/// Postgres-backed [`SragStore`]
#[derive(Clone)]
pub struct PgSragStore {
    pool: PgPool,
}

impl PgSragStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `srag` table and its indexes when missing
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(CREATE_TABLE_DDL).execute(&mut *tx).await?;
        for ddl in CREATE_INDEX_DDL {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("Ensured schema for table {}", SRAG_TABLE);
        Ok(())
    }

    /// One multi-row `INSERT .. ON CONFLICT DO NOTHING`
    async fn insert_chunk(&self, records: Vec<IngestionRecord>) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        let mut builder = sqlx::QueryBuilder::<Postgres>::new(
            r#"INSERT INTO "srag" ("id", "notification_id", "notification_date", "onset_date", "state_code",
            "municipality_code", "sex", "age", "outcome", "icu", "icu_entry_date", "icu_exit_date", "vaccinated",
            "dose1_date", "dose2_date", "booster_date", "created_at") "#,
        );
        builder.push_values(records, |mut row, r| {
            row.push_bind(Uuid::new_v4())
                .push_bind(r.notification_id)
                .push_bind(r.notification_date)
                .push_bind(r.onset_date)
                .push_bind(r.state_code)
                .push_bind(r.municipality_code)
                .push_bind(r.sex)
                .push_bind(r.age)
                .push_bind(r.outcome)
                .push_bind(r.icu)
                .push_bind(r.icu_entry_date)
                .push_bind(r.icu_exit_date)
                .push_bind(r.vaccinated)
                .push_bind(r.dose1_date)
                .push_bind(r.dose2_date)
                .push_bind(r.booster_date)
                .push_bind(now);
        });
        builder.push(" ON CONFLICT DO NOTHING");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn srag_query<T>() -> Result<QueryBuilder<T>, DatabaseError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    QueryBuilder::<T>::new(SRAG_TABLE)?.date_columns(DATE_COLUMNS)
}

#[async_trait]
impl SragStore for PgSragStore {
    async fn count(&self, query: &SragQuery) -> Result<i64, DatabaseError> {
        srag_query::<SragRecord>()?
            .filter(query.to_filter_data())?
            .count(&self.pool)
            .await
    }

    async fn create_many(&self, records: Vec<IngestionRecord>) -> Result<u64, DatabaseError> {
        let mut inserted = 0;
        let mut remaining = records.into_iter().peekable();
        while remaining.peek().is_some() {
            let chunk: Vec<IngestionRecord> = remaining.by_ref().take(MAX_ROWS_PER_INSERT).collect();
            inserted += self.insert_chunk(chunk).await?;
        }
        Ok(inserted)
    }

    async fn find_many(&self, query: &SragQuery) -> Result<Vec<SragRecord>, DatabaseError> {
        srag_query::<SragRecord>()?
            .filter(query.to_filter_data())?
            .select_all(&self.pool)
            .await
    }

    async fn find_facts(&self, query: &SragQuery) -> Result<Vec<CaseFacts>, DatabaseError> {
        let mut filter_data = query.to_filter_data();
        filter_data.select = Some(FACT_COLUMNS.iter().map(|c| c.to_string()).collect());
        srag_query::<CaseFacts>()?
            .filter(filter_data)?
            .select_all(&self.pool)
            .await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
