use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::database::manager::DatabaseError;
use crate::filter::filter_where::escape_like;
use crate::filter::FilterData;
use crate::srag::record::{CaseFacts, IngestionRecord, SragRecord};

pub const SRAG_TABLE: &str = "srag";

/// `DATE` columns of the table; filter values for them are cast on the SQL side
pub const DATE_COLUMNS: &[&str] = &[
    "notification_date",
    "onset_date",
    "icu_entry_date",
    "icu_exit_date",
    "dose1_date",
    "dose2_date",
    "booster_date",
];

/// Columns of the chart/metrics projection
pub const FACT_COLUMNS: &[&str] = &[
    "onset_date",
    "outcome",
    "icu",
    "vaccinated",
    "state_code",
    "municipality_code",
];

/// Storage capability consumed by the ingestion and query services.
#[async_trait]
pub trait SragStore: Send + Sync {
    /// Number of rows matching `query` (limit/offset/order ignored)
    async fn count(&self, query: &SragQuery) -> Result<i64, DatabaseError>;

    /// Insert a batch, silently skipping rows that violate the uniqueness
    /// constraint. Returns how many rows were actually inserted.
    async fn create_many(&self, records: Vec<IngestionRecord>) -> Result<u64, DatabaseError>;

    async fn find_many(&self, query: &SragQuery) -> Result<Vec<SragRecord>, DatabaseError>;

    /// Like `find_many` but projecting only [`FACT_COLUMNS`]
    async fn find_facts(&self, query: &SragQuery) -> Result<Vec<CaseFacts>, DatabaseError>;

    /// Reachability probe for `/health`
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionColumn {
    State,
    Municipality,
}

impl RegionColumn {
    pub fn column(&self) -> &'static str {
        match self {
            RegionColumn::State => "state_code",
            RegionColumn::Municipality => "municipality_code",
        }
    }
}

/// Typed filter over the `srag` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SragQuery {
    /// Case-insensitive equality on the chosen region column
    pub region: Option<(RegionColumn, String)>,
    pub state_code: Option<String>,
    pub municipality_code: Option<String>,
    pub outcome: Option<i32>,
    pub icu: Option<i32>,
    pub vaccinated: Option<i32>,
    /// Inclusive onset-date range
    pub onset_between: Option<(NaiveDate, NaiveDate)>,
    pub newest_first: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SragQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_region(mut self, column: RegionColumn, value: impl Into<String>) -> Self {
        self.region = Some((column, value.into()));
        self
    }

    pub fn onset_between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.onset_between = Some((start, end));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render as the JSON filter document understood by the SQL filter compiler.
    /// Conditions are collected under a single `$and` so that a region filter and
    /// an exact filter on the same column can coexist.
    pub fn to_filter_data(&self) -> FilterData {
        let mut conditions: Vec<Value> = Vec::new();

        if let Some((column, value)) = &self.region {
            let mut cond = Map::new();
            cond.insert(column.column().to_string(), json!({ "$ilike": escape_like(value) }));
            conditions.push(Value::Object(cond));
        }
        if let Some(v) = &self.state_code {
            conditions.push(json!({ "state_code": v }));
        }
        if let Some(v) = &self.municipality_code {
            conditions.push(json!({ "municipality_code": v }));
        }
        if let Some(v) = self.outcome {
            conditions.push(json!({ "outcome": v }));
        }
        if let Some(v) = self.icu {
            conditions.push(json!({ "icu": v }));
        }
        if let Some(v) = self.vaccinated {
            conditions.push(json!({ "vaccinated": v }));
        }
        if let Some((start, end)) = self.onset_between {
            let range = [start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()];
            conditions.push(json!({ "onset_date": { "$between": range } }));
        }

        let where_clause = if conditions.is_empty() {
            Value::Object(Map::new())
        } else {
            json!({ "$and": conditions })
        };

        FilterData {
            select: None,
            where_clause: Some(where_clause),
            order: self.newest_first.then(|| json!("onset_date desc")),
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// In-process evaluation with the same semantics as the SQL rendering
    pub fn matches(&self, record: &SragRecord) -> bool {
        if let Some((column, value)) = &self.region {
            let field = match column {
                RegionColumn::State => record.state_code.as_deref(),
                RegionColumn::Municipality => record.municipality_code.as_deref(),
            };
            match field {
                Some(f) if f.to_lowercase() == value.to_lowercase() => {}
                _ => return false,
            }
        }
        if self.state_code.is_some() && record.state_code != self.state_code {
            return false;
        }
        if self.municipality_code.is_some() && record.municipality_code != self.municipality_code {
            return false;
        }
        if self.outcome.is_some() && record.outcome != self.outcome {
            return false;
        }
        if self.icu.is_some() && record.icu != self.icu {
            return false;
        }
        if self.vaccinated.is_some() && record.vaccinated != self.vaccinated {
            return false;
        }
        if let Some((start, end)) = self.onset_between {
            match record.onset_date {
                Some(d) if d >= start && d <= end => {}
                _ => return false,
            }
        }
        true
    }
}
