use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::database::{RegionColumn, SragQuery, SragStore};
use super::error::SragError;
use super::record::CaseFacts;

/// Rows fetched for one chart request
pub const DEFAULT_CHART_MAX_ROWS: i64 = 10_000;

/// Region label used when a row has no state/municipality code
pub const UNKNOWN_REGION: &str = "N/A";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    Daily,
    #[default]
    Monthly,
    Yearly,
}

impl ChartPeriod {
    /// First day of the bucket containing `date`
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        let start = match self {
            ChartPeriod::Daily => Some(date),
            ChartPeriod::Monthly => date.with_day(1),
            ChartPeriod::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        // day 1 / Jan 1 always exist
        start.unwrap_or(date)
    }

    /// Bucket label: `2024-01-15`, `2024-01` or `2024`
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            ChartPeriod::Daily => date.format("%Y-%m-%d").to_string(),
            ChartPeriod::Monthly => date.format("%Y-%m").to_string(),
            ChartPeriod::Yearly => date.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    State,
    City,
}

impl GroupBy {
    pub fn region_column(&self) -> RegionColumn {
        match self {
            GroupBy::State => RegionColumn::State,
            GroupBy::City => RegionColumn::Municipality,
        }
    }

    fn region_of<'a>(&self, row: &'a CaseFacts) -> &'a str {
        let code = match self {
            GroupBy::State => row.state_code.as_deref(),
            GroupBy::City => row.municipality_code.as_deref(),
        };
        code.unwrap_or(UNKNOWN_REGION)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFilters {
    #[serde(default)]
    pub period: ChartPeriod,
    pub region: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub group_by: GroupBy,
}

impl ChartFilters {
    pub fn to_query(&self, max_rows: i64) -> SragQuery {
        let mut query = SragQuery::all().limit(max_rows);
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            query = query.in_region(self.group_by.region_column(), region);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            query = query.onset_between(start, end);
        }
        query
    }
}

/// One (period, region) bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub region: String,
    pub cases: u64,
    pub deaths: u64,
    pub icu_occupancy: u64,
    pub vaccinations: u64,
}

impl ChartPoint {
    fn new(date: NaiveDate, region: String) -> Self {
        Self { date, region, cases: 0, deaths: 0, icu_occupancy: 0, vaccinations: 0 }
    }

    fn add(&mut self, row: &CaseFacts) {
        self.cases += 1;
        if row.is_death() {
            self.deaths += 1;
        }
        if row.in_icu() {
            self.icu_occupancy += 1;
        }
        if row.is_vaccinated() {
            self.vaccinations += 1;
        }
    }
}

/// Tally rows into buckets ordered by bucket date, then region.
/// Rows without an onset date are skipped.
pub fn aggregate(rows: &[CaseFacts], period: ChartPeriod, group_by: GroupBy) -> Vec<ChartPoint> {
    // the bucket start date identifies the period label one-to-one
    let mut buckets: BTreeMap<(NaiveDate, String), ChartPoint> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some(onset) = row.onset_date else {
            skipped += 1;
            continue;
        };
        let date = period.bucket_start(onset);
        let region = group_by.region_of(row).to_string();
        buckets
            .entry((date, region.clone()))
            .or_insert_with(|| ChartPoint::new(date, region))
            .add(row);
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} rows without onset date while aggregating chart data", skipped);
    }
    buckets.into_values().collect()
}

pub async fn get_chart_data(
    store: &dyn SragStore,
    filters: &ChartFilters,
    max_rows: i64,
) -> Result<Vec<ChartPoint>, SragError> {
    let rows = store.find_facts(&filters.to_query(max_rows)).await.map_err(|e| {
        tracing::error!("Chart query failed: {}", e);
        SragError::ChartData(e)
    })?;

    if (rows.len() as i64) >= max_rows {
        tracing::warn!("Chart data truncated at {} rows", max_rows);
    }
    Ok(aggregate(&rows, filters.period, filters.group_by))
}
