use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::database::{RegionColumn, SragQuery, SragStore};
use super::error::SragError;

pub const DEFAULT_REGION_LABEL: &str = "Brasil";
pub const DEFAULT_PERIOD_LABEL: &str = "geral";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricsFilters {
    pub region: Option<String>,
    /// `YYYY-MM`; absent means all time
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SragMetrics {
    pub case_increase_rate: f64,
    pub mortality_rate: f64,
    pub icu_occupancy_rate: f64,
    pub vaccination_rate: f64,
    pub period: String,
    pub region: String,
}

/// Inclusive calendar-month date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn parse(period: &str) -> Result<Self, SragError> {
        let invalid = || SragError::InvalidPeriod(period.to_string());
        let (year, month) = period.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        Self::starting(start).ok_or_else(invalid)
    }

    fn starting(start: NaiveDate) -> Option<Self> {
        let next = start.checked_add_months(Months::new(1))?;
        Some(Self { start, end: next.pred_opt()? })
    }

    /// The calendar month before this one, wrapping the year
    pub fn previous(&self) -> Option<Self> {
        Self::starting(self.start.checked_sub_months(Months::new(1))?)
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month())
    }
}

/// Two-decimal rounding with halves going up: `0.125 -> 0.13`, `-0.125 -> -0.12`
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// `part / whole * 100`, or 0 for an empty whole
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn increase_rate(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

pub async fn get_metrics(store: &dyn SragStore, filters: &MetricsFilters) -> Result<SragMetrics, SragError> {
    let region = filters.region.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let period = filters.period.as_deref().map(str::trim).filter(|p| !p.is_empty());
    let window = period.map(MonthWindow::parse).transpose()?;

    let mut base = SragQuery::all();
    if let Some(region) = region {
        base = base.in_region(RegionColumn::State, region);
    }

    let current = match window {
        Some(w) => base.clone().onset_between(w.start, w.end),
        None => base.clone(),
    };
    let previous = window.and_then(|w| w.previous()).map(|w| base.clone().onset_between(w.start, w.end));

    let counts = async {
        let deaths = SragQuery { outcome: Some(2), ..current.clone() };
        let icu = SragQuery { icu: Some(1), ..current.clone() };
        let vaccinated = SragQuery { vaccinated: Some(1), ..current.clone() };

        let (total, deaths, icu, vaccinated) = futures::try_join!(
            store.count(&current),
            store.count(&deaths),
            store.count(&icu),
            store.count(&vaccinated),
        )?;
        let previous_total = match &previous {
            Some(q) => store.count(q).await?,
            None => 0,
        };
        Ok::<_, crate::database::DatabaseError>((total, deaths, icu, vaccinated, previous_total))
    };

    let (total, deaths, icu, vaccinated, previous_total) = counts.await.map_err(|e| {
        tracing::error!("Metrics query failed: {}", e);
        SragError::Metrics(e)
    })?;

    Ok(SragMetrics {
        case_increase_rate: increase_rate(total, previous_total),
        mortality_rate: percentage(deaths, total),
        icu_occupancy_rate: percentage(icu, total),
        vaccination_rate: percentage(vaccinated, total),
        period: window.map(|w| w.label()).unwrap_or_else(|| DEFAULT_PERIOD_LABEL.to_string()),
        region: region.map(str::to_string).unwrap_or_else(|| DEFAULT_REGION_LABEL.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_month_windows() {
        let feb = MonthWindow::parse("2024-02").unwrap();
        assert_eq!((feb.start, feb.end), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(feb.label(), "2024-02");

        let jan = MonthWindow::parse("2024-1").unwrap();
        assert_eq!(jan.end, date(2024, 1, 31));
    }

    #[test]
    fn previous_month_wraps_year() {
        let prev = MonthWindow::parse("2024-01").unwrap().previous().unwrap();
        assert_eq!((prev.start, prev.end), (date(2023, 12, 1), date(2023, 12, 31)));
    }

    #[test]
    fn rejects_bad_periods() {
        for bad in ["2024", "2024-13", "jan-2024", "2024-00", ""] {
            assert!(matches!(MonthWindow::parse(bad), Err(SragError::InvalidPeriod(_))), "{bad}");
        }
    }

    #[test]
    fn rounding_and_rates() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(12.5), 12.5);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(increase_rate(10, 0), 0.0);
        assert_eq!(increase_rate(15, 10), 50.0);
        assert_eq!(increase_rate(5, 10), -50.0);
    }
}
