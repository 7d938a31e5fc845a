//! Mapping of one raw CSV row (header name -> cell) into an [`IngestionRecord`].
//!
//! Nothing in here fails: unparseable cells become `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use super::record::IngestionRecord;

pub type RawRow = HashMap<String, String>;

pub fn parse_row(row: &RawRow) -> IngestionRecord {
    IngestionRecord {
        notification_id: first_non_empty(row, &["NU_NOTIFIC"]),
        notification_date: parse_date(row.get("DT_NOTIFIC").map(String::as_str)),
        onset_date: parse_date(row.get("DT_SIN_PRI").map(String::as_str)),
        state_code: first_non_empty(row, &["SG_UF", "SG_UF_NOT"]),
        municipality_code: first_non_empty(row, &["CO_MUN_RES"]),
        sex: first_non_empty(row, &["CS_SEXO"]),
        age: parse_int(row.get("NU_IDADE_N").map(String::as_str)),
        outcome: parse_int(row.get("EVOLUCAO").map(String::as_str)),
        icu: parse_int(row.get("UTI").map(String::as_str)),
        icu_entry_date: parse_date(row.get("DT_ENTUTI").map(String::as_str)),
        icu_exit_date: parse_date(row.get("DT_SAIDUTI").map(String::as_str)),
        vaccinated: parse_int(row.get("VACINA_COV").map(String::as_str)),
        dose1_date: parse_date(row.get("DOSE_1_COV").map(String::as_str)),
        dose2_date: parse_date(row.get("DOSE_2_COV").map(String::as_str)),
        booster_date: parse_date(row.get("DOSE_REF").map(String::as_str)),
    }
}

/// Accepts ISO dates (`2024-01-15`), ISO date-times (date part kept) and the
/// DataSUS `15/01/2024` layout.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(v, "%d/%m/%Y").ok()
}

/// Numeric cells may carry decimals (`"34.0"`); they are truncated toward zero.
pub fn parse_int(value: Option<&str>) -> Option<i32> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }

    let n: f64 = v.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    let truncated = n.trunc();
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return None;
    }
    Some(truncated as i32)
}

fn first_non_empty(row: &RawRow, columns: &[&str]) -> Option<String> {
    columns
        .iter()
        .filter_map(|c| row.get(*c))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}
