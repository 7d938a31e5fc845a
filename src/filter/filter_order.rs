use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            _ => return Err(FilterError::InvalidOrder("ORDER must be a string like \"onset_date desc\"".to_string())),
        };

        for info in &infos {
            Filter::validate_column(&info.column)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                out.push(FilterOrderInfo { column: col.to_string(), sort: Self::direction(it.next().unwrap_or("asc")) });
            }
        }
        out
    }

    fn direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
