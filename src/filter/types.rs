use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ilike")] ILike,
    #[serde(rename = "$between")] Between,
    #[serde(rename = "$and")] And,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOp::Eq,
            "$ilike" => FilterOp::ILike,
            "$between" => FilterOp::Between,
            "$and" => FilterOp::And,
            _ => return None,
        })
    }
}

/// Column name to SQL type for placeholders that need an explicit cast
pub type ColumnCasts = BTreeMap<String, &'static str>;

/// JSON filter document: `{ "select": [..], "where": {..}, "order": .., "limit": n, "offset": n }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Nulls always sort last so that undated rows trail dated ones in both directions.
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS LAST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
