use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ColumnCasts, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    casts: ColumnCasts,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_identifier(&table_name).map_err(FilterError::InvalidTableName)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            casts: ColumnCasts::new(),
        })
    }

    /// Render placeholders compared against `column` as `$n::sql_type`
    pub fn cast_column(&mut self, column: &str, sql_type: &'static str) -> Result<&mut Self, FilterError> {
        Self::validate_column(column)?;
        self.casts.insert(column.to_string(), sql_type);
        Ok(self)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if data.limit.is_some() || data.offset.is_some() { self.limit(data.limit, data.offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" { Self::validate_column(column)?; }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit { if l < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); } }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = limit;
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0, &self.casts)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_result.query);
        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn validate_column(name: &str) -> Result<(), FilterError> {
        Self::validate_identifier(name).map_err(FilterError::InvalidColumn)
    }

    fn validate_identifier(name: &str) -> Result<(), String> {
        let Some(first) = name.chars().next() else {
            return Err("Identifier cannot be empty".to_string());
        };
        let starts_ok = first.is_ascii_alphabetic() || first == '_';
        if !starts_ok || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("Invalid identifier format: {}", name));
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
