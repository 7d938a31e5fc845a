use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{ColumnCasts, FilterOp, FilterWhereInfo};

pub struct FilterWhere<'a> {
    param_values: Vec<Value>,
    param_index: usize,
    conditions: Vec<String>,
    casts: &'a ColumnCasts,
}

impl<'a> FilterWhere<'a> {
    fn new(starting_param_index: usize, casts: &'a ColumnCasts) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
            casts,
        }
    }

    /// Compile a where document into a SQL predicate. Placeholders are numbered
    /// from `starting_param_index + 1`; placeholders compared against a column in
    /// `casts` carry an explicit `::type`.
    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
        casts: &ColumnCasts,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = FilterWhere::new(starting_param_index, casts);
        filter_where.parse_where_data(where_data)?;
        let where_clause = if filter_where.conditions.is_empty() {
            "1=1".to_string()
        } else {
            filter_where.conditions.join(" AND ")
        };
        Ok((where_clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        self.parse_and(key, value)?;
                    } else {
                        Filter::validate_column(key)?;
                        self.parse_field_condition(key, value)?;
                    }
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_and(&mut self, op: &str, value: &Value) -> Result<(), FilterError> {
        if FilterOp::from_key(op) != Some(FilterOp::And) {
            return Err(FilterError::UnsupportedOperator(op.to_string()));
        }
        let arr = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
        if arr.is_empty() {
            return Ok(());
        }

        let mut sql_parts = Vec::with_capacity(arr.len());
        for v in arr {
            let (sql, params) = FilterWhere::generate(v, self.param_index, self.casts)?;
            self.param_index += params.len();
            self.param_values.extend(params);
            sql_parts.push(format!("({})", sql));
        }
        self.conditions.push(format!("({})", sql_parts.join(" AND ")));
        Ok(())
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        if let Value::Object(obj) = value {
            for (op_key, op_val) in obj {
                let operator = FilterOp::from_key(op_key)
                    .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                let info = FilterWhereInfo { column: field.to_string(), operator, data: op_val.clone() };
                let sql = self.build_sql_condition(&info)?;
                self.conditions.push(sql);
            }
        } else {
            // Implicit equality: { field: value }
            let info = FilterWhereInfo { column: field.to_string(), operator: FilterOp::Eq, data: value.clone() };
            let sql = self.build_sql_condition(&info)?;
            self.conditions.push(sql);
        }
        Ok(())
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = condition.column.as_str();
        let quoted_column = format!("\"{}\"", column);
        let data = condition.data.clone();
        Ok(match condition.operator {
            FilterOp::Eq => {
                if data.is_null() { format!("{} IS NULL", quoted_column) }
                else { format!("{} = {}", quoted_column, self.param(column, data)) }
            }
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(column, data)),
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(column, values[0].clone());
                    let high = self.param(column, values[1].clone());
                    format!("{} BETWEEN {} AND {}", quoted_column, low, high)
                }
                _ => return Err(FilterError::InvalidOperatorData("$between requires array with 2 values".to_string())),
            },
            FilterOp::And => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "logical operator used as field condition on {}",
                    condition.column
                )))
            }
        })
    }

    fn param(&mut self, column: &str, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        match self.casts.get(column) {
            Some(sql_type) => format!("${}::{}", self.param_index, sql_type),
            None => format!("${}", self.param_index),
        }
    }
}

/// Escape `%`, `_` and `\` so a literal value can be used as an exact ILIKE pattern.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
