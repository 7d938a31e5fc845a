use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData};

pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        Ok(Self {
            filter: Filter::new(table_name)?,
            _phantom: std::marker::PhantomData,
        })
    }

    /// Compare `columns` against `$n::date` placeholders
    pub fn date_columns(mut self, columns: &[&str]) -> Result<Self, DatabaseError> {
        for column in columns {
            self.filter.cast_column(column, "date")?;
        }
        Ok(self)
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(filter_data)?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.filter.to_sql()?;
        tracing::debug!(query = %sql_result.query, "select");
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result: SqlResult = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Code columns are INTEGER
                match i32::try_from(i) {
                    Ok(small) => q.bind(small),
                    Err(_) => q.bind(i),
                }
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // the where compiler never emits array params
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => q.bind(small),
                    Err(_) => q.bind(i),
                }
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) => q,
        Value::Object(_) => q.bind(v.clone()),
    }
}
