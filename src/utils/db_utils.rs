use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::ApiError;

/// SQL bindable value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds `UPDATE table SET ... WHERE id_column = ?` from a JSON object.
///
/// `columns` maps accepted JSON keys to column names; any other key is
/// rejected, so the generated SQL never contains caller-supplied identifiers.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    columns: &[(&str, &str)],
    id_column: &str,
    id_value: i64,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = columns
            .iter()
            .find(|(json_key, _)| json_key == key)
            .map(|(_, column)| *column)
            .ok_or_else(|| ApiError::bad_request(format!("Field `{key}` cannot be updated")))?;

        let value = match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            },
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Null => SqlValue::Null,
            _ => return Err(ApiError::bad_request("Unsupported JSON value type")),
        };

        assignments.push(format!("{column} = ?"));
        values.push(value);
    }

    values.push(SqlValue::Integer(id_value));

    Ok(SqlUpdate {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments.join(", "),
            id_column
        ),
        values,
    })
}

pub async fn execute_update(pool: &SqlitePool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Integer(v) => query.bind(v),
            SqlValue::Real(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}
