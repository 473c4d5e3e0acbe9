use crate::error::ApiError;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Merge-updates only the provided fields. Field names are checked against
/// `allowed` so a request can never touch columns outside the whitelist.
pub fn build_update_sql(
    table: &str,
    payload: &Map<String, Value>,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::Validation("No fields provided for update".into()));
    }

    for key in payload.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ApiError::Validation(format!("Unknown field: {}", key)));
        }
    }

    let set_clause = payload
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(payload.len() + 1);

    // Convert JSON values → SqlValue
    for value in payload.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ApiError::Validation("Unsupported JSON value type".into())),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::I64(id_value as i64));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn builds_set_clause_in_field_order() {
        let payload = fields(&[
            ("department", json!("QA")),
            ("first_name", json!("Jane")),
        ]);
        let update = build_update_sql(
            "employees",
            &payload,
            &["first_name", "department"],
            "id",
            5,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET department = ?, first_name = ? WHERE id = ?"
        );
        assert_eq!(update.values.len(), 3);
    }

    #[test]
    fn rejects_unknown_columns() {
        let payload = fields(&[("password", json!("sneaky"))]);
        let err =
            build_update_sql("employees", &payload, &["first_name"], "id", 5).unwrap_err();
        assert!(err.to_string().contains("Unknown field"));
    }

    #[test]
    fn rejects_empty_payload() {
        let payload = Map::new();
        assert!(build_update_sql("employees", &payload, &["first_name"], "id", 5).is_err());
    }

    #[test]
    fn date_strings_become_dates() {
        let payload = fields(&[("joining_date", json!("2024-01-01"))]);
        let update =
            build_update_sql("employees", &payload, &["joining_date"], "id", 1).unwrap();
        assert!(matches!(update.values[0], SqlValue::Date(_)));
    }
}
