//! Row fetching
//!
//! `RowSource` is the seam between the report logic and the data store, so
//! the joiner and renderers can be exercised against a mock source. The
//! Postgres implementation issues plain `SELECT *` queries and decodes rows
//! into open `Entity` maps using the column metadata Postgres reports.

use crate::error::{AppError, AppResult};
use crate::model::{ColumnType, Entity, TableSchema};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::Row;
use tracing::{debug, warn};
use uuid::Uuid;

/// One table's fetched content: the observed schema (absent when the table
/// returned zero rows) and the rows themselves.
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
    pub schema: Option<TableSchema>,
    pub rows: Vec<Entity>,
}

/// Read-only access to rows of named tables
#[async_trait]
pub trait RowSource: Send + Sync {
    /// All rows of a table, capped at `limit`. No pagination; the cap is
    /// the declared bound on this reporting tool.
    async fn fetch_all(&self, table: &str, limit: i64) -> AppResult<TableSnapshot>;

    /// All rows where `column` equals `key` (compared as text)
    async fn fetch_where(&self, table: &str, column: &str, key: &str) -> AppResult<Vec<Entity>>;

    /// Zero or one row where `column` equals `key`
    async fn fetch_one(&self, table: &str, column: &str, key: &str) -> AppResult<Option<Entity>>;
}

/// `RowSource` backed by a Postgres connection pool
pub struct PgFetcher {
    pool: Pool,
}

impl PgFetcher {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSource for PgFetcher {
    async fn fetch_all(&self, table: &str, limit: i64) -> AppResult<TableSnapshot> {
        let client = self.pool.get().await?;
        let query = format!("SELECT * FROM {} LIMIT $1", quote_ident(table)?);
        debug!(table, limit, "fetching all rows");
        let rows = client.query(&query, &[&limit]).await?;

        let schema = rows.first().map(|row| schema_of(table, row));
        let rows = rows.iter().map(row_to_entity).collect();
        Ok(TableSnapshot { schema, rows })
    }

    async fn fetch_where(&self, table: &str, column: &str, key: &str) -> AppResult<Vec<Entity>> {
        let client = self.pool.get().await?;
        // Compare as text so string keys match uuid and text columns alike
        let query = format!(
            "SELECT * FROM {} WHERE {}::text = $1",
            quote_ident(table)?,
            quote_ident(column)?
        );
        debug!(table, column, key, "fetching matching rows");
        let rows = client.query(&query, &[&key]).await?;
        Ok(rows.iter().map(row_to_entity).collect())
    }

    async fn fetch_one(&self, table: &str, column: &str, key: &str) -> AppResult<Option<Entity>> {
        let client = self.pool.get().await?;
        let query = format!(
            "SELECT * FROM {} WHERE {}::text = $1 LIMIT 1",
            quote_ident(table)?,
            quote_ident(column)?
        );
        let row = client.query_opt(&query, &[&key]).await?;
        Ok(row.as_ref().map(row_to_entity))
    }
}

/// Validate and double-quote an identifier. Table and column names come
/// from configuration and the fixed relationship map, never from user rows,
/// but they still only pass as plain identifiers.
fn quote_ident(name: &str) -> AppResult<String> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::Query(format!("Invalid identifier: {:?}", name)));
    }
    Ok(format!("\"{}\"", name))
}

/// Classify a Postgres type name into the report's column type vocabulary
fn classify(type_name: &str) -> ColumnType {
    match type_name {
        "bool" => ColumnType::Boolean,
        "int2" | "int4" | "int8" => ColumnType::Integer,
        "float4" | "float8" | "numeric" => ColumnType::Float,
        "text" | "varchar" | "bpchar" | "name" => ColumnType::Text,
        "uuid" => ColumnType::Uuid,
        "timestamp" | "timestamptz" => ColumnType::Timestamp,
        "date" => ColumnType::Date,
        "json" | "jsonb" => ColumnType::Json,
        other => ColumnType::Other(other.to_string()),
    }
}

/// Schema observed on a returned row, from the column metadata Postgres
/// reports rather than the runtime value of each cell
fn schema_of(table: &str, row: &Row) -> TableSchema {
    TableSchema {
        table: table.to_string(),
        columns: row
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), classify(col.type_().name())))
            .collect(),
    }
}

fn row_to_entity(row: &Row) -> Entity {
    (0..row.columns().len())
        .map(|idx| (row.columns()[idx].name().to_string(), decode_cell(row, idx)))
        .collect()
}

/// Decode one cell into a JSON value. Types the tool cannot decode degrade
/// to a placeholder string instead of failing the whole row.
fn decode_cell(row: &Row, idx: usize) -> Value {
    let column = &row.columns()[idx];
    let result = match column.type_().name() {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .map(|v| v.map(Value::Bool)),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| v.map(|n| Value::from(n as i64))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| v.map(|n| Value::from(n as i64))),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .map(|v| v.map(Value::from)),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| v.map(|n| Value::from(n as f64))),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .map(|v| v.map(Value::from)),
        "text" | "varchar" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(idx)
            .map(|v| v.map(Value::String)),
        "uuid" => row
            .try_get::<_, Option<Uuid>>(idx)
            .map(|v| v.map(|u| Value::String(u.to_string()))),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(|v| v.map(|t| Value::String(t.to_rfc3339()))),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(|v| v.map(|t| Value::String(t.to_string()))),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .map(|v| v.map(|d| Value::String(d.to_string()))),
        "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map(|v| v.map(Value::String)),
    };

    match result {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(e) => {
            warn!(
                column = column.name(),
                pg_type = column.type_().name(),
                "cell not decodable: {}",
                e
            );
            Value::String(format!("<{}>", column.type_().name()))
        }
    }
}
