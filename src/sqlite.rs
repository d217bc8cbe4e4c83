use crate::backend::{DatabaseBackend, ExecuteResult, WireRow};
use crate::error::{BinderError, Result};
use crate::value::WireValue;
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite executor over a single pooled `sqlx` connection.
///
/// The pool is capped at one connection so that `sqlite::memory:` databases
/// and explicit transactions see a single session.
pub struct SqliteBackend {
    pool: SqlitePool,
    in_transaction: bool,
}

impl SqliteBackend {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        info!(url, "opened sqlite database");

        Ok(Self {
            pool,
            in_transaction: false,
        })
    }

    /// Create an in-memory SQLite database
    pub async fn memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Create a file-based SQLite database
    pub async fn file(path: &str) -> Result<Self> {
        Self::new(&format!("sqlite://{}", path)).await
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Decode a row positionally using each value's storage class
    fn convert_row(row: &SqliteRow) -> Result<WireRow> {
        let mut values = Vec::with_capacity(row.len());

        for index in 0..row.len() {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                values.push(WireValue::Null);
                continue;
            }

            let storage = raw.type_info().name().to_string();
            let value = match storage.as_str() {
                "INTEGER" => WireValue::Integer(row.try_get::<i64, _>(index)?),
                "REAL" => WireValue::Float(row.try_get::<f64, _>(index)?),
                "BLOB" => {
                    let bytes = row.try_get::<Vec<u8>, _>(index)?;
                    WireValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => WireValue::Text(row.try_get::<String, _>(index)?),
            };
            values.push(value);
        }

        Ok(values)
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[WireValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            WireValue::Null => query.bind(None::<i64>),
            WireValue::Integer(v) => query.bind(*v),
            WireValue::Float(v) => query.bind(*v),
            WireValue::Boolean(v) => query.bind(*v),
            WireValue::Text(v) => query.bind(v.clone()),
            WireValue::Date(v) => query.bind(v.format("%Y-%m-%d").to_string()),
            WireValue::Timestamp(v) => query.bind(v.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        };
    }
    query
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
    async fn execute(&mut self, sql: &str, params: &[WireValue]) -> Result<ExecuteResult> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(ExecuteResult::new(result.rows_affected()).with_last_insert_id(result.last_insert_rowid()))
    }

    async fn query(&mut self, sql: &str, params: &[WireValue]) -> Result<Vec<WireRow>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::convert_row).collect()
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(BinderError::Database("Already in transaction".to_string()));
        }

        self.execute("BEGIN TRANSACTION", &[]).await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(BinderError::Database("Not in transaction".to_string()));
        }

        self.execute("COMMIT", &[]).await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(BinderError::Database("Not in transaction".to_string()));
        }

        self.execute("ROLLBACK", &[]).await?;
        self.in_transaction = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn close(self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
