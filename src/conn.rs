//! Connection layer: runs generated statements on a [`DatabaseBackend`].

use crate::backend::{DatabaseBackend, ExecuteResult, WireRow};
use crate::builder::{DeleteBuilder, InsertBuilder, SelectBuilder, Statement, UpdateBuilder};
use crate::condition::{Condition, QueryColumn, SortSpec};
use crate::config::ConnectionConfig;
use crate::dialect::{AutoIdStrategy, Dialect};
use crate::error::{BinderError, Result};
use crate::schema::{Row, Table};
use crate::value::{Value, WireValue};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Outcome of a query expected to match at most one row
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOne {
    Empty,
    Single(Row),
    TooMany,
}

impl SelectOne {
    /// The row, if exactly one matched
    pub fn into_row(self) -> Option<Row> {
        match self {
            SelectOne::Single(row) => Some(row),
            _ => None,
        }
    }
}

/// Typed table access over one backend connection
pub struct Connection<B: DatabaseBackend> {
    backend: Arc<RwLock<B>>,
    config: ConnectionConfig,
}

impl<B: DatabaseBackend> Connection<B> {
    /// Create a writable connection using `dialect`
    pub fn new(backend: B, dialect: Dialect) -> Self {
        Self::with_config(backend, ConnectionConfig::new(dialect))
    }

    pub fn with_config(backend: B, config: ConnectionConfig) -> Self {
        Self {
            backend: Arc::new(RwLock::new(backend)),
            config,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only.is_some()
    }

    fn check_write_ok(&self) -> Result<()> {
        match &self.config.read_only {
            Some(reason) => Err(BinderError::ReadOnly(reason.clone())),
            None => Ok(()),
        }
    }

    async fn execute(&self, sql: &str, params: &[WireValue]) -> Result<ExecuteResult> {
        debug!(sql, params = params.len(), "execute");
        let mut backend = self.backend.write().await;
        backend.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[WireValue]) -> Result<Vec<WireRow>> {
        debug!(sql, params = params.len(), "query");
        let mut backend = self.backend.write().await;
        backend.query(sql, params).await
    }

    pub async fn create_table(&self, table: &Table) -> Result<()> {
        self.check_write_ok()?;
        self.execute(&table.create_table_sql(self.dialect()), &[]).await?;
        Ok(())
    }

    pub async fn drop_table(&self, table: &Table) -> Result<()> {
        self.check_write_ok()?;
        self.execute(&table.drop_table_sql(false), &[]).await?;
        Ok(())
    }

    pub async fn drop_table_if_exists(&self, table: &Table) -> Result<()> {
        self.check_write_ok()?;
        self.execute(&table.drop_table_sql(true), &[]).await?;
        Ok(())
    }

    /// Insert `row`. A NULL AutoId is replaced in `row` by the id the
    /// database assigned.
    pub async fn insert(&self, table: &Table, row: &mut Row) -> Result<()> {
        self.check_write_ok()?;
        let stmt = InsertBuilder::new(table, row).build(self.dialect())?;

        let assigned = if stmt.auto_id_omitted
            && self.dialect().auto_id_strategy() == AutoIdStrategy::Returning
        {
            let rows = self.query(&stmt.sql, &stmt.params).await?;
            if rows.len() != 1 {
                return Err(unexpected_count("insert()", "1", rows.len() as u64));
            }
            rows.into_iter().next().and_then(|r| r.into_iter().next())
        } else {
            let result = self.execute(&stmt.sql, &stmt.params).await?;
            if result.rows_affected != 1 {
                return Err(unexpected_count("insert()", "1", result.rows_affected));
            }
            result.last_insert_id.map(WireValue::Integer)
        };

        if stmt.auto_id_omitted {
            if let Some(auto_id) = table.auto_id_column() {
                let id = match assigned {
                    Some(wire) => auto_id.from_wire(wire)?,
                    None => {
                        return Err(BinderError::Database(format!(
                            "insert(): no id reported for '{}'",
                            table.name()
                        )))
                    }
                };
                row.set(auto_id.name(), id);
            }
        }

        Ok(())
    }

    /// Update every row matching `condition` (all rows when `None`);
    /// returns the number of rows changed
    pub async fn update(&self, table: &Table, row: &Row, condition: Option<Condition>) -> Result<u64> {
        self.check_write_ok()?;
        let mut builder = UpdateBuilder::new(table, row);
        if let Some(condition) = condition {
            builder = builder.where_clause(condition);
        }
        let stmt = builder.build(self.dialect())?;
        Ok(self.execute(&stmt.sql, &stmt.params).await?.rows_affected)
    }

    /// Update the row with the same AutoId; false when no such row exists
    pub async fn update_by_id(&self, table: &Table, row: &Row) -> Result<bool> {
        self.check_write_ok()?;
        let stmt = UpdateBuilder::by_id(table, row).build(self.dialect())?;
        let result = self.execute(&stmt.sql, &stmt.params).await?;
        at_most_one("update_by_id()", result.rows_affected)
    }

    /// Delete every row matching `condition` (all rows when `None`)
    pub async fn delete(&self, table: &Table, condition: Option<Condition>) -> Result<u64> {
        self.check_write_ok()?;
        let mut builder = DeleteBuilder::new(table);
        if let Some(condition) = condition {
            builder = builder.where_clause(condition);
        }
        let stmt = builder.build(self.dialect())?;
        Ok(self.execute(&stmt.sql, &stmt.params).await?.rows_affected)
    }

    pub async fn delete_by_id(&self, table: &Table, row_id: impl Into<Value>) -> Result<bool> {
        self.check_write_ok()?;
        let stmt = DeleteBuilder::by_id(table, row_id).build(self.dialect())?;
        let result = self.execute(&stmt.sql, &stmt.params).await?;
        at_most_one("delete_by_id()", result.rows_affected)
    }

    /// Fetch a row by AutoId value
    pub async fn get(&self, table: &Table, row_id: impl Into<Value>) -> Result<Option<Row>> {
        let auto_id = table
            .auto_id_column()
            .ok_or_else(|| BinderError::NoAutoIdColumn(table.name().to_string()))?;
        let row_id = row_id.into();
        if row_id.is_null() {
            return Err(BinderError::AutoIdRequired("get()".to_string()));
        }
        let condition = table.q(auto_id.name())?.equals(row_id)?;

        match self.select_one(table, Some(condition.into()), None).await? {
            SelectOne::Empty => Ok(None),
            SelectOne::Single(row) => Ok(Some(row)),
            SelectOne::TooMany => Err(unexpected_count("get()", "0 or 1", 2)),
        }
    }

    pub async fn select(
        &self,
        table: &Table,
        condition: Option<Condition>,
        order_by: Option<SortSpec>,
    ) -> Result<Vec<Row>> {
        let stmt = select_statement(SelectBuilder::new(table), condition, order_by, self.dialect())?;
        let rows = self.query(&stmt.sql, &stmt.params).await?;
        rows.into_iter().map(|wire| decode_row(table, wire)).collect()
    }

    pub async fn select_one(
        &self,
        table: &Table,
        condition: Option<Condition>,
        order_by: Option<SortSpec>,
    ) -> Result<SelectOne> {
        let mut rows = self.select(table, condition, order_by).await?;
        match rows.len() {
            0 => Ok(SelectOne::Empty),
            1 => Ok(rows.pop().map(SelectOne::Single).unwrap_or(SelectOne::Empty)),
            _ => Ok(SelectOne::TooMany),
        }
    }

    /// Distinct values of one column
    pub async fn select_distinct(
        &self,
        table: &Table,
        column: &QueryColumn,
        condition: Option<Condition>,
        order_by: Option<SortSpec>,
    ) -> Result<Vec<Value>> {
        let builder = SelectBuilder::new(table).distinct(column);
        let stmt = select_statement(builder, condition, order_by, self.dialect())?;
        let rows = self.query(&stmt.sql, &stmt.params).await?;

        rows.into_iter()
            .map(|wire| match wire.into_iter().next() {
                Some(value) => column.column().from_wire(value),
                None => Err(BinderError::Database(
                    "select_distinct(): empty result row".to_string(),
                )),
            })
            .collect()
    }

    pub async fn begin(&self) -> Result<()> {
        debug!("begin");
        self.backend.write().await.begin_transaction().await
    }

    pub async fn commit(&self) -> Result<()> {
        debug!("commit");
        self.backend.write().await.commit().await
    }

    pub async fn rollback(&self) -> Result<()> {
        debug!("rollback");
        self.backend.write().await.rollback().await
    }

    pub async fn is_connected(&self) -> bool {
        self.backend.read().await.is_connected()
    }

    pub async fn close(self) -> Result<()> {
        let backend = Arc::try_unwrap(self.backend)
            .map_err(|_| BinderError::Database("connection is still shared".to_string()))?;
        backend.into_inner().close().await
    }
}

fn select_statement(
    mut builder: SelectBuilder<'_>,
    condition: Option<Condition>,
    order_by: Option<SortSpec>,
    dialect: Dialect,
) -> Result<Statement> {
    if let Some(condition) = condition {
        builder = builder.where_clause(condition);
    }
    if let Some(order_by) = order_by {
        builder = builder.order_by(order_by);
    }
    builder.build(dialect)
}

fn decode_row(table: &Table, wire: WireRow) -> Result<Row> {
    if wire.len() != table.columns().len() {
        return Err(BinderError::Database(format!(
            "table '{}': expected {} values per row, got {}",
            table.name(),
            table.columns().len(),
            wire.len()
        )));
    }

    let mut row = Row::new();
    for (column, value) in table.columns().iter().zip(wire) {
        row.set(column.name(), column.from_wire(value)?);
    }
    Ok(row)
}

fn unexpected_count(operation: &'static str, expected: &'static str, actual: u64) -> BinderError {
    warn!(operation, expected, actual, "unexpected row count");
    BinderError::UnexpectedRowCount {
        operation,
        expected,
        actual,
    }
}

fn at_most_one(operation: &'static str, rows_affected: u64) -> Result<bool> {
    match rows_affected {
        0 => Ok(false),
        1 => Ok(true),
        n => Err(unexpected_count(operation, "0 or 1", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, TextOptions};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockBackend {
        executed: Arc<std::sync::Mutex<Vec<(String, Vec<WireValue>)>>>,
        results: VecDeque<ExecuteResult>,
        rows: VecDeque<Vec<WireRow>>,
        in_transaction: bool,
    }

    impl MockBackend {
        fn new() -> Self {
            Self::default()
        }

        fn log(&self) -> Arc<std::sync::Mutex<Vec<(String, Vec<WireValue>)>>> {
            self.executed.clone()
        }

        fn with_result(mut self, result: ExecuteResult) -> Self {
            self.results.push_back(result);
            self
        }

        fn with_rows(mut self, rows: Vec<WireRow>) -> Self {
            self.rows.push_back(rows);
            self
        }

        fn record(&self, sql: &str, params: &[WireValue]) {
            self.executed
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
        }
    }

    #[async_trait]
    impl DatabaseBackend for MockBackend {
        async fn execute(&mut self, sql: &str, params: &[WireValue]) -> Result<ExecuteResult> {
            self.record(sql, params);
            Ok(self.results.pop_front().unwrap_or_else(|| ExecuteResult::new(1)))
        }

        async fn query(&mut self, sql: &str, params: &[WireValue]) -> Result<Vec<WireRow>> {
            self.record(sql, params);
            Ok(self.rows.pop_front().unwrap_or_default())
        }

        async fn begin_transaction(&mut self) -> Result<()> {
            self.in_transaction = true;
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.in_transaction = false;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.in_transaction = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn foo() -> Table {
        Table::new(
            "foo",
            vec![
                Column::auto_id("foo_id"),
                Column::integer("i1"),
                Column::text_with("s1", TextOptions::new(10)),
            ],
        )
        .unwrap()
    }

    fn foo_wire(id: i64, i1: i64, s1: &str) -> WireRow {
        vec![WireValue::Integer(id), WireValue::Integer(i1), WireValue::from(s1)]
    }

    #[tokio::test]
    async fn test_insert_assigns_last_insert_id() {
        let backend = MockBackend::new().with_result(ExecuteResult::new(1).with_last_insert_id(7));
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        let mut row = table
            .build([("i1", Value::from(101)), ("s1", Value::from("alpha"))])
            .unwrap();
        conn.insert(&table, &mut row).await.unwrap();

        assert_eq!(row.get_i64("foo_id"), Some(7));
        let log = log.lock().unwrap();
        assert_eq!(log[0].0, "INSERT INTO foo (i1,s1) VALUES (?,?)");
        assert_eq!(log[0].1, vec![WireValue::Integer(101), WireValue::from("alpha")]);
    }

    #[tokio::test]
    async fn test_insert_returning() {
        let backend = MockBackend::new().with_rows(vec![vec![WireValue::Integer(3)]]);
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Postgres);
        let table = foo();

        let mut row = table.build([("i1", Value::from(5))]).unwrap();
        conn.insert(&table, &mut row).await.unwrap();

        assert_eq!(row.get_i64("foo_id"), Some(3));
        assert_eq!(
            log.lock().unwrap()[0].0,
            "INSERT INTO foo (i1,s1) VALUES ($1,$2) RETURNING foo_id"
        );
    }

    #[tokio::test]
    async fn test_insert_explicit_id_untouched() {
        let backend = MockBackend::new().with_result(ExecuteResult::new(1).with_last_insert_id(99));
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        let mut row = table
            .build([("foo_id", Value::from(4)), ("i1", Value::from(1))])
            .unwrap();
        conn.insert(&table, &mut row).await.unwrap();
        assert_eq!(row.get_i64("foo_id"), Some(4));
    }

    #[tokio::test]
    async fn test_insert_unexpected_count() {
        let backend = MockBackend::new().with_result(ExecuteResult::new(0));
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        let mut row = table.build([("i1", Value::from(1))]).unwrap();
        assert!(matches!(
            conn.insert(&table, &mut row).await,
            Err(BinderError::UnexpectedRowCount { actual: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_only() {
        let backend = MockBackend::new();
        let log = backend.log();
        let config = ConnectionConfig::default().read_only("replica");
        let conn = Connection::with_config(backend, config);
        let table = foo();
        let mut row = table.build([("i1", Value::from(1))]).unwrap();

        assert!(conn.is_read_only());
        assert!(matches!(
            conn.create_table(&table).await,
            Err(BinderError::ReadOnly(_))
        ));
        let err = conn.insert(&table, &mut row).await.unwrap_err();
        assert_eq!(err.to_string(), "Connection is read only: replica");
        assert!(conn.delete(&table, None).await.is_err());
        assert!(conn.delete_by_id(&table, 1).await.is_err());
        assert!(conn.update(&table, &row, None).await.is_err());
        assert!(log.lock().unwrap().is_empty());

        // reads still go through
        conn.select(&table, None, None).await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_by_id() {
        let backend = MockBackend::new()
            .with_result(ExecuteResult::new(1))
            .with_result(ExecuteResult::new(0))
            .with_result(ExecuteResult::new(2));
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();
        let row = table
            .build([("foo_id", Value::from(4)), ("i1", Value::from(1))])
            .unwrap();

        assert!(conn.update_by_id(&table, &row).await.unwrap());
        assert!(!conn.update_by_id(&table, &row).await.unwrap());
        assert!(matches!(
            conn.update_by_id(&table, &row).await,
            Err(BinderError::UnexpectedRowCount { actual: 2, .. })
        ));

        let pending = table.build([("i1", Value::from(1))]).unwrap();
        assert!(matches!(
            conn.update_by_id(&table, &pending).await,
            Err(BinderError::AutoIdRequired(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let backend = MockBackend::new()
            .with_result(ExecuteResult::new(3))
            .with_result(ExecuteResult::new(2))
            .with_result(ExecuteResult::new(0));
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();
        let row = table
            .build([("foo_id", Value::from(1)), ("i1", Value::from(9))])
            .unwrap();

        let cond = table.q("i1").unwrap().less_than(5).unwrap();
        assert_eq!(conn.update(&table, &row, Some(cond.into())).await.unwrap(), 3);
        assert_eq!(conn.delete(&table, None).await.unwrap(), 2);
        assert!(!conn.delete_by_id(&table, 8).await.unwrap());

        let log = log.lock().unwrap();
        assert_eq!(log[0].0, "UPDATE foo SET foo_id=?,i1=?,s1=? WHERE i1<?");
        assert_eq!(log[1].0, "DELETE FROM foo");
        assert_eq!(log[2].0, "DELETE FROM foo WHERE foo_id=?");
    }

    #[tokio::test]
    async fn test_select_decodes_rows() {
        let backend = MockBackend::new().with_rows(vec![foo_wire(1, 10, "a"), foo_wire(2, 20, "b")]);
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        let rows = conn
            .select(&table, None, Some(table.q("i1").unwrap().desc()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_string("s1"), Some("b".to_string()));
        assert_eq!(rows[0].get_i64("i1"), Some(10));
    }

    #[tokio::test]
    async fn test_select_rejects_bad_row() {
        let backend = MockBackend::new().with_rows(vec![vec![WireValue::Integer(1)]]);
        let conn = Connection::new(backend, Dialect::Sqlite);
        assert!(matches!(
            conn.select(&foo(), None, None).await,
            Err(BinderError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_select_one() {
        let backend = MockBackend::new()
            .with_rows(vec![])
            .with_rows(vec![foo_wire(1, 10, "a")])
            .with_rows(vec![foo_wire(1, 10, "a"), foo_wire(2, 10, "b")]);
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        assert_eq!(conn.select_one(&table, None, None).await.unwrap(), SelectOne::Empty);
        let one = conn.select_one(&table, None, None).await.unwrap();
        assert_eq!(one.into_row().and_then(|r| r.get_i64("foo_id")), Some(1));
        assert_eq!(conn.select_one(&table, None, None).await.unwrap(), SelectOne::TooMany);
    }

    #[tokio::test]
    async fn test_get() {
        let backend = MockBackend::new().with_rows(vec![foo_wire(5, 1, "x")]);
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        let row = conn.get(&table, 5).await.unwrap().unwrap();
        assert_eq!(row.get_string("s1"), Some("x".to_string()));
        assert_eq!(conn.get(&table, 6).await.unwrap(), None);
        assert!(matches!(
            conn.get(&table, Value::Null).await,
            Err(BinderError::AutoIdRequired(_))
        ));

        let log = log.lock().unwrap();
        assert_eq!(log[0].0, "SELECT foo_id,i1,s1 FROM foo WHERE foo_id=?");
        assert_eq!(log[0].1, vec![WireValue::Integer(5)]);
    }

    #[tokio::test]
    async fn test_select_distinct() {
        let backend = MockBackend::new().with_rows(vec![
            vec![WireValue::Integer(10)],
            vec![WireValue::Integer(20)],
        ]);
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();
        let i1 = table.q("i1").unwrap();

        let values = conn
            .select_distinct(&table, i1, None, Some(i1.asc()))
            .await
            .unwrap();
        assert_eq!(values, vec![Value::Integer(10), Value::Integer(20)]);
        assert_eq!(
            log.lock().unwrap()[0].0,
            "SELECT DISTINCT i1 FROM foo ORDER BY i1 ASC"
        );

        assert!(matches!(
            conn.select_distinct(&table, i1, None, Some(table.q("s1").unwrap().asc()))
                .await,
            Err(BinderError::DistinctOrderMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_and_drop() {
        let backend = MockBackend::new();
        let log = backend.log();
        let conn = Connection::new(backend, Dialect::Sqlite);
        let table = foo();

        conn.create_table(&table).await.unwrap();
        conn.drop_table(&table).await.unwrap();
        conn.drop_table_if_exists(&table).await.unwrap();

        let log = log.lock().unwrap();
        assert!(log[0].0.starts_with("CREATE TABLE foo ("));
        assert_eq!(log[1].0, "DROP TABLE foo");
        assert_eq!(log[2].0, "DROP TABLE IF EXISTS foo");
    }

    #[tokio::test]
    async fn test_transaction_and_close() {
        let conn = Connection::new(MockBackend::new(), Dialect::Sqlite);
        conn.begin().await.unwrap();
        conn.rollback().await.unwrap();
        conn.begin().await.unwrap();
        conn.commit().await.unwrap();
        assert!(conn.is_connected().await);
        conn.close().await.unwrap();
    }
}
