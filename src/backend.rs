use crate::error::Result;
use crate::value::WireValue;
use async_trait::async_trait;

/// One result row, values in SELECT column order
pub type WireRow = Vec<WireValue>;

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    /// Id assigned to the last inserted row, when the driver reports one
    pub last_insert_id: Option<i64>,
}

impl ExecuteResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// Database backend trait
///
/// Statements arrive with positional parameters already converted to
/// [`WireValue`]; placeholders in the SQL follow the connection's dialect.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Execute a statement that returns no rows
    async fn execute(&mut self, sql: &str, params: &[WireValue]) -> Result<ExecuteResult>;

    /// Query and return rows
    async fn query(&mut self, sql: &str, params: &[WireValue]) -> Result<Vec<WireRow>>;

    /// Begin a transaction
    async fn begin_transaction(&mut self) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&mut self) -> Result<()>;

    /// Rollback the current transaction
    async fn rollback(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_result() {
        let result = ExecuteResult::new(1).with_last_insert_id(7);
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(7));
        assert_eq!(ExecuteResult::default().last_insert_id, None);
    }
}
