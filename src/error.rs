use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinderError>;

#[derive(Debug, Error)]
pub enum BinderError {
    #[error("{kind} '{column}': {expected} expected, got {found}")]
    TypeMismatch {
        kind: &'static str,
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column '{0}' is NOT NULL, got NULL")]
    NullNotAllowed(String),

    #[error("Text '{column}': string too long (max {max_length})")]
    ValueTooLong { column: String, max_length: usize },

    #[error("Table '{table}' has more than one column with name '{column}'")]
    DuplicateColumnName { table: String, column: String },

    #[error("Table '{0}' has more than one AutoId column")]
    MultipleAutoIdColumns(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid condition set: {0}")]
    InvalidConditionSet(String),

    #[error("{0}: cannot use NULL for AutoId column")]
    AutoIdRequired(String),

    #[error("SELECT DISTINCT column '{distinct}' must match ORDER BY column '{order_by}'")]
    DistinctOrderMismatch { distinct: String, order_by: String },

    #[error("Column '{column}': cannot parse '{input}' as {expected}")]
    Parse {
        column: String,
        input: String,
        expected: &'static str,
    },

    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("Row for table '{table}' has no value for column '{column}'")]
    MissingValue { table: String, column: String },

    #[error("Table '{0}' does not have an AutoId column")]
    NoAutoIdColumn(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown dialect: '{0}'")]
    UnknownDialect(String),

    #[error("Connection is read only: {0}")]
    ReadOnly(String),

    #[error("{operation}: expected {expected} row(s), got {actual}")]
    UnexpectedRowCount {
        operation: &'static str,
        expected: &'static str,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
