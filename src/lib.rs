//! binder - typed tables, conditions and SQL generation
//!
//! binder maps rows of plain values onto relational tables without an ORM
//! runtime. Tables are declared once as a list of typed columns; rows are
//! validated against them, and statements are generated as SQL text plus an
//! ordered list of driver-ready parameters.
//!
//! # Architecture
//!
//! - **Columns**: a closed set of kinds (AutoId, Integer, Float, Boolean, Text,
//!   Date, DateTimeUTC), each with its own validation and wire conversion
//! - **Tables**: ordered columns, row construction and DDL
//! - **Conditions**: comparisons built from a table's query bindings, combined
//!   with flat AND/OR
//! - **SQL Generation**: INSERT, UPDATE, DELETE and SELECT builders that are
//!   pure and take the dialect explicitly
//! - **Dialects**: SQLite, Postgres and MySQL type names, placeholders,
//!   collation and operator rendering
//! - **Connections**: an async layer that runs the generated statements on a
//!   [`DatabaseBackend`]
//!
//! # Example
//!
//! ```rust
//! use binder::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let foo = Table::new(
//!         "foo",
//!         vec![
//!             Column::auto_id("foo_id"),
//!             Column::integer("i1"),
//!             Column::text("s1", 10),
//!         ],
//!     )?;
//!
//!     let row = foo.build([("i1", Value::from(101)), ("s1", Value::from("alpha"))])?;
//!     let insert = InsertBuilder::new(&foo, &row).build(Dialect::Sqlite)?;
//!     assert_eq!(insert.sql, "INSERT INTO foo (i1,s1) VALUES (?,?)");
//!     assert!(insert.auto_id_omitted);
//!
//!     let select = SelectBuilder::new(&foo)
//!         .where_clause(foo.q("foo_id")?.equals(2)?)
//!         .build(Dialect::Postgres)?;
//!     assert_eq!(select.sql, "SELECT foo_id,i1,s1 FROM foo WHERE foo_id=$1");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backend Support
//!
//! The SQLite executor is enabled by the default `sqlite` feature:
//!
//! ```toml
//! [dependencies]
//! binder = { version = "0.5", features = ["sqlite"] }
//! ```
//!
//! Other databases plug in by implementing [`DatabaseBackend`]; SQL for them
//! is generated by choosing the matching [`Dialect`].

pub mod backend;
pub mod builder;
pub mod column;
pub mod condition;
pub mod config;
pub mod conn;
pub mod dialect;
pub mod error;
pub mod schema;
pub mod value;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use backend::{DatabaseBackend, ExecuteResult, WireRow};
pub use builder::{
    DeleteBuilder, DeleteByIdBuilder, InsertBuilder, InsertStatement, Params, SelectBuilder,
    Statement, UpdateBuilder, UpdateByIdBuilder,
};
pub use column::{Column, ColumnKind, TextOptions};
pub use condition::{Comparison, Condition, Operator, QueryColumn, SortSpec};
pub use config::ConnectionConfig;
pub use conn::{Connection, SelectOne};
pub use dialect::{AutoIdStrategy, DatePart, Dialect};
pub use error::{BinderError, Result};
pub use schema::{Row, Table};
pub use value::{Value, WireValue};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::DatabaseBackend;
    pub use crate::builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
    pub use crate::column::{Column, TextOptions};
    pub use crate::condition::{Condition, QueryColumn, SortSpec};
    pub use crate::config::ConnectionConfig;
    pub use crate::conn::{Connection, SelectOne};
    pub use crate::dialect::Dialect;
    pub use crate::error::{BinderError, Result};
    pub use crate::query_columns;
    pub use crate::schema::{Row, Table};
    pub use crate::value::Value;

    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::SqliteBackend;
}
