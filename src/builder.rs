use crate::column::Column;
use crate::condition::{Condition, QueryColumn, SortSpec};
use crate::dialect::{AutoIdStrategy, Dialect};
use crate::error::{BinderError, Result};
use crate::schema::{Row, Table};
use crate::value::{Value, WireValue};

/// Parameter list of one statement, numbering placeholders as values are bound
#[derive(Debug, Clone)]
pub struct Params {
    dialect: Dialect,
    values: Vec<WireValue>,
}

impl Params {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Placeholder the next pushed value will be bound to
    pub fn next_placeholder(&self) -> String {
        self.dialect.placeholder(self.values.len() + 1)
    }

    pub fn push(&mut self, value: WireValue) {
        self.values.push(value);
    }

    /// Push `value` and return its placeholder
    pub fn bind(&mut self, value: WireValue) -> String {
        let placeholder = self.next_placeholder();
        self.values.push(value);
        placeholder
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<WireValue> {
        self.values
    }
}

/// Generated SQL text with its ordered parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<WireValue>,
}

impl Statement {
    fn new(sql: String, params: Params) -> Self {
        Self {
            sql,
            params: params.into_values(),
        }
    }
}

/// INSERT statement plus whether the AutoId column was left for the
/// database to assign
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub params: Vec<WireValue>,
    pub auto_id_omitted: bool,
}

fn where_sql(table: &Table, condition: Option<&Condition>, params: &mut Params) -> Result<String> {
    match condition {
        Some(condition) => {
            for comparison in condition.comparisons() {
                ensure_member(table, comparison.column())?;
            }
            Ok(format!(" WHERE {}", condition.to_sql(params)?))
        }
        None => Ok(String::new()),
    }
}

fn column_list(table: &Table) -> String {
    table
        .columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(",")
}

fn ensure_member(table: &Table, column: &Column) -> Result<()> {
    match table.column(column.name()) {
        Some(own) if own == column => Ok(()),
        _ => Err(BinderError::UnknownColumn {
            table: table.name().to_string(),
            column: column.name().to_string(),
        }),
    }
}

/// INSERT of one row
#[derive(Debug, Clone)]
pub struct InsertBuilder<'a> {
    table: &'a Table,
    row: &'a Row,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(table: &'a Table, row: &'a Row) -> Self {
        Self { table, row }
    }

    pub fn build(self, dialect: Dialect) -> Result<InsertStatement> {
        let mut params = Params::new(dialect);
        let mut names = Vec::new();
        let mut slots = Vec::new();
        let mut auto_id_omitted = false;

        for column in self.table.columns() {
            let value = self.table.value_of(self.row, column)?;
            column.validate(value)?;

            if value.is_null() {
                if column.is_auto_id() {
                    auto_id_omitted = true;
                    continue;
                }
                names.push(column.name());
                slots.push("NULL".to_string());
            } else {
                names.push(column.name());
                slots.push(params.bind(column.to_wire(value)?));
            }
        }

        let mut sql = if names.is_empty() {
            match dialect {
                Dialect::Mysql => format!("INSERT INTO {} () VALUES ()", self.table.name()),
                _ => format!("INSERT INTO {} DEFAULT VALUES", self.table.name()),
            }
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table.name(),
                names.join(","),
                slots.join(",")
            )
        };

        if auto_id_omitted && dialect.auto_id_strategy() == AutoIdStrategy::Returning {
            if let Some(auto_id) = self.table.auto_id_column() {
                sql.push_str(" RETURNING ");
                sql.push_str(auto_id.name());
            }
        }

        Ok(InsertStatement {
            sql,
            params: params.into_values(),
            auto_id_omitted,
        })
    }
}

/// UPDATE of every column, row-wide or by condition
#[derive(Debug, Clone)]
pub struct UpdateBuilder<'a> {
    table: &'a Table,
    row: &'a Row,
    where_clause: Option<Condition>,
}

impl<'a> UpdateBuilder<'a> {
    /// UPDATE setting every column, AutoId included
    pub fn new(table: &'a Table, row: &'a Row) -> Self {
        Self {
            table,
            row,
            where_clause: None,
        }
    }

    /// UPDATE of the row whose AutoId matches the row's own AutoId value
    pub fn by_id(table: &'a Table, row: &'a Row) -> UpdateByIdBuilder<'a> {
        UpdateByIdBuilder { table, row }
    }

    pub fn where_clause(mut self, condition: impl Into<Condition>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    pub fn build(self, dialect: Dialect) -> Result<Statement> {
        let mut params = Params::new(dialect);
        let mut assignments = Vec::new();

        for column in self.table.columns() {
            let value = self.table.value_of(self.row, column)?;
            column.validate(value)?;
            if value.is_null() {
                if column.is_auto_id() {
                    return Err(BinderError::AutoIdRequired("update()".to_string()));
                }
                assignments.push(format!("{}=NULL", column.name()));
            } else {
                let placeholder = params.bind(column.to_wire(value)?);
                assignments.push(format!("{}={}", column.name(), placeholder));
            }
        }

        let mut sql = format!("UPDATE {} SET {}", self.table.name(), assignments.join(","));
        sql.push_str(&where_sql(self.table, self.where_clause.as_ref(), &mut params)?);
        Ok(Statement::new(sql, params))
    }
}

/// UPDATE of the non-id columns, keyed on the row's AutoId.
///
/// The id is the only filter, so there is no WHERE condition setter:
///
/// ```compile_fail
/// use binder::{Column, Table, UpdateBuilder};
///
/// let foo = Table::new("foo", vec![Column::auto_id("foo_id"), Column::integer("i1")]).unwrap();
/// let row = foo.build([("foo_id", 1), ("i1", 2)]).unwrap();
/// let cond = foo.q("i1").unwrap().equals(3).unwrap();
/// UpdateBuilder::by_id(&foo, &row).where_clause(cond);
/// ```
#[derive(Debug, Clone)]
pub struct UpdateByIdBuilder<'a> {
    table: &'a Table,
    row: &'a Row,
}

impl<'a> UpdateByIdBuilder<'a> {
    pub fn build(self, dialect: Dialect) -> Result<Statement> {
        let auto_id = self
            .table
            .auto_id_column()
            .ok_or_else(|| BinderError::NoAutoIdColumn(self.table.name().to_string()))?;

        let mut params = Params::new(dialect);
        let mut assignments = Vec::new();
        let mut row_id = None;

        for column in self.table.columns() {
            let value = self.table.value_of(self.row, column)?;
            column.validate(value)?;
            if column.is_auto_id() {
                if value.is_null() {
                    return Err(BinderError::AutoIdRequired("update_by_id()".to_string()));
                }
                row_id = Some(column.to_wire(value)?);
            } else if value.is_null() {
                assignments.push(format!("{}=NULL", column.name()));
            } else {
                let placeholder = params.bind(column.to_wire(value)?);
                assignments.push(format!("{}={}", column.name(), placeholder));
            }
        }

        let row_id =
            row_id.ok_or_else(|| BinderError::AutoIdRequired("update_by_id()".to_string()))?;
        if assignments.is_empty() {
            return Err(BinderError::UnsupportedOperation(format!(
                "update_by_id(): table '{}' has no columns besides its AutoId",
                self.table.name()
            )));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}={}",
            self.table.name(),
            assignments.join(","),
            auto_id.name(),
            params.bind(row_id)
        );
        Ok(Statement::new(sql, params))
    }
}

/// DELETE by condition
#[derive(Debug, Clone)]
pub struct DeleteBuilder<'a> {
    table: &'a Table,
    where_clause: Option<Condition>,
}

impl<'a> DeleteBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            where_clause: None,
        }
    }

    pub fn by_id(table: &'a Table, row_id: impl Into<Value>) -> DeleteByIdBuilder<'a> {
        DeleteByIdBuilder {
            table,
            row_id: row_id.into(),
        }
    }

    /// Add WHERE condition; without one every row is deleted
    pub fn where_clause(mut self, condition: impl Into<Condition>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    pub fn build(self, dialect: Dialect) -> Result<Statement> {
        let mut params = Params::new(dialect);
        let sql = format!(
            "DELETE FROM {}{}",
            self.table.name(),
            where_sql(self.table, self.where_clause.as_ref(), &mut params)?
        );
        Ok(Statement::new(sql, params))
    }
}

/// DELETE of the row with a given AutoId value.
///
/// ```compile_fail
/// use binder::{Column, DeleteBuilder, Table};
///
/// let foo = Table::new("foo", vec![Column::auto_id("foo_id"), Column::integer("i1")]).unwrap();
/// let cond = foo.q("i1").unwrap().equals(3).unwrap();
/// DeleteBuilder::by_id(&foo, 1).where_clause(cond);
/// ```
#[derive(Debug, Clone)]
pub struct DeleteByIdBuilder<'a> {
    table: &'a Table,
    row_id: Value,
}

impl<'a> DeleteByIdBuilder<'a> {
    pub fn build(self, dialect: Dialect) -> Result<Statement> {
        let auto_id = self
            .table
            .auto_id_column()
            .ok_or_else(|| BinderError::NoAutoIdColumn(self.table.name().to_string()))?;
        if self.row_id.is_null() {
            return Err(BinderError::AutoIdRequired("delete_by_id()".to_string()));
        }
        auto_id.validate(&self.row_id)?;

        let mut params = Params::new(dialect);
        let placeholder = params.bind(auto_id.to_wire(&self.row_id)?);
        let sql = format!(
            "DELETE FROM {} WHERE {}={}",
            self.table.name(),
            auto_id.name(),
            placeholder
        );
        Ok(Statement::new(sql, params))
    }
}

/// SELECT of all columns, or SELECT DISTINCT of one
#[derive(Debug, Clone)]
pub struct SelectBuilder<'a> {
    table: &'a Table,
    distinct: Option<QueryColumn>,
    where_clause: Option<Condition>,
    order_by: Option<SortSpec>,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            distinct: None,
            where_clause: None,
            order_by: None,
        }
    }

    /// Select only the distinct values of one column
    pub fn distinct(mut self, column: &QueryColumn) -> Self {
        self.distinct = Some(column.clone());
        self
    }

    pub fn where_clause(mut self, condition: impl Into<Condition>) -> Self {
        self.where_clause = Some(condition.into());
        self
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.order_by = Some(sort);
        self
    }

    pub fn build(self, dialect: Dialect) -> Result<Statement> {
        let mut params = Params::new(dialect);

        let mut sql = match &self.distinct {
            Some(distinct) => {
                ensure_member(self.table, distinct.column())?;
                format!(
                    "SELECT DISTINCT {} FROM {}",
                    distinct.column().name(),
                    self.table.name()
                )
            }
            None => format!("SELECT {} FROM {}", column_list(self.table), self.table.name()),
        };

        sql.push_str(&where_sql(self.table, self.where_clause.as_ref(), &mut params)?);

        if let Some(sort) = &self.order_by {
            ensure_member(self.table, sort.column())?;
            if let Some(distinct) = &self.distinct {
                if distinct.column().name() != sort.column().name() {
                    return Err(BinderError::DistinctOrderMismatch {
                        distinct: distinct.column().name().to_string(),
                        order_by: sort.column().name().to_string(),
                    });
                }
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&sort.to_sql(dialect));
        }

        Ok(Statement::new(sql, params))
    }
}
