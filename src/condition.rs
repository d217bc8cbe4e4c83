use crate::builder::Params;
use crate::column::{Column, ColumnKind};
use crate::dialect::{DatePart, Dialect};
use crate::error::{BinderError, Result};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Comparison operators for WHERE clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Year,
    YearMonth,
    Month,
    Day,
    Like,
    ILike,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Year => write!(f, "YEAR"),
            Operator::YearMonth => write!(f, "YEAR_MONTH"),
            Operator::Month => write!(f, "MONTH"),
            Operator::Day => write!(f, "DAY"),
            Operator::Like => write!(f, "LIKE"),
            Operator::ILike => write!(f, "ILIKE"),
        }
    }
}

/// A single `(column, operator, operand)` test
///
/// The operand is validated against the column when the comparison is
/// built. Operator/kind/dialect restrictions are checked when it is
/// rendered, since they depend on the dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    column: Arc<Column>,
    op: Operator,
    operand: Value,
}

impl Comparison {
    fn new(column: Arc<Column>, op: Operator, operand: Value) -> Result<Self> {
        column.validate(&operand)?;
        if column.is_auto_id() && operand.is_null() {
            return Err(BinderError::AutoIdRequired(format!(
                "condition on '{}'",
                column.name()
            )));
        }
        Ok(Self {
            column,
            op,
            operand,
        })
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    fn unsupported(&self, reason: &str) -> BinderError {
        BinderError::UnsupportedOperation(format!("Op '{}' {}", self.op, reason))
    }

    /// Render as SQL, appending any bound value to `params`
    pub fn to_sql(&self, params: &mut Params) -> Result<String> {
        let name = self.column.name();
        let kind = self.column.kind();

        match self.op {
            Operator::Eq => {
                if self.operand.is_null() {
                    Ok(format!("{} is NULL", name))
                } else {
                    let placeholder = params.bind(self.column.to_wire(&self.operand)?);
                    Ok(format!("{}={}", name, placeholder))
                }
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                if matches!(kind, ColumnKind::Boolean | ColumnKind::DateTimeUtc) {
                    return Err(self.unsupported(&format!("does not support {} columns", kind)));
                }
                if self.operand.is_null() {
                    return Err(self.unsupported("does not support NULL"));
                }
                let placeholder = params.bind(self.column.to_wire(&self.operand)?);
                Ok(format!("{}{}{}", name, self.op, placeholder))
            }
            Operator::Year | Operator::YearMonth | Operator::Month | Operator::Day => {
                if kind != ColumnKind::Date {
                    return Err(self.unsupported("can only be used for Date columns"));
                }
                let date = match &self.operand {
                    Value::Date(date) => *date,
                    _ => return Err(self.unsupported("cannot use NULL")),
                };
                let part = match self.op {
                    Operator::Year => DatePart::Year,
                    Operator::YearMonth => DatePart::YearMonth,
                    Operator::Month => DatePart::Month,
                    _ => DatePart::Day,
                };
                let placeholder = params.next_placeholder();
                let (sql, value) =
                    params
                        .dialect()
                        .date_part_condition(part, name, date, &placeholder);
                params.push(value);
                Ok(sql)
            }
            Operator::Like | Operator::ILike => {
                if kind != ColumnKind::Text {
                    return Err(self.unsupported("can only be used for Text columns"));
                }
                if self.operand.is_null() {
                    return Err(self.unsupported("cannot use NULL"));
                }
                let op = params.dialect().like_operator(self.op == Operator::Like)?;
                let placeholder = params.bind(self.column.to_wire(&self.operand)?);
                Ok(format!("{} {} {}", name, op, placeholder))
            }
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.column.name(),
            self.op,
            self.column.to_display(&self.operand)
        )
    }
}

/// WHERE condition: one comparison, or a flat AND/OR of two or more
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(Comparison),
    And(Vec<Comparison>),
    Or(Vec<Comparison>),
}

impl Condition {
    pub fn and(comparisons: impl IntoIterator<Item = Comparison>) -> Result<Self> {
        let comparisons: Vec<Comparison> = comparisons.into_iter().collect();
        if comparisons.len() < 2 {
            return Err(BinderError::InvalidConditionSet(format!(
                "AND must have at least 2 conditions, got {}",
                comparisons.len()
            )));
        }
        Ok(Condition::And(comparisons))
    }

    pub fn or(comparisons: impl IntoIterator<Item = Comparison>) -> Result<Self> {
        let comparisons: Vec<Comparison> = comparisons.into_iter().collect();
        if comparisons.len() < 2 {
            return Err(BinderError::InvalidConditionSet(format!(
                "OR must have at least 2 conditions, got {}",
                comparisons.len()
            )));
        }
        Ok(Condition::Or(comparisons))
    }

    pub fn comparisons(&self) -> &[Comparison] {
        match self {
            Condition::Compare(c) => std::slice::from_ref(c),
            Condition::And(cs) | Condition::Or(cs) => cs,
        }
    }

    fn combiner(&self) -> &'static str {
        match self {
            Condition::Or(_) => " OR ",
            _ => " AND ",
        }
    }

    /// Render the WHERE body (without the keyword)
    pub fn to_sql(&self, params: &mut Params) -> Result<String> {
        let parts = self
            .comparisons()
            .iter()
            .map(|c| c.to_sql(params))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(self.combiner()))
    }
}

impl From<Comparison> for Condition {
    fn from(comparison: Comparison) -> Self {
        Condition::Compare(comparison)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.comparisons().iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(self.combiner()))
    }
}

/// ORDER BY on a single column
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    column: Arc<Column>,
    ascending: bool,
}

impl SortSpec {
    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = self.column.name().to_string();
        if self.column.is_collate_nocase() && dialect.collates_in_order_by() {
            sql.push_str(" COLLATE ");
            sql.push_str(dialect.nocase_collation());
        }
        sql.push_str(if self.ascending { " ASC" } else { " DESC" });
        sql
    }
}

/// Query binding for one table column
#[derive(Debug, Clone)]
pub struct QueryColumn {
    column: Arc<Column>,
}

impl QueryColumn {
    pub(crate) fn new(column: Arc<Column>) -> Self {
        Self { column }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    fn compare(&self, op: Operator, operand: impl Into<Value>) -> Result<Comparison> {
        Comparison::new(self.column.clone(), op, operand.into())
    }

    /// `col = value`, or `col is NULL` for a NULL operand
    pub fn equals(&self, operand: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Eq, operand)
    }

    pub fn is_null(&self) -> Result<Comparison> {
        self.compare(Operator::Eq, Value::Null)
    }

    pub fn greater_than(&self, operand: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Gt, operand)
    }

    pub fn greater_or_equal(&self, operand: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Ge, operand)
    }

    pub fn less_than(&self, operand: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Lt, operand)
    }

    pub fn less_or_equal(&self, operand: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Le, operand)
    }

    /// Same year as `date`
    pub fn year(&self, date: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Year, date)
    }

    /// Same year and month as `date`
    pub fn year_month(&self, date: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::YearMonth, date)
    }

    /// Same month (of any year) as `date`
    pub fn month(&self, date: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Month, date)
    }

    /// Same day of month as `date`
    pub fn day(&self, date: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Day, date)
    }

    /// Case-sensitive pattern match
    pub fn like(&self, pattern: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::Like, pattern)
    }

    /// Case-insensitive pattern match
    pub fn ilike(&self, pattern: impl Into<Value>) -> Result<Comparison> {
        self.compare(Operator::ILike, pattern)
    }

    pub fn asc(&self) -> SortSpec {
        SortSpec {
            column: self.column.clone(),
            ascending: true,
        }
    }

    pub fn desc(&self) -> SortSpec {
        SortSpec {
            column: self.column.clone(),
            ascending: false,
        }
    }
}

/// Declare a struct of named query bindings for a table.
///
/// ```
/// use binder::{query_columns, Column, Table};
///
/// query_columns! {
///     pub struct FooColumns { foo_id, i1 }
/// }
///
/// let foo = Table::new("foo", vec![Column::auto_id("foo_id"), Column::integer("i1")]).unwrap();
/// let q = FooColumns::bind(&foo).unwrap();
/// let cond = q.i1.greater_than(3).unwrap();
/// assert_eq!(cond.to_string(), "i1 > 3");
/// ```
#[macro_export]
macro_rules! query_columns {
    ($(#[$meta:meta])* $vis:vis struct $name:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $(pub $field: $crate::condition::QueryColumn,)+
        }

        impl $name {
            /// Bind every field to the table column of the same name
            pub fn bind(table: &$crate::schema::Table) -> $crate::error::Result<Self> {
                Ok(Self {
                    $($field: table.q(stringify!($field))?.clone(),)+
                })
            }
        }
    };
}
