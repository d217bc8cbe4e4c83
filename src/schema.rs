use crate::column::Column;
use crate::condition::QueryColumn;
use crate::dialect::Dialect;
use crate::error::{BinderError, Result};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One row of a table, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub columns: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns.get(key)
    }

    /// True when the column is absent or NULL
    pub fn is_null(&self, key: &str) -> bool {
        self.columns.get(key).map(Value::is_null).unwrap_or(true)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.columns.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.columns.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.columns.get(key).and_then(Value::as_bool)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.columns
            .get(key)
            .and_then(|v| v.as_str().map(String::from))
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.columns.get(key).and_then(Value::as_date)
    }

    pub fn get_datetime(&self, key: &str) -> Option<NaiveDateTime> {
        self.columns.get(key).and_then(Value::as_datetime)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Table definition
///
/// Columns keep their declared order, which is the column order of every
/// generated statement. The query bindings (one [`QueryColumn`] per column)
/// are built once here.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<Arc<Column>>,
    auto_id: Option<usize>,
    bindings: HashMap<String, QueryColumn>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();

        if columns.is_empty() {
            return Err(BinderError::Schema(format!(
                "Table '{}' must have at least one column",
                name
            )));
        }

        let mut seen = HashSet::new();
        let mut auto_id = None;

        for (index, column) in columns.iter().enumerate() {
            if !seen.insert(column.name().to_string()) {
                return Err(BinderError::DuplicateColumnName {
                    table: name,
                    column: column.name().to_string(),
                });
            }

            if column.is_auto_id() {
                if auto_id.is_some() {
                    return Err(BinderError::MultipleAutoIdColumns(name));
                }
                auto_id = Some(index);
            }

            if let Some(text) = column.text_options() {
                if text.max_length == 0 {
                    return Err(BinderError::Schema(format!(
                        "Table '{}': text column '{}' must have max length > 0",
                        name,
                        column.name()
                    )));
                }
            }
        }

        let columns: Vec<Arc<Column>> = columns.into_iter().map(Arc::new).collect();
        let bindings = columns
            .iter()
            .map(|c| (c.name().to_string(), QueryColumn::new(c.clone())))
            .collect();

        Ok(Self {
            name,
            columns,
            auto_id,
            bindings,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn auto_id_column(&self) -> Option<&Column> {
        self.auto_id.map(|index| self.columns[index].as_ref())
    }

    /// Query binding for a column, by name
    pub fn q(&self, column: &str) -> Result<&QueryColumn> {
        self.bindings
            .get(column)
            .ok_or_else(|| BinderError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Query bindings in column order
    pub fn query_columns(&self) -> impl Iterator<Item = &QueryColumn> + '_ {
        self.columns
            .iter()
            .filter_map(move |c| self.bindings.get(c.name()))
    }

    /// Build a row from typed values, filling absent columns with their
    /// defaults. Keys that name no column are ignored.
    pub fn build<I, K, V>(&self, overrides: I) -> Result<Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut overrides = collect_overrides(overrides);
        let mut row = Row::new();

        for column in &self.columns {
            let value = overrides
                .remove(column.name())
                .unwrap_or_else(|| column.default_value().clone());
            let value = canonical(value);
            column.validate(&value)?;
            row.set(column.name(), value);
        }

        Ok(row)
    }

    /// Like [`Table::build`], but text values are parsed with each column's
    /// string rules and an empty string stands for "use the default".
    pub fn parse_from_strings<I, K, V>(&self, overrides: I) -> Result<Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut overrides = collect_overrides(overrides);
        let mut row = Row::new();

        for column in &self.columns {
            let value = match overrides.remove(column.name()) {
                Some(Value::Text(text)) if text.is_empty() => column.default_value().clone(),
                Some(Value::Text(text)) => column.parse_str(&text)?,
                Some(other) => other,
                None => column.default_value().clone(),
            };
            let value = canonical(value);
            column.validate(&value)?;
            row.set(column.name(), value);
        }

        Ok(row)
    }

    /// Re-validate every column of `row`. Returns true when any column holds
    /// NULL, e.g. an AutoId still waiting for its insert.
    pub fn validate_row(&self, row: &Row) -> Result<bool> {
        let mut any_null = false;

        for column in &self.columns {
            let value = self.value_of(row, column)?;
            column.validate(value)?;
            if value.is_null() {
                any_null = true;
            }
        }

        Ok(any_null)
    }

    pub(crate) fn value_of<'r>(&self, row: &'r Row, column: &Column) -> Result<&'r Value> {
        row.get(column.name())
            .ok_or_else(|| BinderError::MissingValue {
                table: self.name.clone(),
                column: column.name().to_string(),
            })
    }

    /// Generate CREATE TABLE SQL
    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let column_defs: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let mut def = format!("{} {}", col.name(), dialect.column_type(col.kind()));

                if let Some(text) = col.text_options() {
                    if dialect.bounds_text_length() {
                        def.push_str(&format!("({})", text.max_length));
                    }
                    if let Some(charset) = dialect.text_charset() {
                        def.push_str(&format!(" CHARACTER SET {}", charset));
                    }
                }

                if !col.is_nullable() {
                    def.push_str(" NOT NULL");
                }

                if let Some(text) = col.text_options() {
                    if text.unique {
                        def.push_str(" UNIQUE");
                    }
                    if text.collate_nocase && !dialect.collates_in_order_by() {
                        def.push_str(&format!(" COLLATE {}", dialect.nocase_collation()));
                    }
                }

                def
            })
            .collect();

        let mut sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.name,
            column_defs.join(",\n    ")
        );

        if let Some(suffix) = dialect.table_suffix() {
            sql.push(' ');
            sql.push_str(suffix);
        }

        sql
    }

    /// Generate DROP TABLE SQL
    pub fn drop_table_sql(&self, if_exists: bool) -> String {
        if if_exists {
            format!("DROP TABLE IF EXISTS {}", self.name)
        } else {
            format!("DROP TABLE {}", self.name)
        }
    }
}

fn collect_overrides<I, K, V>(overrides: I) -> HashMap<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    overrides
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// DateTimeUTC values are kept at whole-second precision.
fn canonical(value: Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::DateTime(dt.with_nanosecond(0).unwrap_or(dt)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::TextOptions;

    fn foo() -> Table {
        Table::new(
            "foo",
            vec![
                Column::auto_id("foo_id"),
                Column::integer("i1"),
                Column::text_with("s1", TextOptions::new(10).collate_nocase()),
                Column::date("d1"),
            ],
        )
        .unwrap()
    }

    fn bar() -> Table {
        Table::new(
            "bar",
            vec![
                Column::nullable_integer("bi"),
                Column::text("bs", 10),
                Column::date("bd"),
                Column::datetime_utc("bdt1"),
                Column::boolean("bb"),
            ],
        )
        .unwrap()
    }

    fn baz() -> Table {
        Table::new(
            "baz",
            vec![
                Column::auto_id("baz_id"),
                Column::float("f3"),
                Column::text_with("s3", TextOptions::new(5).unique()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_column_name() {
        let err = Table::new("t", vec![Column::integer("a"), Column::text("a", 3)]).unwrap_err();
        assert!(matches!(err, BinderError::DuplicateColumnName { ref column, .. } if column == "a"));
        assert_eq!(err.to_string(), "Table 't' has more than one column with name 'a'");
    }

    #[test]
    fn test_multiple_auto_id() {
        let err = Table::new("t", vec![Column::auto_id("a"), Column::auto_id("b")]).unwrap_err();
        assert!(matches!(err, BinderError::MultipleAutoIdColumns(ref t) if t == "t"));
    }

    #[test]
    fn test_zero_length_text() {
        assert!(matches!(
            Table::new("t", vec![Column::text("s", 0)]),
            Err(BinderError::Schema(_))
        ));
    }

    #[test]
    fn test_auto_id_column() {
        assert_eq!(foo().auto_id_column().map(Column::name), Some("foo_id"));
        assert!(bar().auto_id_column().is_none());
    }

    #[test]
    fn test_bindings_lookup() {
        let table = foo();
        assert_eq!(table.q("i1").unwrap().column().name(), "i1");
        assert!(matches!(table.q("nope"), Err(BinderError::UnknownColumn { .. })));

        let names: Vec<&str> = table.query_columns().map(|q| q.column().name()).collect();
        assert_eq!(names, vec!["foo_id", "i1", "s1", "d1"]);
    }

    #[test]
    fn test_build() {
        let table = foo();
        let row = table
            .build([("i1", Value::from(101)), ("s1", Value::from("alpha"))])
            .unwrap();

        assert!(row.is_null("foo_id"));
        assert_eq!(row.get_i64("i1"), Some(101));
        assert_eq!(row.get_string("s1"), Some("alpha".to_string()));
        assert!(row.is_null("d1"));
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn test_build_defaults() {
        let table = bar();
        let row = table.build(Vec::<(&str, Value)>::new()).unwrap();

        for column in table.columns() {
            assert_eq!(row.get(column.name()), Some(column.default_value()));
        }
    }

    #[test]
    fn test_build_ignores_unknown_keys() {
        let row = foo().build([("zzz", Value::from(1))]).unwrap();
        assert!(row.get("zzz").is_none());
    }

    #[test]
    fn test_build_rejects_bad_values() {
        let table = foo();
        assert!(matches!(
            table.build([("i1", Value::from("xyz"))]),
            Err(BinderError::TypeMismatch { .. })
        ));
        assert!(matches!(
            table.build([("i1", Value::Null)]),
            Err(BinderError::NullNotAllowed(_))
        ));
        assert!(matches!(
            table.build([("s1", Value::from("abcdefghijk"))]),
            Err(BinderError::ValueTooLong { .. })
        ));
    }

    #[test]
    fn test_build_truncates_datetime() {
        let dt = NaiveDate::from_ymd_opt(2006, 4, 13)
            .unwrap()
            .and_hms_milli_opt(23, 58, 14, 750)
            .unwrap();
        let row = bar().build([("bdt1", Value::from(dt))]).unwrap();
        assert_eq!(row.get_datetime("bdt1").unwrap().nanosecond(), 0);
    }

    #[test]
    fn test_parse_from_strings() {
        let table = bar();
        let row = table
            .parse_from_strings([
                ("bi", "5"),
                ("bs", "abc"),
                ("bd", "2006-03-21"),
                ("bdt1", "2006-04-13T23:58:14Z"),
                ("bb", "1"),
            ])
            .unwrap();

        assert_eq!(row.get_i64("bi"), Some(5));
        assert_eq!(row.get_string("bs"), Some("abc".to_string()));
        assert_eq!(row.get_date("bd"), NaiveDate::from_ymd_opt(2006, 3, 21));
        assert_eq!(row.get_bool("bb"), Some(true));
    }

    #[test]
    fn test_parse_from_strings_empty_uses_default() {
        let table = foo();
        let row = table
            .parse_from_strings([("foo_id", ""), ("i1", ""), ("s1", ""), ("d1", "")])
            .unwrap();
        assert_eq!(row, table.build(Vec::<(&str, Value)>::new()).unwrap());
    }

    #[test]
    fn test_parse_from_strings_matches_build() {
        let table = baz();
        let parsed = table.parse_from_strings(Vec::<(&str, Value)>::new()).unwrap();
        let built = table.build(Vec::<(&str, Value)>::new()).unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_parse_from_strings_passes_typed_values() {
        let row = foo()
            .parse_from_strings([("i1", Value::from(7)), ("s1", Value::from("12"))])
            .unwrap();
        assert_eq!(row.get_i64("i1"), Some(7));
        assert_eq!(row.get_string("s1"), Some("12".to_string()));
    }

    #[test]
    fn test_validate_row() {
        let table = foo();
        let mut row = table.build([("foo_id", Value::from(3))]).unwrap();
        assert!(table.validate_row(&row).unwrap());

        row.set("d1", NaiveDate::from_ymd_opt(2006, 1, 1).unwrap());
        assert!(!table.validate_row(&row).unwrap());

        row.set("i1", "bad");
        assert!(table.validate_row(&row).is_err());

        row.columns.remove("i1");
        assert!(matches!(
            table.validate_row(&row),
            Err(BinderError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_create_table_sqlite() {
        assert_eq!(
            foo().create_table_sql(Dialect::Sqlite),
            "CREATE TABLE foo (\n    foo_id INTEGER PRIMARY KEY,\n    i1 INTEGER NOT NULL,\n    s1 TEXT NOT NULL COLLATE NOCASE,\n    d1 TEXT\n)"
        );
        assert_eq!(
            bar().create_table_sql(Dialect::Sqlite),
            "CREATE TABLE bar (\n    bi INTEGER,\n    bs TEXT NOT NULL,\n    bd TEXT,\n    bdt1 TEXT,\n    bb INTEGER NOT NULL\n)"
        );
        assert_eq!(
            baz().create_table_sql(Dialect::Sqlite),
            "CREATE TABLE baz (\n    baz_id INTEGER PRIMARY KEY,\n    f3 REAL NOT NULL,\n    s3 TEXT NOT NULL UNIQUE\n)"
        );
    }

    #[test]
    fn test_create_table_postgres() {
        assert_eq!(
            foo().create_table_sql(Dialect::Postgres),
            "CREATE TABLE foo (\n    foo_id SERIAL PRIMARY KEY,\n    i1 BIGINT NOT NULL,\n    s1 VARCHAR(10) NOT NULL,\n    d1 DATE\n)"
        );
        assert_eq!(
            bar().create_table_sql(Dialect::Postgres),
            "CREATE TABLE bar (\n    bi BIGINT,\n    bs VARCHAR(10) NOT NULL,\n    bd DATE,\n    bdt1 TIMESTAMP,\n    bb BOOLEAN NOT NULL\n)"
        );
        assert_eq!(
            baz().create_table_sql(Dialect::Postgres),
            "CREATE TABLE baz (\n    baz_id SERIAL PRIMARY KEY,\n    f3 DOUBLE PRECISION NOT NULL,\n    s3 VARCHAR(5) NOT NULL UNIQUE\n)"
        );
    }

    #[test]
    fn test_create_table_mysql() {
        let ddl = foo().create_table_sql(Dialect::Mysql);
        assert!(ddl.contains("foo_id INT AUTO_INCREMENT PRIMARY KEY,"));
        assert!(ddl.contains("s1 VARCHAR(10) CHARACTER SET utf8 NOT NULL COLLATE utf8_general_ci"));
        assert!(ddl.ends_with(") ENGINE=INNODB"));
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(foo().drop_table_sql(false), "DROP TABLE foo");
        assert_eq!(bar().drop_table_sql(true), "DROP TABLE IF EXISTS bar");
    }
}
