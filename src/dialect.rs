//! Per-backend SQL rules.
//!
//! Generators never consult global state: every call takes the [`Dialect`]
//! explicitly, and all backend differences (type names, placeholders,
//! collation, date-part extraction, LIKE semantics, auto-id retrieval) are
//! answered here.

use crate::column::ColumnKind;
use crate::error::{BinderError, Result};
use crate::value::WireValue;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported SQL backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    Mysql,
}

/// How the id of a row inserted with a NULL AutoId is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIdStrategy {
    /// Driver reports the last inserted id
    LastInsertId,
    /// Statement carries `RETURNING <col>` and yields the id as a row
    Returning,
}

/// Date component matched by YEAR/YEAR_MONTH/MONTH/DAY conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    YearMonth,
    Month,
    Day,
}

impl DatePart {
    pub fn name(&self) -> &'static str {
        match self {
            DatePart::Year => "YEAR",
            DatePart::YearMonth => "YEAR_MONTH",
            DatePart::Month => "MONTH",
            DatePart::Day => "DAY",
        }
    }
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
        }
    }

    /// Column type used in CREATE TABLE; AutoId includes its key syntax
    pub fn column_type(&self, kind: ColumnKind) -> &'static str {
        match (self, kind) {
            (Dialect::Sqlite, ColumnKind::AutoId) => "INTEGER PRIMARY KEY",
            (Dialect::Sqlite, ColumnKind::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnKind::Float) => "REAL",
            (Dialect::Sqlite, ColumnKind::Boolean) => "INTEGER",
            (Dialect::Sqlite, ColumnKind::Text) => "TEXT",
            (Dialect::Sqlite, ColumnKind::Date) => "TEXT",
            (Dialect::Sqlite, ColumnKind::DateTimeUtc) => "TEXT",

            (Dialect::Postgres, ColumnKind::AutoId) => "SERIAL PRIMARY KEY",
            (Dialect::Postgres, ColumnKind::Integer) => "BIGINT",
            (Dialect::Postgres, ColumnKind::Float) => "DOUBLE PRECISION",
            (Dialect::Postgres, ColumnKind::Boolean) => "BOOLEAN",
            (Dialect::Postgres, ColumnKind::Text) => "VARCHAR",
            (Dialect::Postgres, ColumnKind::Date) => "DATE",
            (Dialect::Postgres, ColumnKind::DateTimeUtc) => "TIMESTAMP",

            (Dialect::Mysql, ColumnKind::AutoId) => "INT AUTO_INCREMENT PRIMARY KEY",
            (Dialect::Mysql, ColumnKind::Integer) => "INT",
            (Dialect::Mysql, ColumnKind::Float) => "DOUBLE PRECISION",
            (Dialect::Mysql, ColumnKind::Boolean) => "BOOL",
            (Dialect::Mysql, ColumnKind::Text) => "VARCHAR",
            (Dialect::Mysql, ColumnKind::Date) => "DATE",
            (Dialect::Mysql, ColumnKind::DateTimeUtc) => "DATETIME",
        }
    }

    /// Whether text columns need an explicit `(maxLength)` bound
    pub fn bounds_text_length(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Character set clause for text columns
    pub fn text_charset(&self) -> Option<&'static str> {
        match self {
            Dialect::Mysql => Some("utf8"),
            _ => None,
        }
    }

    /// Table-level suffix appended after the column list
    pub fn table_suffix(&self) -> Option<&'static str> {
        match self {
            Dialect::Mysql => Some("ENGINE=INNODB"),
            _ => None,
        }
    }

    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
        }
    }

    /// Name of the case-insensitive collation
    pub fn nocase_collation(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "NOCASE",
            Dialect::Postgres => "\"und-x-icu\"",
            Dialect::Mysql => "utf8_general_ci",
        }
    }

    /// True when case-insensitive ordering is requested on ORDER BY rather
    /// than baked into the column definition
    pub fn collates_in_order_by(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    pub fn auto_id_strategy(&self) -> AutoIdStrategy {
        match self {
            Dialect::Postgres => AutoIdStrategy::Returning,
            Dialect::Sqlite | Dialect::Mysql => AutoIdStrategy::LastInsertId,
        }
    }

    pub fn has_native_date_parts(&self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Render a date-part comparison and the value bound to `placeholder`.
    ///
    /// Without native extraction the ISO text stored in the column is matched
    /// by prefix/suffix pattern, with month and day zero-padded. Year and month
    /// together compare as the integer `YYYYMM`; Postgres has no YEAR_MONTH
    /// field, so it formats the column with `TO_CHAR` instead.
    pub fn date_part_condition(
        &self,
        part: DatePart,
        column: &str,
        date: NaiveDate,
        placeholder: &str,
    ) -> (String, WireValue) {
        if *self == Dialect::Postgres && part == DatePart::YearMonth {
            (
                format!("TO_CHAR({}, 'YYYYMM')={}", column, placeholder),
                WireValue::Text(format!("{:04}{:02}", date.year(), date.month())),
            )
        } else if self.has_native_date_parts() {
            let value = match part {
                DatePart::Year => i64::from(date.year()),
                DatePart::YearMonth => i64::from(date.year()) * 100 + i64::from(date.month()),
                DatePart::Month => i64::from(date.month()),
                DatePart::Day => i64::from(date.day()),
            };
            (
                format!("EXTRACT({} FROM {})={}", part.name(), column, placeholder),
                WireValue::Integer(value),
            )
        } else {
            let pattern = match part {
                DatePart::Year => format!("{:04}-%", date.year()),
                DatePart::YearMonth => format!("{:04}-{:02}-%", date.year(), date.month()),
                DatePart::Month => format!("%-{:02}-%", date.month()),
                DatePart::Day => format!("%-{:02}", date.day()),
            };
            (format!("{} LIKE {}", column, placeholder), WireValue::Text(pattern))
        }
    }

    /// Operator text for a pattern match
    pub fn like_operator(&self, case_sensitive: bool) -> Result<&'static str> {
        match (self, case_sensitive) {
            (Dialect::Sqlite, true) => Err(BinderError::UnsupportedOperation(
                "LIKE is not supported by sqlite (its LIKE is case-insensitive), use ILIKE".to_string(),
            )),
            (Dialect::Sqlite, false) => Ok("LIKE"),
            (Dialect::Postgres, true) => Ok("LIKE"),
            (Dialect::Postgres, false) => Ok("ILIKE"),
            (Dialect::Mysql, true) => Ok("LIKE BINARY"),
            (Dialect::Mysql, false) => Ok("LIKE"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dialect {
    type Err = BinderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::Mysql),
            other => Err(BinderError::UnknownDialect(other.to_string())),
        }
    }
}
