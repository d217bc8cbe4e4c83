use crate::error::{BinderError, Result};
use crate::value::{Value, WireValue};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Semantic column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Surrogate integer primary key, assigned on insert when left NULL
    AutoId,
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    /// Naive UTC timestamp, whole seconds
    DateTimeUtc,
}

impl ColumnKind {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::AutoId => "AutoId",
            ColumnKind::Integer => "Integer",
            ColumnKind::Float => "Float",
            ColumnKind::Boolean => "Boolean",
            ColumnKind::Text => "Text",
            ColumnKind::Date => "Date",
            ColumnKind::DateTimeUtc => "DateTimeUTC",
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ColumnKind::AutoId | ColumnKind::Integer => "int",
            ColumnKind::Float => "float",
            ColumnKind::Boolean => "bool",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::DateTimeUtc => "datetime",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Attributes specific to text columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    pub max_length: usize,
    pub unique: bool,
    pub collate_nocase: bool,
}

impl TextOptions {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            unique: false,
            collate_nocase: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn collate_nocase(mut self) -> Self {
        self.collate_nocase = true;
        self
    }
}

/// Column definition
///
/// Immutable once built. Nullability and default value follow the kind:
/// Integer/Float/Boolean are NOT NULL unless built with a `nullable_*`
/// constructor, Text is always NOT NULL with an empty default, AutoId, Date
/// and DateTimeUTC are always nullable with a NULL default.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    default: Value,
    text: Option<TextOptions>,
}

impl Column {
    fn new(name: impl Into<String>, kind: ColumnKind, nullable: bool, default: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
            default,
            text: None,
        }
    }

    pub fn auto_id(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::AutoId, true, Value::Null)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer, false, Value::Integer(0))
    }

    pub fn nullable_integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer, true, Value::Null)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Float, false, Value::Float(0.0))
    }

    pub fn nullable_float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Float, true, Value::Null)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Boolean, false, Value::Boolean(false))
    }

    pub fn nullable_boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Boolean, true, Value::Null)
    }

    /// Text column with default options
    pub fn text(name: impl Into<String>, max_length: usize) -> Self {
        Self::text_with(name, TextOptions::new(max_length))
    }

    pub fn text_with(name: impl Into<String>, options: TextOptions) -> Self {
        let mut column = Self::new(name, ColumnKind::Text, false, Value::Text(String::new()));
        column.text = Some(options);
        column
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Date, true, Value::Null)
    }

    pub fn datetime_utc(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::DateTimeUtc, true, Value::Null)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_auto_id(&self) -> bool {
        self.kind == ColumnKind::AutoId
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn text_options(&self) -> Option<&TextOptions> {
        self.text.as_ref()
    }

    pub fn is_collate_nocase(&self) -> bool {
        self.text.map(|t| t.collate_nocase).unwrap_or(false)
    }

    fn mismatch(&self, found: &'static str) -> BinderError {
        BinderError::TypeMismatch {
            kind: self.kind.name(),
            column: self.name.clone(),
            expected: self.kind.expected(),
            found,
        }
    }

    fn parse_error(&self, input: &str, expected: &'static str) -> BinderError {
        BinderError::Parse {
            column: self.name.clone(),
            input: input.to_string(),
            expected,
        }
    }

    /// Check that `value` may be stored in this column
    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err(BinderError::NullNotAllowed(self.name.clone()))
            };
        }

        let matches = matches!(
            (self.kind, value),
            (ColumnKind::AutoId | ColumnKind::Integer, Value::Integer(_))
                | (ColumnKind::Float, Value::Float(_) | Value::Integer(_))
                | (ColumnKind::Boolean, Value::Boolean(_))
                | (ColumnKind::Text, Value::Text(_))
                | (ColumnKind::Date, Value::Date(_))
                | (ColumnKind::DateTimeUtc, Value::DateTime(_))
        );
        if !matches {
            return Err(self.mismatch(value.type_name()));
        }

        if let (Some(options), Value::Text(text)) = (&self.text, value) {
            if text.chars().count() > options.max_length {
                return Err(BinderError::ValueTooLong {
                    column: self.name.clone(),
                    max_length: options.max_length,
                });
            }
        }

        Ok(())
    }

    /// Convert to the representation passed to the driver
    pub fn to_wire(&self, value: &Value) -> Result<WireValue> {
        let wire = match (self.kind, value) {
            (_, Value::Null) => WireValue::Null,
            (ColumnKind::AutoId | ColumnKind::Integer, Value::Integer(v)) => WireValue::Integer(*v),
            (ColumnKind::Float, Value::Float(v)) => WireValue::Float(*v),
            (ColumnKind::Float, Value::Integer(v)) => WireValue::Float(*v as f64),
            (ColumnKind::Boolean, Value::Boolean(v)) => WireValue::Boolean(*v),
            (ColumnKind::Text, Value::Text(v)) => WireValue::Text(v.clone()),
            (ColumnKind::Date, Value::Date(d)) => WireValue::Text(d.format(DATE_FORMAT).to_string()),
            (ColumnKind::DateTimeUtc, Value::DateTime(dt)) => {
                WireValue::Text(dt.format(DATETIME_FORMAT).to_string())
            }
            (_, other) => return Err(self.mismatch(other.type_name())),
        };
        Ok(wire)
    }

    /// Convert a driver value back into a column value
    pub fn from_wire(&self, wire: WireValue) -> Result<Value> {
        let value = match (self.kind, wire) {
            (_, WireValue::Null) => Value::Null,
            (ColumnKind::AutoId | ColumnKind::Integer, WireValue::Integer(v)) => Value::Integer(v),
            (ColumnKind::Float, WireValue::Float(v)) => Value::Float(v),
            (ColumnKind::Float, WireValue::Integer(v)) => Value::Float(v as f64),
            (ColumnKind::Boolean, WireValue::Boolean(v)) => Value::Boolean(v),
            // SQLite stores booleans as integers
            (ColumnKind::Boolean, WireValue::Integer(v)) => Value::Boolean(v != 0),
            (ColumnKind::Text, WireValue::Text(v)) => Value::Text(v),
            (ColumnKind::Date, WireValue::Date(d)) => Value::Date(d),
            (ColumnKind::Date, WireValue::Text(s)) => Value::Date(self.parse_date(&s)?),
            (ColumnKind::DateTimeUtc, WireValue::Timestamp(dt)) => Value::DateTime(dt),
            (ColumnKind::DateTimeUtc, WireValue::Text(s)) => Value::DateTime(self.parse_datetime(&s)?),
            (_, other) => return Err(self.mismatch(other.type_name())),
        };
        Ok(value)
    }

    /// Parse string input (CLI, CSV and similar text sources)
    pub fn parse_str(&self, text: &str) -> Result<Value> {
        if text.is_empty() {
            return match self.kind {
                ColumnKind::Integer | ColumnKind::Float | ColumnKind::Boolean if !self.nullable => {
                    Err(BinderError::NullNotAllowed(self.name.clone()))
                }
                ColumnKind::Text => Ok(self.default.clone()),
                _ => Ok(Value::Null),
            };
        }

        let value = match self.kind {
            ColumnKind::AutoId | ColumnKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.parse_error(text, "int"))?,
            ColumnKind::Float => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.parse_error(text, "float"))?,
            ColumnKind::Boolean => match text.trim() {
                "0" => Value::Boolean(false),
                "1" => Value::Boolean(true),
                _ => return Err(self.parse_error(text, "bool (0 or 1)")),
            },
            ColumnKind::Text => Value::Text(text.to_string()),
            ColumnKind::Date => Value::Date(self.parse_date(text)?),
            ColumnKind::DateTimeUtc => Value::DateTime(self.parse_datetime(text)?),
        };
        Ok(value)
    }

    /// Canonical text form; NULL renders as an empty string
    pub fn to_display(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
            Value::Text(v) => v.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }

    fn parse_date(&self, text: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| self.parse_error(text, "date (YYYY-MM-DD)"))
    }

    // Only the naive `Z` form is accepted; explicit offsets are rejected.
    fn parse_datetime(&self, text: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
            .map_err(|_| self.parse_error(text, "datetime (YYYY-MM-DDTHH:MM:SSZ)"))
    }
}
