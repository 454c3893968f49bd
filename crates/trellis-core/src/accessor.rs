//! Accessors that pull facet labels and numeric values out of caller rows
//!
//! The engine never looks inside a row on its own. Callers either hand it a
//! closure, or a field name that is resolved through the [`Record`] trait.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

use crate::error::{Result, TrellisError};

/// Default separator used when several fields are joined into one label
pub const DEFAULT_FACET_SEPARATOR: &str = " • ";

/// A single dynamically typed field of a record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// String form used as a facet label
    pub fn to_label(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Numeric form used for metrics and the shared domain.
    ///
    /// Nulls and unparsable text become NaN, blank text becomes zero.
    pub fn to_number(&self) -> f64 {
        match self {
            FieldValue::Null => f64::NAN,
            FieldValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Int(i) => *i as f64,
            FieldValue::Float(f) => *f,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_label())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Rows that can be read by field name
pub trait Record {
    /// Look up a field, `None` when the record has no such field
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl<S: BuildHasher> Record for HashMap<String, FieldValue, S> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned()
    }
}

impl Record for BTreeMap<String, FieldValue> {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get(name).cloned()
    }
}

/// Extracts the facet label of a row
pub trait FacetKey<T> {
    fn key_of(&self, row: &T) -> Result<String>;
}

/// Extracts the numeric value of a row
pub trait ValueKey<T> {
    fn value_of(&self, row: &T) -> Result<f64>;
}

impl<T, F> FacetKey<T> for F
where
    F: Fn(&T) -> String,
{
    fn key_of(&self, row: &T) -> Result<String> {
        Ok(self(row))
    }
}

impl<T, F> ValueKey<T> for F
where
    F: Fn(&T) -> f64,
{
    fn value_of(&self, row: &T) -> Result<f64> {
        Ok(self(row))
    }
}

type KeyFn<T> = Arc<dyn Fn(&T) -> Result<String> + Send + Sync>;
type ValueFn<T> = Arc<dyn Fn(&T) -> Result<f64> + Send + Sync>;

/// Facet key given either as field name(s) or as a function
pub enum KeyAccessor<T> {
    /// Label is the string form of one field
    Field(String),
    /// Label joins the string forms of several fields
    Composite { fields: Vec<String>, separator: String },
    /// Label is computed by the caller
    Func(KeyFn<T>),
}

impl<T> KeyAccessor<T> {
    pub fn field(name: impl Into<String>) -> Self {
        KeyAccessor::Field(name.into())
    }

    /// Join several fields into one label, e.g. `"Region 1 • Category A"`
    pub fn composite<I, S>(fields: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.len() == 1 {
            return KeyAccessor::Field(fields.into_iter().next().unwrap_or_default());
        }
        KeyAccessor::Composite {
            fields,
            separator: separator.into(),
        }
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        KeyAccessor::Func(Arc::new(move |row: &T| Ok(f(row))))
    }

    /// Function accessor that may fail; the failure aborts grouping
    pub fn try_func<F>(f: F) -> Self
    where
        F: Fn(&T) -> Result<String> + Send + Sync + 'static,
    {
        KeyAccessor::Func(Arc::new(f))
    }
}

impl<T> Clone for KeyAccessor<T> {
    fn clone(&self) -> Self {
        match self {
            KeyAccessor::Field(name) => KeyAccessor::Field(name.clone()),
            KeyAccessor::Composite { fields, separator } => KeyAccessor::Composite {
                fields: fields.clone(),
                separator: separator.clone(),
            },
            KeyAccessor::Func(f) => KeyAccessor::Func(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for KeyAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAccessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            KeyAccessor::Composite { fields, separator } => f
                .debug_struct("Composite")
                .field("fields", fields)
                .field("separator", separator)
                .finish(),
            KeyAccessor::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<T: Record> FacetKey<T> for KeyAccessor<T> {
    fn key_of(&self, row: &T) -> Result<String> {
        match self {
            KeyAccessor::Field(name) => Ok(read_field(row, name)?.to_label()),
            KeyAccessor::Composite { fields, separator } => {
                let mut parts = Vec::with_capacity(fields.len());
                for name in fields {
                    parts.push(read_field(row, name)?.to_label());
                }
                Ok(parts.join(separator))
            }
            KeyAccessor::Func(f) => f(row),
        }
    }
}

/// Value key given either as a field name or as a function
pub enum ValueAccessor<T> {
    Field(String),
    Func(ValueFn<T>),
}

impl<T> ValueAccessor<T> {
    pub fn field(name: impl Into<String>) -> Self {
        ValueAccessor::Field(name.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        ValueAccessor::Func(Arc::new(move |row: &T| Ok(f(row))))
    }

    pub fn try_func<F>(f: F) -> Self
    where
        F: Fn(&T) -> Result<f64> + Send + Sync + 'static,
    {
        ValueAccessor::Func(Arc::new(f))
    }
}

impl<T> Clone for ValueAccessor<T> {
    fn clone(&self) -> Self {
        match self {
            ValueAccessor::Field(name) => ValueAccessor::Field(name.clone()),
            ValueAccessor::Func(f) => ValueAccessor::Func(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for ValueAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueAccessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            ValueAccessor::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<T: Record> ValueKey<T> for ValueAccessor<T> {
    fn value_of(&self, row: &T) -> Result<f64> {
        match self {
            ValueAccessor::Field(name) => Ok(read_field(row, name)?.to_number()),
            ValueAccessor::Func(f) => f(row),
        }
    }
}

fn read_field<T: Record>(row: &T, name: &str) -> Result<FieldValue> {
    row.field(name).ok_or_else(|| TrellisError::MissingField {
        field: name.to_string(),
    })
}
