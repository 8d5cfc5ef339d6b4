//! Literal values carried by predicates, arithmetic operands and parameters.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::enums::{LogicalType, ProviderType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Guid(String),
    Binary(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Null | Value::List(_) => LogicalType::Unknown,
            Value::Bool(_) => LogicalType::Boolean,
            Value::Int(_) => LogicalType::Int64,
            Value::Float(_) => LogicalType::Double,
            Value::Decimal(_) => LogicalType::Decimal,
            Value::Text(_) => LogicalType::String,
            Value::Date(_) => LogicalType::Date,
            Value::DateTime(_) => LogicalType::DateTime,
            Value::Guid(_) => LogicalType::Guid,
            Value::Binary(_) => LogicalType::Binary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Strings, dates and guids are emitted between string delimiters.
    pub fn is_quoted(&self) -> bool {
        self.logical_type().is_quoted()
    }

    pub(crate) fn inferred_provider_type(&self) -> ProviderType {
        match self {
            Value::Null | Value::List(_) => ProviderType::Variant,
            Value::Bool(_) => ProviderType::Boolean,
            Value::Int(_) => ProviderType::BigInt,
            Value::Float(_) => ProviderType::Float,
            Value::Decimal(_) => ProviderType::Decimal,
            Value::Text(_) => ProviderType::NVarChar,
            Value::Date(_) => ProviderType::Date,
            Value::DateTime(_) => ProviderType::DateTime,
            Value::Guid(_) => ProviderType::Uuid,
            Value::Binary(_) => ProviderType::VarBinary,
        }
    }

    /// Flatten nested lists by one level, the way IN-lists are inlined.
    pub fn flatten_once(values: &[Value]) -> Vec<&Value> {
        let mut out = Vec::with_capacity(values.len());
        for v in values {
            match v {
                Value::List(inner) => out.extend(inner.iter()),
                other => out.push(other),
            }
        }
        out
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_once_only_unwraps_one_level() {
        let values = vec![
            Value::Int(1),
            Value::List(vec![Value::Int(2), Value::List(vec![Value::Int(3)])]),
        ];
        let flat = Value::flatten_once(&values);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[1], &Value::Int(2));
        assert!(matches!(flat[2], Value::List(_)));
    }

    #[test]
    fn quoted_types() {
        assert!(Value::from("x").is_quoted());
        assert!(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()).is_quoted());
        assert!(!Value::Int(4).is_quoted());
        assert!(!Value::Null.is_quoted());
    }
}
