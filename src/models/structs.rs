use serde::{Deserialize, Serialize};

use crate::models::enums::{ParameterDirection, ProviderType};
use crate::query_ast::value::Value;

/// A provider-typed positional parameter.
///
/// Cached instances are prototypes (no value). Every compilation works on its
/// own clone, so handing a `Parameter` to the caller never aliases the cache.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct Parameter {
    pub name: String,
    pub provider_type: ProviderType,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    pub direction: ParameterDirection,
    pub value: Value,
    pub source_column: Option<String>,
}

impl Parameter {
    pub fn prototype(source_column: impl Into<String>, provider_type: ProviderType) -> Self {
        let source_column = source_column.into();
        Self {
            name: source_column.clone(),
            provider_type,
            size: None,
            precision: None,
            scale: None,
            direction: ParameterDirection::Input,
            value: Value::Null,
            source_column: Some(source_column),
        }
    }

    /// Parameter for a predicate with no backing column; the provider type
    /// is inferred from the value itself.
    pub fn adhoc(name: impl Into<String>, value: Value) -> Self {
        let provider_type = value.inferred_provider_type();
        let size = match &value {
            Value::Text(s) => Some(s.chars().count() as u32),
            Value::Binary(b) => Some(b.len() as u32),
            _ => None,
        };
        Self {
            name: name.into(),
            provider_type,
            size,
            precision: None,
            scale: None,
            direction: ParameterDirection::Input,
            value,
            source_column: None,
        }
    }

    /// Clone this prototype under a fresh name with a value assigned.
    pub fn instantiate(&self, name: impl Into<String>, value: Value) -> Self {
        let mut p = self.clone();
        p.name = name.into();
        p.value = value;
        p
    }
}

/// Output of one compilation: SQL text plus the ordered parameter list.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    /// Parameters bind by position; `sql` carries bare placeholders.
    #[serde(default)]
    pub positional: bool,
}

impl CompiledQuery {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
