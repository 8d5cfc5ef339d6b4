//! Column references.

use serde::{Deserialize, Serialize};

use super::expression::Expression;
use super::query::QueryId;
use crate::models::enums::LogicalType;

/// Leading character marking a hand-written fragment that bypasses quoting.
/// A matching trailing `>` is stripped as well.
pub const RAW_SENTINEL: char = '<';
const RAW_SENTINEL_END: char = '>';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Query whose alias qualifies this column. `None` emits the bare name.
    pub scope: Option<QueryId>,
    pub name: String,
    pub alias: Option<String>,
    pub distinct: bool,
    pub logical_type: LogicalType,
}

impl ColumnRef {
    pub fn new(scope: QueryId, name: impl Into<String>) -> Self {
        Self {
            scope: Some(scope),
            name: name.into(),
            alias: None,
            distinct: false,
            logical_type: LogicalType::Unknown,
        }
    }

    pub fn unscoped(name: impl Into<String>) -> Self {
        Self {
            scope: None,
            name: name.into(),
            alias: None,
            distinct: false,
            logical_type: LogicalType::Unknown,
        }
    }

    /// A raw SQL fragment emitted verbatim, e.g. `ColumnRef::raw("COUNT(*) + 1")`.
    pub fn raw(text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        let name = if text.starts_with(RAW_SENTINEL) {
            text.to_string()
        } else {
            format!("{RAW_SENTINEL}{text}{RAW_SENTINEL_END}")
        };
        Self::unscoped(name)
    }

    pub fn typed(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = logical_type;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_raw(&self) -> bool {
        self.name.starts_with(RAW_SENTINEL)
    }

    /// The fragment with sentinel characters removed; `None` for ordinary columns.
    pub fn raw_text(&self) -> Option<&str> {
        strip_raw(&self.name)
    }

    pub fn expr(self) -> Expression {
        Expression::column(self)
    }
}

pub(crate) fn strip_raw(text: &str) -> Option<&str> {
    let inner = text.strip_prefix(RAW_SENTINEL)?;
    Some(inner.strip_suffix(RAW_SENTINEL_END).unwrap_or(inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_alias_falls_back_to_name() {
        let c = ColumnRef::unscoped("FirstName");
        assert_eq!(c.effective_alias(), "FirstName");
        let c = c.with_alias("First");
        assert_eq!(c.effective_alias(), "First");
    }

    #[test]
    fn raw_sentinel_is_stripped() {
        let c = ColumnRef::raw("<LastName DESC>");
        assert!(c.is_raw());
        assert_eq!(c.raw_text(), Some("LastName DESC"));
        let c = ColumnRef::raw("a <> b");
        assert_eq!(c.raw_text(), Some("a <> b"));
        assert_eq!(ColumnRef::unscoped("Id").raw_text(), None);
    }
}
