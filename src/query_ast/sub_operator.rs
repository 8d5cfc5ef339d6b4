//! Postfix function wrappers (TRIM, UPPER, SUBSTRING, CAST, aggregates, ...)
//! applied to a column or expression, and the stack-based algorithm that
//! nests them around the base fragment.

use serde::{Deserialize, Serialize};

use super::emitter::dialect::SqlDialect;
use super::value::Value;
use crate::models::enums::LogicalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubOperatorKind {
    ToUpper,
    ToLower,
    LTrim,
    RTrim,
    Trim,
    Substring,
    Coalesce,
    DateTruncate,
    Length,
    Round,
    DatePart,
    Avg,
    Count,
    Max,
    Min,
    StdDev,
    Sum,
    Var,
    Cast,
}

impl SubOperatorKind {
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            SubOperatorKind::Avg
                | SubOperatorKind::Count
                | SubOperatorKind::Max
                | SubOperatorKind::Min
                | SubOperatorKind::StdDev
                | SubOperatorKind::Sum
                | SubOperatorKind::Var
        )
    }

    /// Whether the result keeps the type of the wrapped column, so that the
    /// column's cached parameter prototype still applies.
    pub fn preserves_type(&self) -> bool {
        matches!(
            self,
            SubOperatorKind::ToUpper
                | SubOperatorKind::ToLower
                | SubOperatorKind::LTrim
                | SubOperatorKind::RTrim
                | SubOperatorKind::Trim
                | SubOperatorKind::Substring
                | SubOperatorKind::Coalesce
                | SubOperatorKind::Max
                | SubOperatorKind::Min
        )
    }
}

/// Named parameters of a sub-operator. Only the fields relevant to the
/// operator kind are populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubOperatorParams {
    pub start: Option<i64>,
    pub length: Option<i64>,
    pub digits: Option<i32>,
    pub value: Option<Value>,
    pub date_part: Option<String>,
    pub cast_type: Option<LogicalType>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOperator {
    pub kind: SubOperatorKind,
    #[serde(default)]
    pub params: SubOperatorParams,
}

impl SubOperator {
    pub fn new(kind: SubOperatorKind) -> Self {
        Self {
            kind,
            params: SubOperatorParams::default(),
        }
    }

    pub fn substring(start: i64, length: i64) -> Self {
        let mut op = Self::new(SubOperatorKind::Substring);
        op.params.start = Some(start);
        op.params.length = Some(length);
        op
    }

    pub fn coalesce(value: impl Into<Value>) -> Self {
        let mut op = Self::new(SubOperatorKind::Coalesce);
        op.params.value = Some(value.into());
        op
    }

    pub fn round(digits: i32) -> Self {
        let mut op = Self::new(SubOperatorKind::Round);
        op.params.digits = Some(digits);
        op
    }

    pub fn date_part(part: impl Into<String>) -> Self {
        let mut op = Self::new(SubOperatorKind::DatePart);
        op.params.date_part = Some(part.into());
        op
    }

    pub fn cast(target: LogicalType) -> Self {
        let mut op = Self::new(SubOperatorKind::Cast);
        op.params.cast_type = Some(target);
        op
    }

    pub fn cast_sized(target: LogicalType, length: i64) -> Self {
        let mut op = Self::cast(target);
        op.params.length = Some(length);
        op
    }

    pub fn cast_numeric(target: LogicalType, precision: u8, scale: u8) -> Self {
        let mut op = Self::cast(target);
        op.params.precision = Some(precision);
        op.params.scale = Some(scale);
        op
    }
}

/// Opening text of one wrapper plus the fragments that follow the base, in
/// the order they appear in the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct SubOperatorTokens {
    pub open: String,
    pub trailing: Vec<String>,
}

impl SubOperatorTokens {
    pub fn call(open: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            trailing: vec![")".to_string()],
        }
    }
}

/// Wrap `base` in every operator of `ops`.
///
/// The list is walked last-to-first: each opening token is written out and
/// its trailing fragments are pushed (reversed) on a stack; after the base
/// fragment the stack is drained, which closes the calls innermost-first and
/// puts extra arguments (lengths, cast targets) right after the call they
/// belong to. `col.trim().to_upper()` therefore becomes `UPPER(TRIM(col))`.
pub fn apply_sub_operators(
    base: &str,
    ops: &[SubOperator],
    distinct: bool,
    dialect: &dyn SqlDialect,
) -> String {
    if ops.is_empty() {
        return base.to_string();
    }
    let mut out = String::with_capacity(base.len() + ops.len() * 12);
    let mut stack: Vec<String> = Vec::with_capacity(ops.len() * 2);
    for op in ops.iter().rev() {
        let tokens = dialect.sub_operator_tokens(op, distinct && op.kind.is_aggregate());
        out.push_str(&tokens.open);
        for fragment in tokens.trailing.into_iter().rev() {
            stack.push(fragment);
        }
    }
    out.push_str(base);
    while let Some(fragment) = stack.pop() {
        out.push_str(&fragment);
    }
    out
}
