//! Expressions: columns, arithmetic trees, CASE and literals, each carrying
//! an ordered list of sub-operators.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::column::ColumnRef;
use super::comparison::Condition;
use super::sub_operator::{SubOperator, SubOperatorKind};
use super::value::Value;
use crate::models::enums::LogicalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
        }
    }
}

/// Right-hand side of an arithmetic node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MathOperand {
    Expr(Expression),
    Value(Value),
}

impl MathOperand {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            MathOperand::Expr(e) => e.logical_type(),
            MathOperand::Value(v) => v.logical_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithmeticExpr {
    pub left: Expression,
    pub operator: ArithmeticOperator,
    pub right: MathOperand,
    /// `false` emits the right operand first: `(10 - col)`.
    pub item_first: bool,
}

impl ArithmeticExpr {
    /// String operands turn `+` into the dialect's concatenation operator.
    pub fn is_concatenation(&self) -> bool {
        self.operator == ArithmeticOperator::Add
            && (self.left.logical_type() == LogicalType::String
                || self.right.logical_type() == LogicalType::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    pub when: Condition,
    pub then: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaseExpr {
    /// Column the CASE result is named after when no alias is given.
    pub owner: Option<ColumnRef>,
    /// Simple form: `CASE operand WHEN value THEN ...`.
    pub operand: Option<Box<Expression>>,
    pub clauses: Vec<CaseClause>,
    pub otherwise: Option<Box<Expression>>,
}

impl CaseExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// `CASE <operand> WHEN <value> THEN ...`
    pub fn on(operand: impl Into<Expression>) -> Self {
        Self {
            operand: Some(Box::new(operand.into())),
            ..Self::default()
        }
    }

    pub fn owner(mut self, column: ColumnRef) -> Self {
        self.owner = Some(column);
        self
    }

    pub fn when(mut self, when: impl Into<Condition>, then: impl Into<Expression>) -> Self {
        self.clauses.push(CaseClause {
            when: when.into(),
            then: then.into(),
        });
        self
    }

    pub fn otherwise(mut self, expr: impl Into<Expression>) -> Self {
        self.otherwise = Some(Box::new(expr.into()));
        self
    }

    pub fn end(self) -> Expression {
        Expression::from_kind(ExpressionKind::Case(Box::new(self)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Column(ColumnRef),
    Math(Box<ArithmeticExpr>),
    Case(Box<CaseExpr>),
    Literal(Value, LogicalType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    #[serde(default)]
    pub sub_operators: Vec<SubOperator>,
    /// Alias for non-column kinds; columns keep theirs on the `ColumnRef`.
    #[serde(default)]
    pub alias: Option<String>,
}

impl Expression {
    fn from_kind(kind: ExpressionKind) -> Self {
        Self {
            kind,
            sub_operators: Vec::new(),
            alias: None,
        }
    }

    pub fn column(column: ColumnRef) -> Self {
        Self::from_kind(ExpressionKind::Column(column))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.logical_type();
        Self::from_kind(ExpressionKind::Literal(value, ty))
    }

    /// `value OP expr`, for operators where the literal must come first.
    pub fn value_first(value: impl Into<Value>, operator: ArithmeticOperator, expr: Expression) -> Self {
        Self::from_kind(ExpressionKind::Math(Box::new(ArithmeticExpr {
            left: expr,
            operator,
            right: MathOperand::Value(value.into()),
            item_first: false,
        })))
    }

    pub fn has_math(&self) -> bool {
        matches!(self.kind, ExpressionKind::Math(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Literal(..))
    }

    pub fn is_case(&self) -> bool {
        matches!(self.kind, ExpressionKind::Case(_))
    }

    pub fn column_ref(&self) -> Option<&ColumnRef> {
        match &self.kind {
            ExpressionKind::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        if let Some(cast) = self.sub_operators.iter().rev().find(|op| op.kind == SubOperatorKind::Cast) {
            return cast.params.cast_type.unwrap_or_default();
        }
        match &self.kind {
            ExpressionKind::Column(c) => c.logical_type,
            ExpressionKind::Math(m) => m.left.logical_type(),
            ExpressionKind::Case(_) => LogicalType::Unknown,
            ExpressionKind::Literal(_, ty) => *ty,
        }
    }

    /// Explicitly assigned alias, if any.
    pub fn explicit_alias(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Column(c) => c.alias.as_deref().or(self.alias.as_deref()),
            _ => self.alias.as_deref(),
        }
    }

    /// Alias used when the select list needs an `AS` clause.
    pub fn effective_alias(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Column(c) => Some(self.alias.as_deref().unwrap_or(c.effective_alias())),
            ExpressionKind::Case(case) => self
                .alias
                .as_deref()
                .or_else(|| case.owner.as_ref().map(|o| o.effective_alias())),
            _ => self.alias.as_deref(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match &mut self.kind {
            ExpressionKind::Column(c) => c.alias = Some(alias),
            _ => self.alias = Some(alias),
        }
        self
    }

    /// Marks the column distinct; aggregates then emit `COUNT(DISTINCT col)`.
    pub fn distinct(mut self) -> Self {
        if let ExpressionKind::Column(c) = &mut self.kind {
            c.distinct = true;
        }
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.column_ref().is_some_and(|c| c.distinct)
    }

    pub fn typed(mut self, logical_type: LogicalType) -> Self {
        match &mut self.kind {
            ExpressionKind::Column(c) => c.logical_type = logical_type,
            ExpressionKind::Literal(_, ty) => *ty = logical_type,
            _ => {}
        }
        self
    }

    pub fn with_sub_operator(mut self, op: SubOperator) -> Self {
        self.sub_operators.push(op);
        self
    }

    fn op(self, kind: SubOperatorKind) -> Self {
        self.with_sub_operator(SubOperator::new(kind))
    }

    pub fn to_upper(self) -> Self {
        self.op(SubOperatorKind::ToUpper)
    }

    pub fn to_lower(self) -> Self {
        self.op(SubOperatorKind::ToLower)
    }

    pub fn ltrim(self) -> Self {
        self.op(SubOperatorKind::LTrim)
    }

    pub fn rtrim(self) -> Self {
        self.op(SubOperatorKind::RTrim)
    }

    pub fn trim(self) -> Self {
        self.op(SubOperatorKind::Trim)
    }

    pub fn substring(self, start: i64, length: i64) -> Self {
        self.with_sub_operator(SubOperator::substring(start, length))
    }

    pub fn coalesce(self, fallback: impl Into<Value>) -> Self {
        self.with_sub_operator(SubOperator::coalesce(fallback))
    }

    /// Truncate a date/time value to its date.
    pub fn date(self) -> Self {
        self.op(SubOperatorKind::DateTruncate)
    }

    pub fn length(self) -> Self {
        self.op(SubOperatorKind::Length)
    }

    pub fn round(self, digits: i32) -> Self {
        self.with_sub_operator(SubOperator::round(digits))
    }

    pub fn date_part(self, part: impl Into<String>) -> Self {
        self.with_sub_operator(SubOperator::date_part(part))
    }

    pub fn avg(self) -> Self {
        self.op(SubOperatorKind::Avg)
    }

    pub fn count(self) -> Self {
        self.op(SubOperatorKind::Count)
    }

    pub fn max(self) -> Self {
        self.op(SubOperatorKind::Max)
    }

    pub fn min(self) -> Self {
        self.op(SubOperatorKind::Min)
    }

    pub fn std_dev(self) -> Self {
        self.op(SubOperatorKind::StdDev)
    }

    pub fn sum(self) -> Self {
        self.op(SubOperatorKind::Sum)
    }

    pub fn var(self) -> Self {
        self.op(SubOperatorKind::Var)
    }

    pub fn cast(self, target: LogicalType) -> Self {
        self.with_sub_operator(SubOperator::cast(target))
    }

    pub fn cast_sized(self, target: LogicalType, length: i64) -> Self {
        self.with_sub_operator(SubOperator::cast_sized(target, length))
    }

    pub fn cast_numeric(self, target: LogicalType, precision: u8, scale: u8) -> Self {
        self.with_sub_operator(SubOperator::cast_numeric(target, precision, scale))
    }

    fn math(self, operator: ArithmeticOperator, right: impl Into<MathOperand>) -> Self {
        Self::from_kind(ExpressionKind::Math(Box::new(ArithmeticExpr {
            left: self,
            operator,
            right: right.into(),
            item_first: true,
        })))
    }

    pub fn plus(self, right: impl Into<MathOperand>) -> Self {
        self.math(ArithmeticOperator::Add, right)
    }

    pub fn minus(self, right: impl Into<MathOperand>) -> Self {
        self.math(ArithmeticOperator::Subtract, right)
    }

    pub fn times(self, right: impl Into<MathOperand>) -> Self {
        self.math(ArithmeticOperator::Multiply, right)
    }

    pub fn divided_by(self, right: impl Into<MathOperand>) -> Self {
        self.math(ArithmeticOperator::Divide, right)
    }

    pub fn modulo(self, right: impl Into<MathOperand>) -> Self {
        self.math(ArithmeticOperator::Modulo, right)
    }

    pub fn asc(self) -> OrderItem {
        OrderItem { expr: self, direction: Direction::Ascending }
    }

    pub fn desc(self) -> OrderItem {
        OrderItem { expr: self, direction: Direction::Descending }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Direction {
    Ascending,
    Descending,
    #[default]
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expr: Expression,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderItem {
    /// Hand-written order fragment; with no direction the text is expected
    /// to carry its own (`"LastName DESC"`).
    pub fn raw(text: impl AsRef<str>) -> Self {
        Self {
            expr: ColumnRef::raw(text).expr(),
            direction: Direction::Unassigned,
        }
    }
}

impl From<Expression> for OrderItem {
    fn from(expr: Expression) -> Self {
        Self { expr, direction: Direction::Unassigned }
    }
}

impl From<ColumnRef> for Expression {
    fn from(c: ColumnRef) -> Self {
        Expression::column(c)
    }
}

impl From<Expression> for MathOperand {
    fn from(e: Expression) -> Self {
        MathOperand::Expr(e)
    }
}

impl From<ColumnRef> for MathOperand {
    fn from(c: ColumnRef) -> Self {
        MathOperand::Expr(Expression::column(c))
    }
}

macro_rules! literal_conversions {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Expression {
                fn from(v: $t) -> Self {
                    Expression::literal(v)
                }
            }

            impl From<$t> for MathOperand {
                fn from(v: $t) -> Self {
                    MathOperand::Value(v.into())
                }
            }
        )*
    };
}

literal_conversions!(Value, bool, i32, i64, u32, f64, Decimal, &str, String, NaiveDate, NaiveDateTime);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_predicates() {
        let col = ColumnRef::unscoped("Price").expr();
        assert!(!col.has_math());
        assert!(!col.is_literal());
        let math = col.clone().times(2);
        assert!(math.has_math());
        assert!(Expression::literal(5).is_literal());
    }

    #[test]
    fn alias_lands_on_the_column() {
        let e = ColumnRef::unscoped("Price").expr().alias("UnitPrice");
        assert_eq!(e.column_ref().and_then(|c| c.alias.as_deref()), Some("UnitPrice"));
        assert_eq!(e.effective_alias(), Some("UnitPrice"));
        let e = ColumnRef::unscoped("Price").expr().sum();
        assert_eq!(e.effective_alias(), Some("Price"));
        assert_eq!(e.explicit_alias(), None);
    }

    #[test]
    fn value_first_records_operand_order() {
        let e = Expression::value_first(100, ArithmeticOperator::Subtract, ColumnRef::unscoped("Discount").expr());
        match e.kind {
            ExpressionKind::Math(m) => {
                assert!(!m.item_first);
                assert_eq!(m.operator, ArithmeticOperator::Subtract);
            }
            _ => panic!("expected math"),
        }
    }

    #[test]
    fn string_plus_is_concatenation() {
        let e = ColumnRef::unscoped("First").typed(LogicalType::String).expr().plus(" ");
        match e.kind {
            ExpressionKind::Math(m) => assert!(m.is_concatenation()),
            _ => panic!("expected math"),
        }
    }

    #[test]
    fn cast_changes_logical_type() {
        let e = ColumnRef::unscoped("Id").typed(LogicalType::Int32).expr().cast(LogicalType::String);
        assert_eq!(e.logical_type(), LogicalType::String);
    }
}
