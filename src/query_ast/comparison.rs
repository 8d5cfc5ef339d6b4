//! Predicate trees for WHERE / HAVING / ON clauses.
//!
//! A tree is a flat token stream of parentheses, conjunctions, raw literal
//! predicates and comparison nodes. Builder functions ([`eq`], [`gt`],
//! [`in_list`], ...) return single-predicate trees which compose with `&`,
//! `|` and `!`; composition wraps each pair in its own parentheses so the
//! stream stays balanced and alternates predicate / conjunction.

use std::ops::{BitAnd, BitOr, Not};

use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::QueryAstError;
use super::expression::Expression;
use super::query::QueryId;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Paren {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
    AndNot,
    OrNot,
}

impl Conjunction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
            Conjunction::AndNot => "AND NOT",
            Conjunction::OrNot => "OR NOT",
        }
    }

    pub fn negated(self) -> Self {
        match self {
            Conjunction::And => Conjunction::AndNot,
            Conjunction::Or => Conjunction::OrNot,
            Conjunction::AndNot => Conjunction::And,
            Conjunction::OrNot => Conjunction::Or,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    Between,
    In,
    NotIn,
    Contains,
    Exists,
    NotExists,
}

impl Operand {
    /// Parse an operand by name, as used by the by-name predicate builder.
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name.trim().to_ascii_lowercase().as_str() {
            "equal" | "eq" | "=" => Operand::Equal,
            "notequal" | "ne" | "<>" | "!=" => Operand::NotEqual,
            "greaterthan" | "gt" | ">" => Operand::GreaterThan,
            "greaterthanorequal" | "ge" | ">=" => Operand::GreaterThanOrEqual,
            "lessthan" | "lt" | "<" => Operand::LessThan,
            "lessthanorequal" | "le" | "<=" => Operand::LessThanOrEqual,
            "like" => Operand::Like,
            "notlike" => Operand::NotLike,
            "isnull" => Operand::IsNull,
            "isnotnull" => Operand::IsNotNull,
            "between" => Operand::Between,
            "in" => Operand::In,
            "notin" => Operand::NotIn,
            "contains" => Operand::Contains,
            "exists" => Operand::Exists,
            "notexists" => Operand::NotExists,
            _ => return None,
        };
        Some(op)
    }

    /// SQL operator for the binary comparison forms.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Operand::Equal => Some("="),
            Operand::NotEqual => Some("<>"),
            Operand::GreaterThan => Some(">"),
            Operand::GreaterThanOrEqual => Some(">="),
            Operand::LessThan => Some("<"),
            Operand::LessThanOrEqual => Some("<="),
            _ => None,
        }
    }
}

/// One end of a BETWEEN range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeBound {
    Value(Value),
    Expr(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum RightSide {
    #[default]
    None,
    Value(Value),
    Expr(Expression),
    Values(Vec<Value>),
    Subquery(QueryId),
    Range(RangeBound, RangeBound),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Absent only for EXISTS / NOT EXISTS.
    pub left: Option<Expression>,
    pub operand: Operand,
    pub right: RightSide,
    /// `false` emits the right side first: `@p1 < col`.
    pub item_first: bool,
    pub like_escape: Option<char>,
}

impl Predicate {
    pub fn new(left: Option<Expression>, operand: Operand, right: RightSide) -> Self {
        Self {
            left,
            operand,
            right,
            item_first: true,
            like_escape: None,
        }
    }

    pub fn subquery(&self) -> Option<QueryId> {
        match self.right {
            RightSide::Subquery(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    Paren(Paren),
    Conjunction(Conjunction),
    Literal(String),
    Predicate(Box<Predicate>),
    /// Negates the group or predicate that follows.
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PredicateTree {
    pub tokens: Vec<Comparison>,
    /// Set by `!`; consumed when the tree is spliced into a parent.
    #[serde(default)]
    pub negated: bool,
}

impl PredicateTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_predicate(predicate: Predicate) -> Self {
        Self {
            tokens: vec![Comparison::Predicate(Box::new(predicate))],
            negated: false,
        }
    }

    pub fn from_tokens(tokens: Vec<Comparison>) -> Self {
        Self { tokens, negated: false }
    }

    /// A lone `(`, for building groups across several `filter` calls.
    pub fn open() -> Self {
        Self::from_tokens(vec![Comparison::Paren(Paren::Open)])
    }

    /// A lone `)`.
    pub fn close() -> Self {
        Self::from_tokens(vec![Comparison::Paren(Paren::Close)])
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.tokens.iter().filter_map(|t| match t {
            Comparison::Predicate(p) => Some(p.as_ref()),
            _ => None,
        })
    }

    /// Emit the right-hand side before the column (`5 < col`). Applies to
    /// every predicate in the tree.
    pub fn value_first(mut self) -> Self {
        for t in &mut self.tokens {
            if let Comparison::Predicate(p) = t {
                p.item_first = false;
            }
        }
        self
    }

    /// Whether the whole stream is enclosed by one matching pair.
    fn is_wrapped(&self) -> bool {
        if !matches!(self.tokens.first(), Some(Comparison::Paren(Paren::Open)))
            || !matches!(self.tokens.last(), Some(Comparison::Paren(Paren::Close)))
        {
            return false;
        }
        let mut depth = 0i32;
        for (i, t) in self.tokens.iter().enumerate() {
            match t {
                Comparison::Paren(Paren::Open) => depth += 1,
                Comparison::Paren(Paren::Close) => {
                    depth -= 1;
                    if depth == 0 && i + 1 != self.tokens.len() {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn wrapped(mut self) -> Self {
        if self.tokens.len() > 1 && !self.is_wrapped() {
            self.tokens.insert(0, Comparison::Paren(Paren::Open));
            self.tokens.push(Comparison::Paren(Paren::Close));
        }
        self
    }

    /// Tokens for a leading position, negation written as a `NOT` marker.
    fn into_leading_tokens(self) -> Vec<Comparison> {
        if self.negated {
            let mut out = Vec::with_capacity(self.tokens.len() + 1);
            out.push(Comparison::Not);
            out.extend(self.tokens);
            out
        } else {
            self.tokens
        }
    }

    fn combine(self, rhs: PredicateTree, conjunction: Conjunction) -> PredicateTree {
        if self.is_empty() {
            return rhs;
        }
        if rhs.is_empty() {
            return self;
        }
        let conjunction = if rhs.negated { conjunction.negated() } else { conjunction };
        let mut tokens = Vec::with_capacity(self.tokens.len() + rhs.tokens.len() + 3);
        tokens.push(Comparison::Paren(Paren::Open));
        tokens.extend(self.into_leading_tokens());
        tokens.push(Comparison::Conjunction(conjunction));
        tokens.extend(rhs.tokens);
        tokens.push(Comparison::Paren(Paren::Close));
        PredicateTree { tokens, negated: false }
    }

    /// Number of open and close parentheses; equal for every builder-made tree.
    pub fn paren_counts(&self) -> (usize, usize) {
        self.tokens.iter().fold((0, 0), |(o, c), t| match t {
            Comparison::Paren(Paren::Open) => (o + 1, c),
            Comparison::Paren(Paren::Close) => (o, c + 1),
            _ => (o, c),
        })
    }

    /// Append `incoming` to this stream the way `where()` does: a conjunction
    /// is inserted unless the stream is empty or ends with `(`; a leading `)`
    /// right after `(` cancels the pair.
    pub(crate) fn append(&mut self, incoming: Condition, default: Conjunction) -> Result<(), QueryAstError> {
        let (mut tokens, negated) = match incoming {
            Condition::Tree(t) => {
                let negated = t.negated;
                (t.tokens, negated)
            }
            Condition::Raw(text) => (vec![Comparison::Literal(text)], false),
            Condition::Expr(_) => {
                return Err(QueryAstError::Construction(
                    "predicate clause received a non-predicate argument".to_string(),
                ));
            }
        };
        if tokens.is_empty() {
            return Ok(());
        }
        let last_is_open = matches!(self.tokens.last(), Some(Comparison::Paren(Paren::Open)));
        match tokens.first() {
            Some(Comparison::Paren(Paren::Close)) => {
                if last_is_open {
                    self.tokens.pop();
                    tokens.remove(0);
                }
            }
            Some(Comparison::Conjunction(_)) => {}
            _ => {
                if !self.tokens.is_empty() && !last_is_open {
                    let conj = if negated { default.negated() } else { default };
                    self.tokens.push(Comparison::Conjunction(conj));
                } else if negated {
                    self.tokens.push(Comparison::Not);
                }
            }
        }
        self.tokens.extend(tokens);
        Ok(())
    }
}

impl BitAnd for PredicateTree {
    type Output = PredicateTree;

    fn bitand(self, rhs: PredicateTree) -> PredicateTree {
        self.combine(rhs, Conjunction::And)
    }
}

impl BitOr for PredicateTree {
    type Output = PredicateTree;

    fn bitor(self, rhs: PredicateTree) -> PredicateTree {
        self.combine(rhs, Conjunction::Or)
    }
}

impl Not for PredicateTree {
    type Output = PredicateTree;

    fn not(self) -> PredicateTree {
        let mut t = self.wrapped();
        t.negated = !t.negated;
        t
    }
}

/// One argument of `where()` / `having()` / `on()` / CASE `when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Tree(PredicateTree),
    /// Hand-written predicate text, emitted verbatim.
    Raw(String),
    /// A value expression; only meaningful as a simple-CASE `when`.
    Expr(Expression),
}

impl From<PredicateTree> for Condition {
    fn from(t: PredicateTree) -> Self {
        Condition::Tree(t)
    }
}

impl From<&str> for Condition {
    fn from(s: &str) -> Self {
        Condition::Raw(s.to_string())
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        Condition::Raw(s)
    }
}

impl From<Expression> for Condition {
    fn from(e: Expression) -> Self {
        Condition::Expr(e)
    }
}

impl From<Value> for Condition {
    fn from(v: Value) -> Self {
        Condition::Expr(Expression::literal(v))
    }
}

impl From<Expression> for RightSide {
    fn from(e: Expression) -> Self {
        RightSide::Expr(e)
    }
}

impl From<QueryId> for RightSide {
    fn from(id: QueryId) -> Self {
        RightSide::Subquery(id)
    }
}

impl From<Vec<Value>> for RightSide {
    fn from(values: Vec<Value>) -> Self {
        RightSide::Values(values)
    }
}

impl From<Expression> for RangeBound {
    fn from(e: Expression) -> Self {
        RangeBound::Expr(e)
    }
}

macro_rules! value_sides {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for RightSide {
                fn from(v: $t) -> Self {
                    RightSide::Value(v.into())
                }
            }

            impl From<$t> for RangeBound {
                fn from(v: $t) -> Self {
                    RangeBound::Value(v.into())
                }
            }
        )*
    };
}

value_sides!(Value, bool, i32, i64, u32, f64, Decimal, &str, String, NaiveDate, NaiveDateTime);

fn binary(left: impl Into<Expression>, operand: Operand, right: impl Into<RightSide>) -> PredicateTree {
    PredicateTree::from_predicate(Predicate::new(Some(left.into()), operand, right.into()))
}

/// `left = right`; a [`QueryId`] right side compares against a subquery.
pub fn eq(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::Equal, right)
}

pub fn ne(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::NotEqual, right)
}

pub fn gt(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::GreaterThan, right)
}

pub fn ge(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::GreaterThanOrEqual, right)
}

pub fn lt(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::LessThan, right)
}

pub fn le(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::LessThanOrEqual, right)
}

pub fn like(left: impl Into<Expression>, pattern: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::Like, pattern)
}

pub fn not_like(left: impl Into<Expression>, pattern: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::NotLike, pattern)
}

/// `left LIKE pattern ESCAPE 'c'`
pub fn like_escaped(left: impl Into<Expression>, pattern: impl Into<RightSide>, escape: char) -> PredicateTree {
    let mut p = Predicate::new(Some(left.into()), Operand::Like, pattern.into());
    p.like_escape = Some(escape);
    PredicateTree::from_predicate(p)
}

pub fn not_like_escaped(left: impl Into<Expression>, pattern: impl Into<RightSide>, escape: char) -> PredicateTree {
    let mut p = Predicate::new(Some(left.into()), Operand::NotLike, pattern.into());
    p.like_escape = Some(escape);
    PredicateTree::from_predicate(p)
}

pub fn is_null(left: impl Into<Expression>) -> PredicateTree {
    binary(left, Operand::IsNull, RightSide::None)
}

pub fn is_not_null(left: impl Into<Expression>) -> PredicateTree {
    binary(left, Operand::IsNotNull, RightSide::None)
}

/// `left BETWEEN low AND high`; either bound may be a column.
pub fn between(left: impl Into<Expression>, low: impl Into<RangeBound>, high: impl Into<RangeBound>) -> PredicateTree {
    binary(left, Operand::Between, RightSide::Range(low.into(), high.into()))
}

/// `left IN (...)`: a `Vec<Value>` is inlined, a [`QueryId`] becomes a subquery.
pub fn in_list(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::In, right)
}

pub fn not_in(left: impl Into<Expression>, right: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::NotIn, right)
}

/// `left IN (v1, v2, ...)` from any iterator of values.
pub fn in_values<V: Into<Value>>(left: impl Into<Expression>, values: impl IntoIterator<Item = V>) -> PredicateTree {
    in_list(left, values.into_iter().map(Into::into).collect::<Vec<Value>>())
}

pub fn not_in_values<V: Into<Value>>(left: impl Into<Expression>, values: impl IntoIterator<Item = V>) -> PredicateTree {
    not_in(left, values.into_iter().map(Into::into).collect::<Vec<Value>>())
}

/// Full-text `CONTAINS(left, search)`.
pub fn contains(left: impl Into<Expression>, search: impl Into<RightSide>) -> PredicateTree {
    binary(left, Operand::Contains, search)
}

pub fn exists(subquery: QueryId) -> PredicateTree {
    PredicateTree::from_predicate(Predicate::new(None, Operand::Exists, RightSide::Subquery(subquery)))
}

pub fn not_exists(subquery: QueryId) -> PredicateTree {
    PredicateTree::from_predicate(Predicate::new(None, Operand::NotExists, RightSide::Subquery(subquery)))
}

/// Build a predicate from an operand name (`"GreaterThan"`, `">="`, ...).
///
/// Unrecognised names yield an empty tree, which `where()` ignores; the
/// drop is logged. BETWEEN has no single-value form and is rejected, as is
/// any value-taking operand called without a value.
pub fn predicate_by_name(
    left: impl Into<Expression>,
    operand: &str,
    value: Option<Value>,
) -> Result<PredicateTree, QueryAstError> {
    let Some(op) = Operand::from_name(operand) else {
        warn!("predicate_by_name: unrecognised operand '{}', predicate dropped", operand);
        return Ok(PredicateTree::new());
    };
    match op {
        Operand::Between => Err(QueryAstError::Unsupported(
            "BETWEEN needs two bounds; use between()",
        )),
        Operand::IsNull | Operand::IsNotNull => Ok(binary(left, op, RightSide::None)),
        Operand::Exists | Operand::NotExists => Err(QueryAstError::Unsupported(
            "EXISTS needs a subquery; use exists()",
        )),
        _ => match value {
            Some(Value::List(values)) if matches!(op, Operand::In | Operand::NotIn) => {
                Ok(binary(left, op, RightSide::Values(values)))
            }
            Some(v) => Ok(binary(left, op, RightSide::Value(v))),
            None => Err(QueryAstError::Construction(format!(
                "{:?} received no counterpart value",
                op
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::column::ColumnRef;

    fn col(name: &str) -> Expression {
        ColumnRef::unscoped(name).expr()
    }

    #[test]
    fn and_wraps_pair_in_parens() {
        let t = eq(col("A"), 1) & eq(col("B"), 2);
        assert_eq!(t.tokens.len(), 5);
        assert_eq!(t.tokens[0], Comparison::Paren(Paren::Open));
        assert_eq!(t.tokens[2], Comparison::Conjunction(Conjunction::And));
        assert_eq!(t.tokens[4], Comparison::Paren(Paren::Close));
    }

    #[test]
    fn negated_right_operand_uses_and_not() {
        let t = eq(col("A"), 1) & !eq(col("B"), 2);
        assert_eq!(t.tokens[2], Comparison::Conjunction(Conjunction::AndNot));
        let t = eq(col("A"), 1) | !eq(col("B"), 2);
        assert_eq!(t.tokens[2], Comparison::Conjunction(Conjunction::OrNot));
    }

    #[test]
    fn leading_negation_is_a_marker_token() {
        let t = !eq(col("A"), 1) & eq(col("B"), 2);
        assert_eq!(t.tokens[1], Comparison::Not);
        assert!(matches!(t.tokens[2], Comparison::Predicate(_)));

        let mut tree = PredicateTree::new();
        tree.append((!eq(col("A"), 1)).into(), Conjunction::And).unwrap();
        tree.append("B > 2".into(), Conjunction::And).unwrap();
        assert_eq!(tree.tokens[0], Comparison::Not);
        // no two predicate-like tokens without a conjunction between them
        let operands = |c: &Comparison| matches!(c, Comparison::Predicate(_) | Comparison::Literal(_));
        assert!(tree.tokens.windows(2).all(|w| !(operands(&w[0]) && operands(&w[1]))));
    }

    #[test]
    fn nested_composition_stays_balanced() {
        let t = (eq(col("A"), 1) | eq(col("B"), 2)) & !(eq(col("C"), 3) & eq(col("D"), 4));
        let (open, close) = t.paren_counts();
        assert_eq!(open, close);
        assert_eq!(open, 3);
    }

    #[test]
    fn append_inserts_default_conjunction() {
        let mut tree = PredicateTree::new();
        tree.append(eq(col("A"), 1).into(), Conjunction::And).unwrap();
        tree.append(eq(col("B"), 2).into(), Conjunction::And).unwrap();
        assert_eq!(tree.tokens.len(), 3);
        assert_eq!(tree.tokens[1], Comparison::Conjunction(Conjunction::And));
    }

    #[test]
    fn append_after_open_paren_skips_conjunction() {
        let mut tree = PredicateTree::new();
        tree.append(eq(col("A"), 1).into(), Conjunction::And).unwrap();
        tree.append(PredicateTree::open().into(), Conjunction::Or).unwrap();
        tree.append(eq(col("B"), 2).into(), Conjunction::Or).unwrap();
        tree.append(PredicateTree::close().into(), Conjunction::Or).unwrap();
        // A OR ( B )
        assert_eq!(tree.tokens.len(), 5);
        assert_eq!(tree.tokens[1], Comparison::Conjunction(Conjunction::Or));
        assert_eq!(tree.tokens[2], Comparison::Paren(Paren::Open));
        assert_eq!(tree.tokens[4], Comparison::Paren(Paren::Close));
    }

    #[test]
    fn close_right_after_open_collapses() {
        let mut tree = PredicateTree::new();
        tree.append(eq(col("A"), 1).into(), Conjunction::And).unwrap();
        tree.append(PredicateTree::open().into(), Conjunction::And).unwrap();
        tree.append(PredicateTree::close().into(), Conjunction::And).unwrap();
        assert_eq!(tree.tokens.len(), 1);
    }

    #[test]
    fn raw_strings_are_literal_predicates() {
        let mut tree = PredicateTree::new();
        tree.append("Age > 21".into(), Conjunction::And).unwrap();
        tree.append(eq(col("A"), 1).into(), Conjunction::And).unwrap();
        assert_eq!(tree.tokens[0], Comparison::Literal("Age > 21".into()));
        assert_eq!(tree.tokens[1], Comparison::Conjunction(Conjunction::And));
    }

    #[test]
    fn expressions_are_rejected_as_predicates() {
        let mut tree = PredicateTree::new();
        let err = tree.append(col("A").into(), Conjunction::And).unwrap_err();
        assert!(matches!(err, QueryAstError::Construction(_)));
    }

    #[test]
    fn by_name_unknown_operand_is_a_no_op() {
        let t = predicate_by_name(col("A"), "Sounds Like", Some(Value::Int(1))).unwrap();
        assert!(t.is_empty());
        let mut tree = PredicateTree::new();
        tree.append(eq(col("B"), 2).into(), Conjunction::And).unwrap();
        tree.append(t.into(), Conjunction::And).unwrap();
        assert_eq!(tree.tokens.len(), 1);
    }

    #[test]
    fn by_name_between_is_unsupported() {
        let err = predicate_by_name(col("A"), "Between", Some(Value::Int(1))).unwrap_err();
        assert!(matches!(err, QueryAstError::Unsupported(_)));
        let err = predicate_by_name(col("A"), "GreaterThan", None).unwrap_err();
        assert!(matches!(err, QueryAstError::Construction(_)));
        let t = predicate_by_name(col("A"), ">=", Some(Value::Int(3))).unwrap();
        assert_eq!(t.predicates().next().map(|p| p.operand), Some(Operand::GreaterThanOrEqual));
    }

    #[test]
    fn value_first_flips_item_first() {
        let t = lt(col("A"), 5).value_first();
        assert!(t.predicates().all(|p| !p.item_first));
    }
}
