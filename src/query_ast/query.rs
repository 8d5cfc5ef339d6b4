//! Query model: an arena of [`Query`] nodes addressed by [`QueryId`].
//!
//! Joins, from-subqueries, set operations and predicate subqueries all refer
//! to other arena entries by id; each query also keeps a registry of the
//! nested queries reachable from it, keyed by alias, which is what metadata
//! hookup walks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::column::ColumnRef;
use super::comparison::{Condition, Conjunction, PredicateTree};
use super::errors::QueryAstError;
use super::expression::{Expression, OrderItem};
use super::plan_cache::{MetadataCatalog, ProviderMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub usize);

impl QueryId {
    /// Column qualified by this query's alias.
    pub fn column(self, name: impl Into<String>) -> ColumnRef {
        ColumnRef::new(self, name)
    }

    pub fn col(self, name: impl Into<String>) -> Expression {
        self.column(name).expr()
    }

    /// `alias.*` select item.
    pub fn all(self) -> SelectItem {
        SelectItem::AllOf(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOperationKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// Qualifier for comparisons against this query used as a subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchCondition {
    All,
    Any,
    Some,
}

impl SearchCondition {
    pub fn keyword(&self) -> &'static str {
        match self {
            SearchCondition::All => "ALL",
            SearchCondition::Any => "ANY",
            SearchCondition::Some => "SOME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum QuerySource {
    #[default]
    None,
    Table {
        catalog: Option<String>,
        schema: Option<String>,
        name: String,
    },
    Subquery(QueryId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    Expr(Expression),
    /// `alias.*` of a joined or derived query.
    AllOf(QueryId),
    /// `(subquery) AS alias`
    Subquery { query: QueryId, alias: String },
}

impl From<Expression> for SelectItem {
    fn from(e: Expression) -> Self {
        SelectItem::Expr(e)
    }
}

impl From<ColumnRef> for SelectItem {
    fn from(c: ColumnRef) -> Self {
        SelectItem::Expr(c.expr())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SelectList {
    #[default]
    All,
    Items(Vec<SelectItem>),
    /// Every metadata column except these.
    AllExcept(Vec<ColumnRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub kind: JoinType,
    pub query: QueryId,
    pub on: PredicateTree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperation {
    pub kind: SetOperationKind,
    pub query: QueryId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Paging {
    SkipTake { skip: u64, take: Option<u64> },
    /// 1-based page number.
    Page { page: u64, size: u64 },
}

/// Inclusive row range `[beg, end]` for a 1-based page.
pub fn page_bounds(page: u64, size: u64) -> (u64, u64) {
    let beg = (page.saturating_sub(1)).saturating_mul(size).saturating_add(1);
    let end = beg.saturating_add(size).saturating_sub(1);
    (beg, end)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Query {
    #[serde(skip)]
    pub id: Option<QueryId>,
    #[serde(default)]
    pub source: QuerySource,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub select: SelectList,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub where_tree: PredicateTree,
    #[serde(default)]
    pub having_tree: PredicateTree,
    #[serde(default)]
    pub group_by: Vec<Expression>,
    #[serde(default)]
    pub order_by: Vec<OrderItem>,
    #[serde(default)]
    pub set_operations: Vec<SetOperation>,
    #[serde(default)]
    pub paging: Option<Paging>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub top: Option<u64>,
    #[serde(default)]
    pub count_all: bool,
    #[serde(default)]
    pub count_all_alias: Option<String>,
    #[serde(default)]
    pub with_rollup: bool,
    #[serde(default)]
    pub no_lock: bool,
    #[serde(default)]
    pub search_condition: Option<SearchCondition>,
    #[serde(default)]
    pub default_conjunction: Conjunction,
    /// Nested queries reachable from this one, keyed by alias.
    #[serde(default)]
    pub nested: BTreeMap<String, QueryId>,
    #[serde(skip)]
    pub metadata: Option<Arc<dyn ProviderMetadata>>,
}

impl Query {
    pub fn table_name(&self) -> Option<&str> {
        match &self.source {
            QuerySource::Table { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn from_subquery(&self) -> Option<QueryId> {
        match self.source {
            QuerySource::Subquery(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self.paging, Some(Paging::Page { .. }))
    }

    /// Explicit select items, if the list is neither `*` nor all-except.
    pub fn select_items(&self) -> &[SelectItem] {
        match &self.select {
            SelectList::Items(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryArena {
    queries: Vec<Query>,
}

impl QueryArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mut query: Query) -> QueryId {
        let id = QueryId(self.queries.len());
        query.id = Some(id);
        self.queries.push(query);
        id
    }

    /// Query over a table; `"schema.table"` is split on the last dot.
    pub fn table(&mut self, name: &str) -> QueryId {
        let (schema, table) = match name.rsplit_once('.') {
            Some((s, t)) => (Some(s.to_string()), t.to_string()),
            None => (None, name.to_string()),
        };
        self.push(Query {
            source: QuerySource::Table {
                catalog: None,
                schema,
                name: table,
            },
            ..Query::default()
        })
    }

    pub fn table_in(&mut self, catalog: Option<&str>, schema: Option<&str>, name: &str) -> QueryId {
        self.push(Query {
            source: QuerySource::Table {
                catalog: catalog.map(str::to_string),
                schema: schema.map(str::to_string),
                name: name.to_string(),
            },
            ..Query::default()
        })
    }

    /// Query with no source yet, to be fed by [`QueryMut::from_subquery`].
    pub fn derived(&mut self) -> QueryId {
        self.push(Query::default())
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn get(&self, id: QueryId) -> Result<&Query, QueryAstError> {
        self.queries.get(id.0).ok_or(QueryAstError::UnknownQuery(id.0))
    }

    pub fn get_mut(&mut self, id: QueryId) -> Result<&mut Query, QueryAstError> {
        self.queries.get_mut(id.0).ok_or(QueryAstError::UnknownQuery(id.0))
    }

    /// Fluent builder over one query.
    pub fn at(&mut self, id: QueryId) -> QueryMut<'_> {
        QueryMut { arena: self, id }
    }

    /// Restore ids after deserialization.
    pub fn reindex(&mut self) {
        for (i, q) in self.queries.iter_mut().enumerate() {
            q.id = Some(QueryId(i));
        }
    }

    /// Every query reachable from `root` (root included), each once.
    pub fn reachable(&self, root: QueryId) -> Result<Vec<QueryId>, QueryAstError> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let q = self.get(id)?;
            order.push(id);
            if let Some(sub) = q.from_subquery() {
                stack.push(sub);
            }
            stack.extend(q.joins.iter().map(|j| j.query));
            stack.extend(q.set_operations.iter().map(|s| s.query));
            stack.extend(q.nested.values().copied());
            for item in q.select_items() {
                if let SelectItem::Subquery { query, .. } = item {
                    stack.push(*query);
                }
            }
        }
        Ok(order)
    }

    /// Attach provider metadata by table name to every reachable query.
    /// Returns how many queries received metadata.
    pub fn attach_metadata(&mut self, root: QueryId, catalog: &MetadataCatalog) -> Result<usize, QueryAstError> {
        let mut attached = 0;
        for id in self.reachable(root)? {
            let q = self.get_mut(id)?;
            let Some(table) = q.table_name() else {
                continue;
            };
            if let Some(meta) = catalog.lookup(table) {
                q.metadata = Some(meta);
                attached += 1;
            }
        }
        debug!("attach_metadata: {} of the reachable queries matched", attached);
        Ok(attached)
    }

    fn alias_of(&self, id: QueryId) -> Result<Option<String>, QueryAstError> {
        Ok(self.get(id)?.alias.clone())
    }

    /// Register `sub` under its alias (or a synthetic key) in `owner`'s registry.
    fn register_nested(&mut self, owner: QueryId, sub: QueryId) -> Result<(), QueryAstError> {
        let key = self.alias_of(sub)?.unwrap_or_else(|| format!("sq{}", sub.0));
        self.get_mut(owner)?.nested.entry(key).or_insert(sub);
        Ok(())
    }

    fn register_tree(&mut self, owner: QueryId, tree: &Condition) -> Result<(), QueryAstError> {
        if let Condition::Tree(t) = tree {
            let subs: Vec<QueryId> = t.predicates().filter_map(|p| p.subquery()).collect();
            for sub in subs {
                self.register_nested(owner, sub)?;
            }
        }
        Ok(())
    }
}

/// Which predicate clause an append targets.
enum Clause {
    Where,
    Having,
    LastJoin,
}

/// Fluent, by-value builder borrowed from a [`QueryArena`].
pub struct QueryMut<'a> {
    arena: &'a mut QueryArena,
    id: QueryId,
}

impl<'a> QueryMut<'a> {
    pub fn id(&self) -> QueryId {
        self.id
    }

    fn edit(self, f: impl FnOnce(&mut Query)) -> Result<Self, QueryAstError> {
        f(self.arena.get_mut(self.id)?);
        Ok(self)
    }

    pub fn alias(self, alias: impl Into<String>) -> Result<Self, QueryAstError> {
        let alias = alias.into();
        self.edit(|q| q.alias = Some(alias))
    }

    pub fn select<I, T>(self, items: I) -> Result<Self, QueryAstError>
    where
        I: IntoIterator<Item = T>,
        T: Into<SelectItem>,
    {
        let items: Vec<SelectItem> = items.into_iter().map(Into::into).collect();
        let subs: Vec<QueryId> = items
            .iter()
            .filter_map(|i| match i {
                SelectItem::Subquery { query, .. } => Some(*query),
                _ => None,
            })
            .collect();
        for sub in subs {
            self.arena.register_nested(self.id, sub)?;
        }
        self.edit(|q| match &mut q.select {
            SelectList::Items(existing) => existing.extend(items),
            other => *other = SelectList::Items(items),
        })
    }

    /// Scalar subquery as a select item: `(subquery) AS alias`.
    pub fn select_subquery(self, query: QueryId, alias: impl Into<String>) -> Result<Self, QueryAstError> {
        let alias = alias.into();
        self.select([SelectItem::Subquery { query, alias }])
    }

    /// Every metadata column except `excluded`; expanded at compile time.
    pub fn select_all_except<I>(self, excluded: I) -> Result<Self, QueryAstError>
    where
        I: IntoIterator<Item = ColumnRef>,
    {
        let excluded: Vec<ColumnRef> = excluded.into_iter().collect();
        self.edit(|q| q.select = SelectList::AllExcept(excluded))
    }

    pub fn from_subquery(self, sub: QueryId) -> Result<Self, QueryAstError> {
        if sub == self.id {
            return Err(QueryAstError::Construction("a query cannot select from itself".into()));
        }
        self.arena.register_nested(self.id, sub)?;
        self.edit(|q| q.source = QuerySource::Subquery(sub))
    }

    /// Join `other`, which must already carry an alias.
    pub fn join(self, kind: JoinType, other: QueryId, on: impl Into<Condition>) -> Result<Self, QueryAstError> {
        let Some(alias) = self.arena.alias_of(other)? else {
            return Err(QueryAstError::Construction(format!(
                "joined query {} has no alias",
                other.0
            )));
        };
        {
            let q = self.arena.get_mut(self.id)?;
            q.joins.push(JoinSpec {
                kind,
                query: other,
                on: PredicateTree::new(),
            });
            q.nested.entry(alias).or_insert(other);
        }
        if kind == JoinType::Cross {
            return Ok(self);
        }
        self.append(Clause::LastJoin, on.into())
    }

    pub fn inner_join(self, other: QueryId, on: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.join(JoinType::Inner, other, on)
    }

    pub fn left_join(self, other: QueryId, on: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.join(JoinType::Left, other, on)
    }

    pub fn right_join(self, other: QueryId, on: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.join(JoinType::Right, other, on)
    }

    pub fn full_join(self, other: QueryId, on: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.join(JoinType::Full, other, on)
    }

    pub fn cross_join(self, other: QueryId) -> Result<Self, QueryAstError> {
        self.join(JoinType::Cross, other, PredicateTree::new())
    }

    /// Extend the ON clause of the most recent join.
    pub fn on(self, condition: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.append(Clause::LastJoin, condition.into())
    }

    /// Append to WHERE (`where` is reserved).
    pub fn filter(self, condition: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.append(Clause::Where, condition.into())
    }

    /// Append several items to WHERE in order.
    pub fn filter_all<I, T>(mut self, conditions: I) -> Result<Self, QueryAstError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Condition>,
    {
        for c in conditions {
            self = self.append(Clause::Where, c.into())?;
        }
        Ok(self)
    }

    pub fn having(self, condition: impl Into<Condition>) -> Result<Self, QueryAstError> {
        self.append(Clause::Having, condition.into())
    }

    fn append(self, clause: Clause, condition: Condition) -> Result<Self, QueryAstError> {
        self.arena.register_tree(self.id, &condition)?;
        let q = self.arena.get_mut(self.id)?;
        let conjunction = q.default_conjunction;
        let tree = match clause {
            Clause::Where => &mut q.where_tree,
            Clause::Having => &mut q.having_tree,
            Clause::LastJoin => match q.joins.last_mut() {
                Some(j) => &mut j.on,
                None => {
                    return Err(QueryAstError::Construction(
                        "on() called before any join".into(),
                    ));
                }
            },
        };
        tree.append(condition, conjunction)?;
        Ok(self)
    }

    /// Conjunction inserted between consecutive `filter` / `having` items.
    pub fn default_conjunction(self, conjunction: Conjunction) -> Result<Self, QueryAstError> {
        self.edit(|q| q.default_conjunction = conjunction)
    }

    pub fn group_by<I, T>(self, exprs: I) -> Result<Self, QueryAstError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Expression>,
    {
        let exprs: Vec<Expression> = exprs.into_iter().map(Into::into).collect();
        self.edit(|q| q.group_by.extend(exprs))
    }

    pub fn with_rollup(self) -> Result<Self, QueryAstError> {
        self.edit(|q| q.with_rollup = true)
    }

    pub fn order_by<I, T>(self, items: I) -> Result<Self, QueryAstError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OrderItem>,
    {
        let items: Vec<OrderItem> = items.into_iter().map(Into::into).collect();
        self.edit(|q| q.order_by.extend(items))
    }

    pub fn set_operation(self, kind: SetOperationKind, other: QueryId) -> Result<Self, QueryAstError> {
        self.arena.get(other)?;
        self.edit(|q| q.set_operations.push(SetOperation { kind, query: other }))
    }

    pub fn union(self, other: QueryId) -> Result<Self, QueryAstError> {
        self.set_operation(SetOperationKind::Union, other)
    }

    pub fn union_all(self, other: QueryId) -> Result<Self, QueryAstError> {
        self.set_operation(SetOperationKind::UnionAll, other)
    }

    pub fn intersect(self, other: QueryId) -> Result<Self, QueryAstError> {
        self.set_operation(SetOperationKind::Intersect, other)
    }

    pub fn except(self, other: QueryId) -> Result<Self, QueryAstError> {
        self.set_operation(SetOperationKind::Except, other)
    }

    pub fn skip_take(self, skip: u64, take: Option<u64>) -> Result<Self, QueryAstError> {
        self.edit(|q| q.paging = Some(Paging::SkipTake { skip, take }))
    }

    /// 1-based page of `size` rows.
    pub fn page(self, page: u64, size: u64) -> Result<Self, QueryAstError> {
        if page == 0 || size == 0 {
            return Err(QueryAstError::Construction(format!(
                "page {} of size {} is out of range; both start at 1",
                page, size
            )));
        }
        self.edit(|q| q.paging = Some(Paging::Page { page, size }))
    }

    pub fn distinct(self) -> Result<Self, QueryAstError> {
        self.edit(|q| q.distinct = true)
    }

    pub fn top(self, n: u64) -> Result<Self, QueryAstError> {
        self.edit(|q| q.top = Some(n))
    }

    /// Append `COUNT(*)` under the configured alias.
    pub fn count_all(self) -> Result<Self, QueryAstError> {
        self.edit(|q| q.count_all = true)
    }

    pub fn count_all_as(self, alias: impl Into<String>) -> Result<Self, QueryAstError> {
        let alias = alias.into();
        self.edit(|q| {
            q.count_all = true;
            q.count_all_alias = Some(alias);
        })
    }

    pub fn no_lock(self) -> Result<Self, QueryAstError> {
        self.edit(|q| q.no_lock = true)
    }

    pub fn search_condition(self, condition: SearchCondition) -> Result<Self, QueryAstError> {
        self.edit(|q| q.search_condition = Some(condition))
    }

    pub fn metadata(self, metadata: Arc<dyn ProviderMetadata>) -> Result<Self, QueryAstError> {
        self.edit(|q| q.metadata = Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::comparison::{eq, exists, Comparison};

    #[test]
    fn page_bounds_are_inclusive() {
        assert_eq!(page_bounds(2, 10), (11, 20));
        assert_eq!(page_bounds(1, 1), (1, 1));
        assert_eq!(page_bounds(3, 25), (51, 75));
    }

    #[test]
    fn join_without_alias_fails_immediately() {
        let mut arena = QueryArena::new();
        let orders = arena.table("Orders");
        let customers = arena.table("Customers");
        let err = arena
            .at(orders)
            .inner_join(customers, eq(orders.col("CustomerId"), customers.col("Id")))
            .err();
        assert!(matches!(err, Some(QueryAstError::Construction(_))));
    }

    #[test]
    fn joins_register_nested_queries_by_alias() {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let c = arena.table("Customers");
        arena.at(c).alias("c").unwrap();
        arena
            .at(o)
            .alias("o")
            .and_then(|q| q.inner_join(c, eq(o.col("CustomerId"), c.col("Id"))))
            .unwrap();
        let q = arena.get(o).unwrap();
        assert_eq!(q.nested.get("c"), Some(&c));
        assert_eq!(q.joins[0].on.tokens.len(), 1);
    }

    #[test]
    fn on_rejects_bare_expressions() {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let c = arena.table("Customers");
        arena.at(c).alias("c").unwrap();
        let err = arena.at(o).inner_join(c, c.col("Id")).err();
        assert!(matches!(err, Some(QueryAstError::Construction(_))));
    }

    #[test]
    fn predicate_subqueries_are_registered_once() {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let l = arena.table("Lines");
        arena.at(l).alias("l").unwrap();
        arena
            .at(o)
            .filter(exists(l))
            .and_then(|q| q.filter(exists(l)))
            .unwrap();
        let q = arena.get(o).unwrap();
        assert_eq!(q.nested.len(), 1);
        assert!(matches!(q.where_tree.tokens[1], Comparison::Conjunction(Conjunction::And)));
    }

    #[test]
    fn page_zero_is_rejected() {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        assert!(arena.at(o).page(0, 10).is_err());
        assert!(arena.at(o).page(1, 0).is_err());
        assert!(arena.at(o).page(1, 10).is_ok());
    }

    #[test]
    fn schema_prefix_is_split() {
        let mut arena = QueryArena::new();
        let o = arena.table("sales.Orders");
        match &arena.get(o).unwrap().source {
            QuerySource::Table { schema, name, .. } => {
                assert_eq!(schema.as_deref(), Some("sales"));
                assert_eq!(name, "Orders");
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn reachable_walks_every_edge() {
        let mut arena = QueryArena::new();
        let inner = arena.table("Orders");
        let outer = arena.derived();
        let other = arena.table("Archive");
        arena.at(inner).alias("i").unwrap();
        arena
            .at(outer)
            .from_subquery(inner)
            .and_then(|q| q.union(other))
            .unwrap();
        let ids = arena.reachable(outer).unwrap();
        assert_eq!(ids.len(), 3);
    }
}
