use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use super::column::ColumnRef;
use super::comparison::{Comparison, Condition, Operand, Paren, Predicate, PredicateTree, RangeBound, RightSide};
use super::errors::QueryAstError;
use super::expression::{ArithmeticExpr, CaseExpr, Direction, Expression, ExpressionKind, MathOperand, OrderItem};
use super::plan_cache::ParameterCache;
use super::query::{JoinType, Paging, Query, QueryArena, QueryId, QuerySource, SelectItem, SelectList, page_bounds};
use super::sub_operator::apply_sub_operators;
use super::value::Value;
use crate::config::CompilerConfig;
use crate::models::enums::DatabaseType;
use crate::models::structs::{CompiledQuery, Parameter};

pub mod dialect;
use dialect::{PagingStrategy, SqlDialect, get_dialect_with_tokens};

/// Translates a [`QueryArena`] rooted at one query into SQL text plus the
/// ordered parameter list.
///
/// A compiler is cheap to share: compilation takes `&self`, the prototype
/// cache is internally locked and per-call state lives in a private emitter.
pub struct SqlCompiler {
    dialect: Box<dyn SqlDialect>,
    cache: Arc<ParameterCache>,
    config: CompilerConfig,
    last_query: Mutex<Option<String>>,
}

impl SqlCompiler {
    pub fn new(db_type: DatabaseType) -> Self {
        Self::from_config(CompilerConfig::for_database(db_type), Arc::new(ParameterCache::new()))
    }

    pub fn with_cache(db_type: DatabaseType, cache: Arc<ParameterCache>) -> Self {
        Self::from_config(CompilerConfig::for_database(db_type), cache)
    }

    pub fn from_config(config: CompilerConfig, cache: Arc<ParameterCache>) -> Self {
        let dialect = get_dialect_with_tokens(&config.database_type, config.tokens.clone());
        Self {
            dialect,
            cache,
            config,
            last_query: Mutex::new(None),
        }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn cache(&self) -> &Arc<ParameterCache> {
        &self.cache
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Last SQL text produced by [`compile`](Self::compile), for diagnostics.
    pub fn last_query(&self) -> Option<String> {
        self.last_query
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn compile(&self, arena: &QueryArena, root: QueryId) -> Result<CompiledQuery, QueryAstError> {
        let mut emitter = Emitter {
            arena,
            dialect: self.dialect.as_ref(),
            cache: &self.cache,
            config: &self.config,
            params: Vec::new(),
            active: Vec::new(),
            from_aliases: HashMap::new(),
        };
        let sql = emitter.nested(root)?;
        debug!("SQL: {}", sql);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(sql.clone());
        }
        Ok(CompiledQuery {
            sql,
            parameters: emitter.params,
            positional: self.dialect.tokens().positional,
        })
    }
}

/// Per-call compilation state.
struct Emitter<'c> {
    arena: &'c QueryArena,
    dialect: &'c dyn SqlDialect,
    cache: &'c ParameterCache,
    config: &'c CompilerConfig,
    params: Vec<Parameter>,
    /// Queries currently being emitted, innermost last.
    active: Vec<QueryId>,
    /// Alias a from-subquery is known by in its outer query.
    from_aliases: HashMap<QueryId, Option<String>>,
}

impl<'c> Emitter<'c> {
    /// Emit `id` with it marked active; the mark is dropped on every path.
    fn nested(&mut self, id: QueryId) -> Result<String, QueryAstError> {
        if self.active.contains(&id) {
            return Err(QueryAstError::Emit(format!("query {} is nested inside itself", id.0)));
        }
        self.active.push(id);
        let out = self.query(id);
        self.active.pop();
        out
    }

    fn query(&mut self, id: QueryId) -> Result<String, QueryAstError> {
        let arena = self.arena;
        let q = arena.get(id)?;
        // select items are emitted before FROM and may reference the derived alias
        if let QuerySource::Subquery(sub) = q.source {
            let alias = self.derived_alias(q, sub)?;
            self.from_aliases.insert(sub, alias);
        }

        if let Some(Paging::Page { page, size }) = q.paging
            && self.dialect.tokens().paging == PagingStrategy::RowNumber
        {
            return self.row_number_page(q, page, size);
        }

        // a leading TOP would cap only the first branch of a set operation
        if let Some(n) = q.top
            && q.paging.is_none()
            && let Some(top) = self.dialect.emit_top(n)
        {
            if q.set_operations.is_empty() {
                let mut sql = self.select(q, Some(&top))?;
                if let Some(order) = self.order_by(&q.order_by)? {
                    sql.push_str(" ORDER BY ");
                    sql.push_str(&order);
                }
                return Ok(sql);
            }
            let inner = self.combined_select(q)?;
            let mut sql = format!("SELECT {}* FROM ({}) {}", top, inner, COMBINED_ALIAS);
            if let Some(order) = self.output_order_by(&q.order_by)? {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order);
            }
            return Ok(sql);
        }

        let mut sql = self.combined_select(q)?;
        let order = self.order_by(&q.order_by)?;
        match q.paging {
            Some(Paging::SkipTake { skip, take }) => {
                let take = capped_take(skip, take, q.top)?;
                sql.push_str(&self.ordered_for_offset(order));
                sql.push_str(&self.dialect.emit_limit(take, skip));
            }
            Some(Paging::Page { page, size }) => {
                let (beg, _) = page_bounds(page, size);
                let take = capped_take(beg - 1, Some(size), q.top)?;
                sql.push_str(&self.ordered_for_offset(order));
                let clause = match self.dialect.tokens().paging {
                    PagingStrategy::OffsetFetch => self.dialect.emit_offset_fetch(take, beg - 1),
                    _ => self.dialect.emit_limit(take, beg - 1),
                };
                sql.push_str(&clause);
            }
            None => {
                if let Some(order) = order {
                    sql.push_str(" ORDER BY ");
                    sql.push_str(&order);
                }
                if let Some(n) = q.top {
                    sql.push_str(&self.dialect.emit_trailing_top(n));
                }
            }
        }
        Ok(sql)
    }

    /// `SELECT [DISTINCT] [top] list FROM ..` without set operations or ordering.
    fn select(&mut self, q: &Query, top: Option<&str>) -> Result<String, QueryAstError> {
        let mut sql = String::from("SELECT ");
        if q.distinct {
            sql.push_str(self.dialect.emit_distinct());
            sql.push(' ');
        }
        if let Some(top) = top {
            sql.push_str(top);
        }
        sql.push_str(&self.select_list(q)?);
        sql.push_str(&self.body(q)?);
        Ok(sql)
    }

    /// The query followed by its UNION / INTERSECT / EXCEPT branches.
    fn combined_select(&mut self, q: &Query) -> Result<String, QueryAstError> {
        let mut sql = self.select(q, None)?;
        for op in &q.set_operations {
            let other = self.nested(op.query)?;
            sql.push_str(&format!(" {} {}", self.dialect.emit_set_operation(&op.kind), other));
        }
        Ok(sql)
    }

    fn ordered_for_offset(&self, order: Option<String>) -> String {
        match order {
            Some(o) => format!(" ORDER BY {}", o),
            None if self.dialect.offset_requires_order_by() => " ORDER BY (SELECT NULL)".to_string(),
            None => String::new(),
        }
    }

    /// FROM, joins, WHERE, GROUP BY and HAVING.
    fn body(&mut self, q: &Query) -> Result<String, QueryAstError> {
        let arena = self.arena;
        let mut sql = String::from(" FROM ");
        sql.push_str(&self.source(q)?);
        for join in &q.joins {
            self.dialect.check_join(&join.kind)?;
            let joined = arena.get(join.query)?;
            sql.push(' ');
            sql.push_str(self.dialect.emit_join_kind(&join.kind));
            sql.push(' ');
            sql.push_str(&self.source(joined)?);
            if join.kind != JoinType::Cross {
                sql.push_str(" ON ");
                sql.push_str(&self.tree(&join.on)?);
            }
        }
        if !q.where_tree.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.tree(&q.where_tree)?);
        }
        if !q.group_by.is_empty() {
            let list = q
                .group_by
                .iter()
                .map(|e| self.expression(e))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            sql.push_str(" GROUP BY ");
            if q.with_rollup {
                sql.push_str(&self.dialect.emit_rollup(&list));
            } else {
                sql.push_str(&list);
            }
        }
        if !q.having_tree.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.tree(&q.having_tree)?);
        }
        Ok(sql)
    }

    fn source(&mut self, q: &Query) -> Result<String, QueryAstError> {
        match &q.source {
            QuerySource::Table { catalog, schema, name } => {
                let mut parts = Vec::with_capacity(3);
                let catalog = catalog.as_deref().or(self.config.default_catalog.as_deref());
                let schema = schema.as_deref().or(self.config.default_schema.as_deref());
                if let Some(c) = catalog {
                    parts.push(self.dialect.quote_ident(c));
                    // catalog..table keeps the default schema on SQL Server
                    if schema.is_none() {
                        parts.push(String::new());
                    }
                }
                if let Some(s) = schema {
                    parts.push(self.dialect.quote_ident(s));
                }
                parts.push(self.dialect.quote_ident(name));
                let mut out = parts.join(".");
                if let Some(alias) = &q.alias {
                    out.push(' ');
                    out.push_str(alias);
                }
                if q.no_lock {
                    out.push_str(self.dialect.emit_no_lock());
                }
                Ok(out)
            }
            QuerySource::Subquery(sub) => {
                let alias = self.derived_alias(q, *sub)?;
                self.from_aliases.insert(*sub, alias.clone());
                let inner = self.nested(*sub)?;
                Ok(match alias {
                    Some(a) => format!("({}) {}", inner, a),
                    None => format!("({})", inner),
                })
            }
            QuerySource::None => Err(QueryAstError::Emit(format!(
                "query {} has neither a table nor a subquery source",
                q.id.map(|i| i.0).unwrap_or_default()
            ))),
        }
    }

    /// Name of a derived table: the outer query's alias, else the inner one's.
    fn derived_alias(&self, outer: &Query, sub: QueryId) -> Result<Option<String>, QueryAstError> {
        Ok(match &outer.alias {
            Some(a) => Some(a.clone()),
            None => self.arena.get(sub)?.alias.clone(),
        })
    }

    /// Alias qualifying columns of `scope`. Outside a from-subquery its
    /// columns take the alias the outer query gave it.
    fn qualifier(&self, scope: Option<QueryId>) -> Option<String> {
        let id = scope?;
        if !self.active.contains(&id)
            && let Some(alias) = self.from_aliases.get(&id)
        {
            return alias.clone();
        }
        self.arena.get(id).ok()?.alias.clone()
    }

    fn select_list(&mut self, q: &Query) -> Result<String, QueryAstError> {
        let mut items = Vec::new();
        match &q.select {
            SelectList::All => {
                if !q.count_all {
                    let star = match q.from_subquery().and_then(|s| self.qualifier(Some(s))) {
                        Some(alias) if q.joins.is_empty() => format!("{}.*", alias),
                        _ => "*".to_string(),
                    };
                    items.push(star);
                }
            }
            SelectList::Items(list) => {
                for item in list {
                    items.push(self.select_item(item)?);
                }
            }
            SelectList::AllExcept(excluded) => {
                let Some(meta) = &q.metadata else {
                    return Err(QueryAstError::Emit(format!(
                        "select_all_except on {} needs provider metadata",
                        q.table_name().unwrap_or("a derived query")
                    )));
                };
                let qualifier = q.alias.clone();
                for name in meta.column_names() {
                    if excluded.iter().any(|c| c.name == name) {
                        continue;
                    }
                    let col = ColumnRef::unscoped(name);
                    items.push(self.dialect.emit_column_name(qualifier.as_deref(), &col));
                }
            }
        }
        if q.count_all {
            let alias = q
                .count_all_alias
                .as_deref()
                .unwrap_or(&self.config.count_all_alias);
            items.push(format!("COUNT(*) AS {}", self.dialect.quote_alias(alias)));
        }
        Ok(items.join(", "))
    }

    fn select_item(&mut self, item: &SelectItem) -> Result<String, QueryAstError> {
        match item {
            SelectItem::Expr(e) => {
                let sql = self.expression(e)?;
                Ok(match select_alias(e) {
                    Some(alias) => format!("{} AS {}", sql, self.dialect.quote_alias(alias)),
                    None => sql,
                })
            }
            SelectItem::AllOf(id) => Ok(match self.qualifier(Some(*id)) {
                Some(alias) => format!("{}.*", alias),
                None => "*".to_string(),
            }),
            SelectItem::Subquery { query, alias } => {
                let inner = self.nested(*query)?;
                Ok(format!("({}) AS {}", inner, self.dialect.quote_alias(alias)))
            }
        }
    }

    fn expression(&mut self, e: &Expression) -> Result<String, QueryAstError> {
        let base = match &e.kind {
            ExpressionKind::Column(c) => {
                let qualifier = self.qualifier(c.scope);
                self.dialect.emit_column_name(qualifier.as_deref(), c)
            }
            ExpressionKind::Math(m) => self.arithmetic(m)?,
            ExpressionKind::Case(c) => self.case(c)?,
            ExpressionKind::Literal(v, _) => self.dialect.emit_literal(v),
        };
        Ok(apply_sub_operators(&base, &e.sub_operators, e.is_distinct(), self.dialect))
    }

    fn arithmetic(&mut self, m: &ArithmeticExpr) -> Result<String, QueryAstError> {
        let left = self.expression(&m.left)?;
        let right = match &m.right {
            MathOperand::Expr(e) => self.expression(e)?,
            MathOperand::Value(v) => self.dialect.emit_literal(v),
        };
        let (first, second) = if m.item_first { (left, right) } else { (right, left) };
        if m.is_concatenation() {
            return Ok(self.dialect.emit_concat(&first, &second));
        }
        Ok(format!("({} {} {})", first, m.operator.symbol(), second))
    }

    fn case(&mut self, c: &CaseExpr) -> Result<String, QueryAstError> {
        let mut sql = String::from("CASE");
        if let Some(operand) = &c.operand {
            sql.push(' ');
            sql.push_str(&self.expression(operand)?);
        }
        for clause in &c.clauses {
            let when = match &clause.when {
                Condition::Tree(t) => self.tree(t)?,
                Condition::Raw(text) => text.clone(),
                Condition::Expr(e) => self.expression(e)?,
            };
            let then = self.expression(&clause.then)?;
            sql.push_str(&format!(" WHEN {} THEN {}", when, then));
        }
        if let Some(otherwise) = &c.otherwise {
            sql.push_str(" ELSE ");
            sql.push_str(&self.expression(otherwise)?);
        }
        sql.push_str(" END");
        Ok(sql)
    }

    fn order_by(&mut self, items: &[OrderItem]) -> Result<Option<String>, QueryAstError> {
        self.ordering(items, false)
    }

    /// ORDER BY over a combined result: each item is named by its output column.
    fn output_order_by(&mut self, items: &[OrderItem]) -> Result<Option<String>, QueryAstError> {
        self.ordering(items, true)
    }

    fn ordering(&mut self, items: &[OrderItem], by_output: bool) -> Result<Option<String>, QueryAstError> {
        if items.is_empty() {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let raw = item.expr.column_ref().is_some_and(|c| c.is_raw());
            let sql = match item.expr.effective_alias() {
                Some(name) if by_output && !raw => self.dialect.quote_alias(name),
                _ => self.expression(&item.expr)?,
            };
            out.push(match item.direction {
                Direction::Ascending => format!("{} ASC", sql),
                Direction::Unassigned if raw => sql,
                _ => format!("{} DESC", sql),
            });
        }
        Ok(Some(out.join(", ")))
    }

    /// `WITH cte AS (SELECT .., ROW_NUMBER() OVER(..) AS rn ..) SELECT .. WHERE rn BETWEEN a AND b`
    ///
    /// Set operations are numbered as one derived source; a row cap clips
    /// the upper bound.
    fn row_number_page(&mut self, q: &Query, page: u64, size: u64) -> Result<String, QueryAstError> {
        let (beg, _) = page_bounds(page, size);
        let take = capped_take(beg - 1, Some(size), q.top)?.unwrap_or(size);
        let end = beg - 1 + take;
        let config = self.config;
        let cte = &config.paging_cte_name;
        let rn = &config.row_number_alias;

        let inner = if q.set_operations.is_empty() {
            let mut inner = String::from("SELECT ");
            if q.distinct {
                inner.push_str(self.dialect.emit_distinct());
                inner.push(' ');
            }
            inner.push_str(&self.select_list(q)?);
            let order = self
                .order_by(&q.order_by)?
                .unwrap_or_else(|| "(SELECT NULL)".to_string());
            inner.push_str(&format!(", ROW_NUMBER() OVER(ORDER BY {}) AS {}", order, rn));
            inner.push_str(&self.body(q)?);
            inner
        } else {
            let combined = self.combined_select(q)?;
            let order = self
                .output_order_by(&q.order_by)?
                .unwrap_or_else(|| "(SELECT NULL)".to_string());
            format!(
                "SELECT *, ROW_NUMBER() OVER(ORDER BY {}) AS {} FROM ({}) {}",
                order, rn, combined, COMBINED_ALIAS
            )
        };

        let outer_columns = match output_names(q, &config.count_all_alias) {
            Some(names) if q.joins.is_empty() => names
                .iter()
                .map(|n| self.dialect.quote_alias(n))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };
        Ok(format!(
            "WITH {cte} AS ({inner}) SELECT {outer_columns} FROM {cte} WHERE {rn} BETWEEN {beg} AND {end}"
        ))
    }

    fn tree(&mut self, tree: &PredicateTree) -> Result<String, QueryAstError> {
        let mut out = String::new();
        if tree.negated {
            out.push_str("NOT ");
        }
        for token in &tree.tokens {
            match token {
                Comparison::Paren(Paren::Open) => {
                    separate(&mut out);
                    out.push('(');
                }
                Comparison::Paren(Paren::Close) => out.push(')'),
                Comparison::Conjunction(c) => {
                    out.push(' ');
                    out.push_str(c.keyword());
                }
                Comparison::Not => {
                    separate(&mut out);
                    out.push_str("NOT");
                }
                Comparison::Literal(text) => {
                    separate(&mut out);
                    out.push_str(text);
                }
                Comparison::Predicate(p) => {
                    separate(&mut out);
                    let sql = self.predicate(p)?;
                    out.push_str(&sql);
                }
            }
        }
        Ok(out)
    }

    fn predicate(&mut self, p: &Predicate) -> Result<String, QueryAstError> {
        if matches!(p.operand, Operand::Exists | Operand::NotExists) {
            let Some(sub) = p.subquery() else {
                return Err(QueryAstError::Emit("EXISTS without a subquery".into()));
            };
            let inner = self.nested(sub)?;
            // the subquery's ALL/ANY/SOME qualifier is ignored here; `EXISTS ANY (..)`
            // does not parse, so it only applies to comparisons against a subquery
            let keyword = if p.operand == Operand::Exists { "EXISTS" } else { "NOT EXISTS" };
            return Ok(format!("{} ({})", keyword, inner));
        }

        let Some(left_expr) = &p.left else {
            return Err(QueryAstError::Emit(format!("{:?} has no left operand", p.operand)));
        };
        let left = self.expression(left_expr)?;

        let sql = match p.operand {
            Operand::IsNull => format!("{} IS NULL", left),
            Operand::IsNotNull => format!("{} IS NOT NULL", left),
            Operand::Like | Operand::NotLike => {
                let keyword = if p.operand == Operand::Like { "LIKE" } else { "NOT LIKE" };
                let right = self.right_side(left_expr, &p.right, p.operand)?;
                let mut s = ordered(p.item_first, &left, keyword, &right);
                if let Some(escape) = p.like_escape {
                    s.push_str(&format!(" ESCAPE {}", self.dialect.quote_string(&escape.to_string())));
                }
                s
            }
            Operand::In | Operand::NotIn => {
                let keyword = if p.operand == Operand::In { "IN" } else { "NOT IN" };
                let list = match &p.right {
                    RightSide::Values(values) => self.inline_list(values),
                    RightSide::Value(Value::List(values)) => self.inline_list(values),
                    RightSide::Value(v) => self.dialect.emit_literal(v),
                    RightSide::Subquery(id) => self.nested(*id)?,
                    RightSide::Expr(e) => self.expression(e)?,
                    RightSide::None | RightSide::Range(..) => {
                        return Err(QueryAstError::Emit(format!("{} needs a list or a subquery", keyword)));
                    }
                };
                format!("{} {} ({})", left, keyword, list)
            }
            Operand::Between => {
                let RightSide::Range(low, high) = &p.right else {
                    return Err(QueryAstError::Emit("BETWEEN needs two bounds".into()));
                };
                let low = self.bound(left_expr, low)?;
                let high = self.bound(left_expr, high)?;
                format!("{} BETWEEN {} AND {}", left, low, high)
            }
            Operand::Contains => {
                let right = self.right_side(left_expr, &p.right, p.operand)?;
                format!("CONTAINS({}, {})", left, right)
            }
            _ => {
                let symbol = p.operand.symbol().unwrap_or("=");
                let right = self.right_side(left_expr, &p.right, p.operand)?;
                ordered(p.item_first, &left, symbol, &right)
            }
        };
        Ok(sql)
    }

    fn right_side(&mut self, left: &Expression, right: &RightSide, operand: Operand) -> Result<String, QueryAstError> {
        match right {
            RightSide::Value(v) => Ok(self.bind(Some(left), v)),
            RightSide::Expr(e) => self.expression(e),
            RightSide::Subquery(id) => {
                let qualifier = self
                    .arena
                    .get(*id)?
                    .search_condition
                    .map(|s| format!("{} ", s.keyword()))
                    .unwrap_or_default();
                let inner = self.nested(*id)?;
                Ok(format!("{}({})", qualifier, inner))
            }
            RightSide::None | RightSide::Values(_) | RightSide::Range(..) => Err(QueryAstError::Emit(format!(
                "{:?} has no usable right-hand side",
                operand
            ))),
        }
    }

    fn bound(&mut self, left: &Expression, bound: &RangeBound) -> Result<String, QueryAstError> {
        match bound {
            RangeBound::Value(v) => Ok(self.bind(Some(left), v)),
            RangeBound::Expr(e) => self.expression(e),
        }
    }

    fn inline_list(&self, values: &[Value]) -> String {
        if values.is_empty() {
            return self.dialect.emit_null();
        }
        Value::flatten_once(values)
            .into_iter()
            .map(|v| self.dialect.emit_literal(v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Add a parameter for `value` and return its placeholder.
    fn bind(&mut self, left: Option<&Expression>, value: &Value) -> String {
        let tokens = self.dialect.tokens();
        let name = tokens.parameter_name(&self.config.parameter_name_stem, self.params.len() + 1);
        let placeholder = tokens.placeholder(&name);
        let param = match left.and_then(|e| self.prototype_for(e)) {
            Some(proto) => proto.instantiate(name, value.clone()),
            None => Parameter::adhoc(name, value.clone()),
        };
        self.params.push(param);
        placeholder
    }

    /// Cached prototype for a plain (or type-preserving) column reference.
    fn prototype_for(&self, e: &Expression) -> Option<Parameter> {
        let column = e.column_ref()?;
        if column.is_raw() || !e.sub_operators.iter().all(|op| op.kind.preserves_type()) {
            return None;
        }
        let owner = column.scope.or_else(|| self.active.last().copied())?;
        let query = self.arena.get(owner).ok()?;
        let meta = query.metadata.as_ref()?;
        self.cache.prototype(meta.as_ref(), self.dialect, &column.name)
    }
}

/// Derived-table alias for a set operation wrapped by paging or a row cap.
const COMBINED_ALIAS: &str = "combined";

/// Rows a window starting at `offset` may return once a row cap applies.
/// The cap counts from the first row of the ordered result.
fn capped_take(offset: u64, take: Option<u64>, top: Option<u64>) -> Result<Option<u64>, QueryAstError> {
    let Some(top) = top else {
        return Ok(take);
    };
    if top <= offset {
        return Err(QueryAstError::Construction(format!(
            "row cap {} ends before the first paged row {}",
            top,
            offset + 1
        )));
    }
    let left = top - offset;
    Ok(Some(take.map_or(left, |t| t.min(left))))
}

/// `AS` alias for a select item: only when something wraps the column or
/// an alias was given explicitly.
fn select_alias(e: &Expression) -> Option<&str> {
    if let Some(alias) = e.explicit_alias() {
        return Some(alias);
    }
    if e.column_ref().is_some_and(|c| c.is_raw()) {
        return None;
    }
    if e.sub_operators.is_empty() && !e.is_case() {
        return None;
    }
    e.effective_alias()
}

/// Output column names of an explicit select list, if all are nameable.
fn output_names(q: &Query, count_all_alias: &str) -> Option<Vec<String>> {
    let SelectList::Items(items) = &q.select else {
        return None;
    };
    let mut names = Vec::with_capacity(items.len() + 1);
    for item in items {
        match item {
            SelectItem::Expr(e) => {
                let name = match select_alias(e) {
                    Some(a) => a.to_string(),
                    None => match e.column_ref() {
                        Some(c) if !c.is_raw() => c.name.clone(),
                        _ => return None,
                    },
                };
                names.push(name);
            }
            SelectItem::Subquery { alias, .. } => names.push(alias.clone()),
            SelectItem::AllOf(_) => return None,
        }
    }
    if q.count_all {
        names.push(q.count_all_alias.clone().unwrap_or_else(|| count_all_alias.to_string()));
    }
    Some(names)
}

fn ordered(item_first: bool, left: &str, op: &str, right: &str) -> String {
    if item_first {
        format!("{} {} {}", left, op, right)
    } else {
        format!("{} {} {}", right, op, left)
    }
}

fn separate(out: &mut String) {
    if !out.is_empty() && !out.ends_with('(') && !out.ends_with(' ') {
        out.push(' ');
    }
}
