//! Relational query model and SQL compiler.
//!
//! Build queries in a [`QueryArena`] with the predicate / expression
//! builders, then hand the root id to a [`SqlCompiler`] for the target
//! backend. Output is SQL text plus the ordered, provider-typed parameters.

pub mod column;
pub mod comparison;
pub mod emitter;
pub mod errors;
pub mod expression;
pub mod plan_cache;
pub mod query;
pub mod sub_operator;
#[cfg(feature = "sql_validate")]
pub mod validate;
pub mod value;

pub use column::ColumnRef;
pub use comparison::{
    Comparison, Condition, Conjunction, Operand, Paren, Predicate, PredicateTree, RangeBound, RightSide, between,
    contains, eq, exists, ge, gt, in_list, in_values, is_not_null, is_null, le, like, like_escaped, lt, ne,
    not_exists, not_in, not_in_values, not_like, not_like_escaped, predicate_by_name,
};
pub use emitter::SqlCompiler;
pub use emitter::dialect::{PagingStrategy, SqlDialect, TokenTable, get_dialect};
pub use errors::*;
pub use expression::{ArithmeticOperator, CaseExpr, Direction, Expression, OrderItem};
pub use plan_cache::{ColumnMetadata, EntityMetadata, MetadataCatalog, ParameterCache, ProviderMetadata, TypeMap};
pub use query::{
    JoinType, Paging, Query, QueryArena, QueryId, QueryMut, SearchCondition, SelectItem, SetOperationKind,
    page_bounds,
};
pub use sub_operator::{SubOperator, SubOperatorKind};
pub use value::Value;

use crate::models::enums::DatabaseType;
use crate::models::structs::CompiledQuery;

/// One-shot compile with a throwaway prototype cache.
pub fn compile(arena: &QueryArena, root: QueryId, db_type: DatabaseType) -> Result<CompiledQuery, QueryAstError> {
    SqlCompiler::new(db_type).compile(arena, root)
}
