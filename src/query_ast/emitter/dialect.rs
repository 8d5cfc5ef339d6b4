//! Database dialect trait for extensible SQL emission
//!
//! Each database dialect implements this trait to provide
//! database-specific SQL generation logic. Punctuation lives in a
//! [`TokenTable`] so deployments can override quoting without new code.

use std::collections::HashMap;

use chrono::Timelike;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::super::column::ColumnRef;
use super::super::errors::QueryAstError;
use super::super::query::{JoinType, SetOperationKind};
use super::super::sub_operator::{SubOperator, SubOperatorKind, SubOperatorTokens};
use super::super::value::Value;
use crate::models::enums::{DatabaseType, LogicalType, ProviderType};

/// How page/page-size and skip/take are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PagingStrategy {
    /// `WITH cte AS (... ROW_NUMBER() OVER(...) AS rn ...) SELECT ... WHERE rn BETWEEN a AND b`
    RowNumber,
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

/// Per-backend quoting and parameter punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTable {
    pub ident_open: String,
    pub ident_close: String,
    pub string_open: String,
    pub string_close: String,
    pub alias_open: String,
    pub alias_close: String,
    pub proc_open: String,
    pub proc_close: String,
    pub param_prefix: String,
    /// Placeholders are the bare prefix (`?`); parameters keep ordered names.
    #[serde(default)]
    pub positional: bool,
    pub paging: PagingStrategy,
}

impl TokenTable {
    fn new(ident: (&str, &str), alias: (&str, &str), param_prefix: &str, paging: PagingStrategy) -> Self {
        Self {
            ident_open: ident.0.to_string(),
            ident_close: ident.1.to_string(),
            string_open: "'".to_string(),
            string_close: "'".to_string(),
            alias_open: alias.0.to_string(),
            alias_close: alias.1.to_string(),
            proc_open: ident.0.to_string(),
            proc_close: ident.1.to_string(),
            param_prefix: param_prefix.to_string(),
            positional: false,
            paging,
        }
    }

    fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn for_database(db_type: &DatabaseType) -> Self {
        match db_type {
            DatabaseType::MsSQL => Self::new(("[", "]"), ("[", "]"), "@", PagingStrategy::RowNumber),
            DatabaseType::PostgreSQL => Self::new(("\"", "\""), ("\"", "\""), ":", PagingStrategy::LimitOffset),
            DatabaseType::MySQL => Self::new(("`", "`"), ("`", "`"), "?", PagingStrategy::LimitOffset).positional(),
            DatabaseType::SQLite => Self::new(("\"", "\""), ("\"", "\""), "@", PagingStrategy::LimitOffset),
            DatabaseType::Oracle => Self::new(("\"", "\""), ("\"", "\""), ":", PagingStrategy::OffsetFetch),
        }
    }

    fn wrap(open: &str, close: &str, s: &str) -> String {
        if close.is_empty() {
            return format!("{open}{s}");
        }
        format!("{}{}{}", open, s.replace(close, &format!("{close}{close}")), close)
    }

    pub fn quote_ident(&self, ident: &str) -> String {
        Self::wrap(&self.ident_open, &self.ident_close, ident)
    }

    pub fn quote_alias(&self, alias: &str) -> String {
        Self::wrap(&self.alias_open, &self.alias_close, alias)
    }

    pub fn quote_string(&self, s: &str) -> String {
        Self::wrap(&self.string_open, &self.string_close, s)
    }

    /// Quote a possibly schema-qualified stored procedure name.
    pub fn quote_procedure(&self, name: &str) -> String {
        name.split('.')
            .map(|p| Self::wrap(&self.proc_open, &self.proc_close, p))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn parameter_name(&self, stem: &str, ordinal: usize) -> String {
        if self.positional {
            return format!("{}{}", stem, ordinal);
        }
        format!("{}{}{}", self.param_prefix, stem, ordinal)
    }

    /// Text standing in for the parameter called `name` in the SQL.
    pub fn placeholder(&self, name: &str) -> String {
        if self.positional {
            return self.param_prefix.clone();
        }
        name.to_string()
    }
}

/// Trait for database-specific SQL dialect
pub trait SqlDialect: Send + Sync {
    /// Get the database type
    fn db_type(&self) -> DatabaseType;

    fn tokens(&self) -> &TokenTable;

    /// Quote an identifier (table/column name)
    fn quote_ident(&self, ident: &str) -> String {
        self.tokens().quote_ident(ident)
    }

    fn quote_alias(&self, alias: &str) -> String {
        self.tokens().quote_alias(alias)
    }

    /// Quote a string literal
    fn quote_string(&self, s: &str) -> String {
        self.tokens().quote_string(s)
    }

    /// Emit boolean literal
    fn emit_boolean(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    /// Emit NULL literal
    fn emit_null(&self) -> String {
        "NULL".to_string()
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode(bytes))
    }

    fn emit_date(&self, text: &str) -> String {
        self.quote_string(text)
    }

    fn emit_datetime(&self, text: &str) -> String {
        self.quote_string(text)
    }

    /// Inline a literal value.
    fn emit_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => self.emit_null(),
            Value::Bool(b) => self.emit_boolean(*b),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) | Value::Guid(s) => self.quote_string(s),
            Value::Date(d) => self.emit_date(&d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => {
                let text = if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
                };
                self.emit_datetime(&text)
            }
            Value::Binary(b) => self.emit_binary(b),
            Value::List(items) => Value::flatten_once(items)
                .into_iter()
                .map(|v| self.emit_literal(v))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Emit LIMIT clause
    fn emit_limit(&self, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (Some(l), 0) => format!(" LIMIT {}", l),
            (Some(l), o) => format!(" LIMIT {} OFFSET {}", l, o),
            (None, 0) => String::new(),
            (None, o) => format!(" OFFSET {}", o),
        }
    }

    /// Emit `OFFSET .. FETCH` clause (requires ORDER BY on most engines)
    fn emit_offset_fetch(&self, limit: Option<u64>, offset: u64) -> String {
        match limit {
            Some(l) => format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, l),
            None => format!(" OFFSET {} ROWS", offset),
        }
    }

    /// Text injected right after `SELECT [DISTINCT]` for a row cap, if the
    /// dialect caps rows there. Otherwise the cap is emitted as a trailing clause.
    fn emit_top(&self, _n: u64) -> Option<String> {
        None
    }

    fn emit_trailing_top(&self, n: u64) -> String {
        self.emit_limit(Some(n), 0)
    }

    /// Whether `OFFSET ..` is only valid after an ORDER BY.
    fn offset_requires_order_by(&self) -> bool {
        false
    }

    /// Emit DISTINCT keyword
    fn emit_distinct(&self) -> &'static str {
        "DISTINCT"
    }

    /// Emit JOIN keyword for given kind
    fn emit_join_kind(&self, kind: &JoinType) -> &'static str {
        match kind {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }

    fn emit_set_operation(&self, kind: &SetOperationKind) -> &'static str {
        match kind {
            SetOperationKind::Union => "UNION",
            SetOperationKind::UnionAll => "UNION ALL",
            SetOperationKind::Intersect => "INTERSECT",
            SetOperationKind::Except => "EXCEPT",
        }
    }

    /// Table hint appended after a source when no-lock reads are requested.
    fn emit_no_lock(&self) -> &'static str {
        ""
    }

    /// GROUP BY list with rollup semantics.
    fn emit_rollup(&self, group_list: &str) -> String {
        format!("{} WITH ROLLUP", group_list)
    }

    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// String concatenation of two emitted operands.
    fn emit_concat(&self, left: &str, right: &str) -> String {
        format!("({} {} {})", left, self.concat_operator(), right)
    }

    fn supports_full_join(&self) -> bool {
        !matches!(self.db_type(), DatabaseType::MySQL | DatabaseType::SQLite)
    }

    fn check_join(&self, kind: &JoinType) -> Result<(), QueryAstError> {
        if *kind == JoinType::Full && !self.supports_full_join() {
            return Err(QueryAstError::Unsupported(
                "FULL JOIN not supported by this database",
            ));
        }
        Ok(())
    }

    /// Scalar/aggregate function name for a sub-operator.
    fn function_name(&self, kind: SubOperatorKind) -> &'static str {
        default_function_name(kind)
    }

    fn trim_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens::call(format!("{}(", self.function_name(SubOperatorKind::Trim)))
    }

    fn date_truncate_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens::call("DATE(")
    }

    fn date_part_tokens(&self, part: &str) -> SubOperatorTokens {
        SubOperatorTokens::call(format!("EXTRACT({} FROM ", part.to_ascii_uppercase()))
    }

    /// Native type name used as a CAST target.
    fn cast_type_name(&self, ty: LogicalType, length: Option<i64>, precision: Option<u8>, scale: Option<u8>) -> String {
        match ty {
            LogicalType::Boolean => "boolean".into(),
            LogicalType::Byte | LogicalType::Int16 => "smallint".into(),
            LogicalType::Int32 => "integer".into(),
            LogicalType::Int64 => "bigint".into(),
            LogicalType::Decimal => match (precision, scale) {
                (Some(p), Some(s)) => format!("numeric({},{})", p, s),
                (Some(p), None) => format!("numeric({})", p),
                _ => "numeric".into(),
            },
            LogicalType::Single => "real".into(),
            LogicalType::Double => "double precision".into(),
            LogicalType::String => match length {
                Some(l) => format!("varchar({})", l),
                None => "text".into(),
            },
            LogicalType::Date => "date".into(),
            LogicalType::Time => "time".into(),
            LogicalType::DateTime => "timestamp".into(),
            LogicalType::DateTimeOffset => "timestamptz".into(),
            LogicalType::Guid => "uuid".into(),
            LogicalType::Binary => "bytea".into(),
            LogicalType::Unknown => "text".into(),
        }
    }

    /// Opening token and trailing fragments for one sub-operator.
    fn sub_operator_tokens(&self, op: &SubOperator, distinct: bool) -> SubOperatorTokens {
        let p = &op.params;
        match op.kind {
            SubOperatorKind::Trim => self.trim_tokens(),
            SubOperatorKind::DateTruncate => self.date_truncate_tokens(),
            SubOperatorKind::DatePart => self.date_part_tokens(p.date_part.as_deref().unwrap_or("year")),
            SubOperatorKind::Substring => {
                let mut trailing = Vec::with_capacity(5);
                if let Some(start) = p.start {
                    trailing.push(",".to_string());
                    trailing.push(start.to_string());
                }
                if let Some(length) = p.length {
                    trailing.push(",".to_string());
                    trailing.push(length.to_string());
                }
                trailing.push(")".to_string());
                SubOperatorTokens {
                    open: format!("{}(", self.function_name(op.kind)),
                    trailing,
                }
            }
            SubOperatorKind::Coalesce => SubOperatorTokens {
                open: format!("{}(", self.function_name(op.kind)),
                trailing: vec![
                    ",".to_string(),
                    self.emit_literal(p.value.as_ref().unwrap_or(&Value::Null)),
                    ")".to_string(),
                ],
            },
            SubOperatorKind::Round => SubOperatorTokens {
                open: format!("{}(", self.function_name(op.kind)),
                trailing: vec![",".to_string(), p.digits.unwrap_or(0).to_string(), ")".to_string()],
            },
            SubOperatorKind::Cast => SubOperatorTokens {
                open: "CAST(".to_string(),
                trailing: vec![
                    format!(
                        " AS {}",
                        self.cast_type_name(p.cast_type.unwrap_or_default(), p.length, p.precision, p.scale)
                    ),
                    ")".to_string(),
                ],
            },
            kind if kind.is_aggregate() && distinct => {
                SubOperatorTokens::call(format!("{}(DISTINCT ", self.function_name(kind)))
            }
            kind => SubOperatorTokens::call(format!("{}(", self.function_name(kind))),
        }
    }

    /// Whether native type names are matched case-insensitively.
    fn native_types_case_insensitive(&self) -> bool {
        true
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType>;

    /// Map a backend native type name (`nvarchar`, `int4`, ...) to a provider type.
    fn provider_type(&self, native_type: &str) -> Option<ProviderType> {
        // strip any length suffix: varchar(50) -> varchar
        let base = native_type.split('(').next().unwrap_or(native_type).trim();
        if self.native_types_case_insensitive() {
            self.native_type_table().get(base.to_ascii_lowercase().as_str()).copied()
        } else {
            self.native_type_table().get(base).copied()
        }
    }

    /// Fixed (precision, scale) the provider expects for temporal parameters.
    fn temporal_precision_scale(&self, _ty: ProviderType) -> (Option<u8>, Option<u8>) {
        (None, None)
    }

    /// Qualify a column: `alias.[name]` or `[name]`, raw fragments verbatim.
    fn emit_column_name(&self, qualifier: Option<&str>, column: &ColumnRef) -> String {
        if let Some(raw) = column.raw_text() {
            return raw.to_string();
        }
        match qualifier {
            Some(q) => format!("{}.{}", q, self.quote_ident(&column.name)),
            None => self.quote_ident(&column.name),
        }
    }
}

static MSSQL_TYPES: Lazy<HashMap<&'static str, ProviderType>> = Lazy::new(|| {
    use ProviderType::*;
    HashMap::from([
        ("bit", Boolean),
        ("tinyint", TinyInt),
        ("smallint", SmallInt),
        ("int", Int),
        ("bigint", BigInt),
        ("decimal", Decimal),
        ("numeric", Decimal),
        ("money", Money),
        ("smallmoney", Money),
        ("real", Real),
        ("float", Float),
        ("char", Char),
        ("nchar", NChar),
        ("varchar", VarChar),
        ("nvarchar", NVarChar),
        ("text", Text),
        ("ntext", NText),
        ("date", Date),
        ("time", Time),
        ("datetime", DateTime),
        ("smalldatetime", DateTime),
        ("datetime2", DateTime2),
        ("datetimeoffset", DateTimeOffset),
        ("uniqueidentifier", Uuid),
        ("binary", Binary),
        ("varbinary", VarBinary),
        ("image", VarBinary),
        ("xml", Xml),
        ("sql_variant", Variant),
    ])
});

static POSTGRES_TYPES: Lazy<HashMap<&'static str, ProviderType>> = Lazy::new(|| {
    use ProviderType::*;
    HashMap::from([
        ("boolean", Boolean),
        ("bool", Boolean),
        ("smallint", SmallInt),
        ("int2", SmallInt),
        ("integer", Int),
        ("int", Int),
        ("int4", Int),
        ("bigint", BigInt),
        ("int8", BigInt),
        ("numeric", Decimal),
        ("decimal", Decimal),
        ("money", Money),
        ("real", Real),
        ("float4", Real),
        ("double precision", Float),
        ("float8", Float),
        ("char", Char),
        ("character", Char),
        ("bpchar", Char),
        ("varchar", VarChar),
        ("character varying", VarChar),
        ("text", Text),
        ("date", Date),
        ("time", Time),
        ("timestamp", Timestamp),
        ("timestamptz", TimestampTz),
        ("timestamp with time zone", TimestampTz),
        ("uuid", Uuid),
        ("bytea", VarBinary),
        ("json", Json),
        ("jsonb", Json),
        ("xml", Xml),
    ])
});

static MYSQL_TYPES: Lazy<HashMap<&'static str, ProviderType>> = Lazy::new(|| {
    use ProviderType::*;
    HashMap::from([
        ("bit", Boolean),
        ("bool", Boolean),
        ("tinyint", TinyInt),
        ("smallint", SmallInt),
        ("mediumint", Int),
        ("int", Int),
        ("integer", Int),
        ("bigint", BigInt),
        ("decimal", Decimal),
        ("numeric", Decimal),
        ("float", Real),
        ("double", Float),
        ("char", Char),
        ("varchar", VarChar),
        ("tinytext", Text),
        ("text", Text),
        ("mediumtext", Text),
        ("longtext", Text),
        ("date", Date),
        ("time", Time),
        ("datetime", DateTime),
        ("timestamp", Timestamp),
        ("binary", Binary),
        ("varbinary", VarBinary),
        ("blob", VarBinary),
        ("longblob", VarBinary),
        ("json", Json),
    ])
});

static SQLITE_TYPES: Lazy<HashMap<&'static str, ProviderType>> = Lazy::new(|| {
    use ProviderType::*;
    HashMap::from([
        ("integer", BigInt),
        ("int", BigInt),
        ("bit", Boolean),
        ("boolean", Boolean),
        ("real", Float),
        ("float", Float),
        ("double", Float),
        ("numeric", Decimal),
        ("decimal", Decimal),
        ("text", Text),
        ("varchar", VarChar),
        ("nvarchar", NVarChar),
        ("char", Char),
        ("date", Date),
        ("datetime", DateTime),
        ("guid", Uuid),
        ("uniqueidentifier", Uuid),
        ("blob", VarBinary),
    ])
});

// Oracle reports type names in upper case; matched as-is.
static ORACLE_TYPES: Lazy<HashMap<&'static str, ProviderType>> = Lazy::new(|| {
    use ProviderType::*;
    HashMap::from([
        ("NUMBER", Decimal),
        ("FLOAT", Float),
        ("BINARY_FLOAT", Real),
        ("BINARY_DOUBLE", Float),
        ("CHAR", Char),
        ("NCHAR", NChar),
        ("VARCHAR2", VarChar),
        ("NVARCHAR2", NVarChar),
        ("CLOB", Text),
        ("NCLOB", NText),
        ("DATE", DateTime),
        ("TIMESTAMP", Timestamp),
        ("TIMESTAMP WITH TIME ZONE", TimestampTz),
        ("RAW", Binary),
        ("BLOB", VarBinary),
        ("XMLTYPE", Xml),
    ])
});

/// MS SQL Server dialect
pub struct MssqlDialect {
    tokens: TokenTable,
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self { tokens: TokenTable::for_database(&DatabaseType::MsSQL) }
    }
}

impl SqlDialect for MssqlDialect {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MsSQL
    }

    fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    fn emit_limit(&self, limit: Option<u64>, offset: u64) -> String {
        self.emit_offset_fetch(limit, offset)
    }

    fn offset_requires_order_by(&self) -> bool {
        true
    }

    fn emit_top(&self, n: u64) -> Option<String> {
        Some(format!("TOP ({}) ", n))
    }

    fn emit_no_lock(&self) -> &'static str {
        " WITH (NOLOCK)"
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn function_name(&self, kind: SubOperatorKind) -> &'static str {
        match kind {
            SubOperatorKind::Length => "LEN",
            SubOperatorKind::StdDev => "STDEV",
            SubOperatorKind::Var => "VAR",
            SubOperatorKind::DatePart => "DATEPART",
            other => default_function_name(other),
        }
    }

    fn trim_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens {
            open: "LTRIM(RTRIM(".to_string(),
            trailing: vec!["))".to_string()],
        }
    }

    fn date_truncate_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens {
            open: "CAST(".to_string(),
            trailing: vec![" AS date".to_string(), ")".to_string()],
        }
    }

    fn date_part_tokens(&self, part: &str) -> SubOperatorTokens {
        SubOperatorTokens::call(format!("DATEPART({},", part.to_ascii_lowercase()))
    }

    fn cast_type_name(&self, ty: LogicalType, length: Option<i64>, precision: Option<u8>, scale: Option<u8>) -> String {
        match ty {
            LogicalType::Boolean => "bit".into(),
            LogicalType::Byte => "tinyint".into(),
            LogicalType::Int16 => "smallint".into(),
            LogicalType::Int32 => "int".into(),
            LogicalType::Int64 => "bigint".into(),
            LogicalType::Decimal => match (precision, scale) {
                (Some(p), Some(s)) => format!("decimal({},{})", p, s),
                (Some(p), None) => format!("decimal({})", p),
                _ => "decimal".into(),
            },
            LogicalType::Single => "real".into(),
            LogicalType::Double => "float".into(),
            LogicalType::String | LogicalType::Unknown => match length {
                Some(l) => format!("nvarchar({})", l),
                None => "nvarchar(max)".into(),
            },
            LogicalType::Date => "date".into(),
            LogicalType::Time => "time".into(),
            LogicalType::DateTime => "datetime".into(),
            LogicalType::DateTimeOffset => "datetimeoffset".into(),
            LogicalType::Guid => "uniqueidentifier".into(),
            LogicalType::Binary => "varbinary(max)".into(),
        }
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType> {
        &MSSQL_TYPES
    }

    fn temporal_precision_scale(&self, ty: ProviderType) -> (Option<u8>, Option<u8>) {
        match ty {
            ProviderType::DateTime => (Some(23), Some(3)),
            ProviderType::DateTime2 | ProviderType::DateTimeOffset | ProviderType::Time => (Some(27), Some(7)),
            _ => (None, None),
        }
    }
}

/// PostgreSQL dialect
pub struct PostgresDialect {
    tokens: TokenTable,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self { tokens: TokenTable::for_database(&DatabaseType::PostgreSQL) }
    }
}

impl SqlDialect for PostgresDialect {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(bytes))
    }

    fn emit_rollup(&self, group_list: &str) -> String {
        format!("ROLLUP({})", group_list)
    }

    fn date_truncate_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens::call("DATE_TRUNC('day',")
    }

    fn date_part_tokens(&self, part: &str) -> SubOperatorTokens {
        SubOperatorTokens::call(format!("DATE_PART('{}',", part.to_ascii_lowercase()))
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType> {
        &POSTGRES_TYPES
    }

    fn temporal_precision_scale(&self, ty: ProviderType) -> (Option<u8>, Option<u8>) {
        if matches!(ty, ProviderType::Timestamp | ProviderType::TimestampTz | ProviderType::Time) {
            (None, Some(6))
        } else {
            (None, None)
        }
    }
}

/// MySQL dialect
pub struct MySqlDialect {
    tokens: TokenTable,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self { tokens: TokenTable::for_database(&DatabaseType::MySQL) }
    }
}

impl SqlDialect for MySqlDialect {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit_limit(&self, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            // MySQL has no bare OFFSET; use the documented max-rows idiom
            (None, o) if o > 0 => format!(" LIMIT {}, 18446744073709551615", o),
            (Some(l), o) if o > 0 => format!(" LIMIT {} OFFSET {}", l, o),
            (Some(l), _) => format!(" LIMIT {}", l),
            _ => String::new(),
        }
    }

    fn function_name(&self, kind: SubOperatorKind) -> &'static str {
        match kind {
            SubOperatorKind::Length => "CHAR_LENGTH",
            other => default_function_name(other),
        }
    }

    // `||` is logical OR unless PIPES_AS_CONCAT is set, and `+` coerces to numbers
    fn emit_concat(&self, left: &str, right: &str) -> String {
        format!("CONCAT({}, {})", left, right)
    }

    fn cast_type_name(&self, ty: LogicalType, length: Option<i64>, precision: Option<u8>, scale: Option<u8>) -> String {
        match ty {
            LogicalType::Boolean | LogicalType::Byte | LogicalType::Int16 | LogicalType::Int32 | LogicalType::Int64 => {
                "SIGNED".into()
            }
            LogicalType::Decimal => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({},{})", p, s),
                (Some(p), None) => format!("DECIMAL({})", p),
                _ => "DECIMAL".into(),
            },
            LogicalType::Single | LogicalType::Double => "DOUBLE".into(),
            LogicalType::Date => "DATE".into(),
            LogicalType::Time => "TIME".into(),
            LogicalType::DateTime | LogicalType::DateTimeOffset => "DATETIME".into(),
            LogicalType::Binary => "BINARY".into(),
            LogicalType::String | LogicalType::Guid | LogicalType::Unknown => match length {
                Some(l) => format!("CHAR({})", l),
                None => "CHAR".into(),
            },
        }
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType> {
        &MYSQL_TYPES
    }
}

/// SQLite dialect
pub struct SqliteDialect {
    tokens: TokenTable,
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self { tokens: TokenTable::for_database(&DatabaseType::SQLite) }
    }
}

impl SqlDialect for SqliteDialect {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn emit_limit(&self, limit: Option<u64>, offset: u64) -> String {
        match (limit, offset) {
            (None, o) if o > 0 => format!(" LIMIT -1 OFFSET {}", o),
            (Some(l), o) if o > 0 => format!(" LIMIT {} OFFSET {}", l, o),
            (Some(l), _) => format!(" LIMIT {}", l),
            _ => String::new(),
        }
    }

    fn function_name(&self, kind: SubOperatorKind) -> &'static str {
        match kind {
            SubOperatorKind::Substring => "SUBSTR",
            other => default_function_name(other),
        }
    }

    fn date_part_tokens(&self, part: &str) -> SubOperatorTokens {
        let fmt = match part.to_ascii_lowercase().as_str() {
            "year" => "%Y",
            "month" => "%m",
            "day" => "%d",
            "hour" => "%H",
            "minute" => "%M",
            "second" => "%S",
            "week" => "%W",
            "dayofyear" | "doy" => "%j",
            _ => "%Y",
        };
        SubOperatorTokens {
            open: format!("CAST(STRFTIME('{}',", fmt),
            trailing: vec![")".to_string(), " AS INTEGER)".to_string()],
        }
    }

    fn cast_type_name(&self, ty: LogicalType, _length: Option<i64>, _precision: Option<u8>, _scale: Option<u8>) -> String {
        match ty {
            LogicalType::Boolean | LogicalType::Byte | LogicalType::Int16 | LogicalType::Int32 | LogicalType::Int64 => {
                "INTEGER".into()
            }
            LogicalType::Single | LogicalType::Double => "REAL".into(),
            LogicalType::Decimal => "NUMERIC".into(),
            LogicalType::Binary => "BLOB".into(),
            _ => "TEXT".into(),
        }
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType> {
        &SQLITE_TYPES
    }
}

/// Oracle dialect
pub struct OracleDialect {
    tokens: TokenTable,
}

impl Default for OracleDialect {
    fn default() -> Self {
        Self { tokens: TokenTable::for_database(&DatabaseType::Oracle) }
    }
}

impl SqlDialect for OracleDialect {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    fn emit_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn emit_binary(&self, bytes: &[u8]) -> String {
        format!("HEXTORAW('{}')", hex::encode_upper(bytes))
    }

    fn emit_date(&self, text: &str) -> String {
        format!("DATE {}", self.quote_string(text))
    }

    fn emit_datetime(&self, text: &str) -> String {
        format!("TIMESTAMP {}", self.quote_string(text))
    }

    fn emit_limit(&self, limit: Option<u64>, offset: u64) -> String {
        self.emit_offset_fetch(limit, offset)
    }

    fn emit_trailing_top(&self, n: u64) -> String {
        format!(" FETCH FIRST {} ROWS ONLY", n)
    }

    fn emit_set_operation(&self, kind: &SetOperationKind) -> &'static str {
        match kind {
            SetOperationKind::Except => "MINUS",
            SetOperationKind::Union => "UNION",
            SetOperationKind::UnionAll => "UNION ALL",
            SetOperationKind::Intersect => "INTERSECT",
        }
    }

    fn emit_rollup(&self, group_list: &str) -> String {
        format!("ROLLUP({})", group_list)
    }

    fn function_name(&self, kind: SubOperatorKind) -> &'static str {
        match kind {
            SubOperatorKind::Substring => "SUBSTR",
            other => default_function_name(other),
        }
    }

    fn date_truncate_tokens(&self) -> SubOperatorTokens {
        SubOperatorTokens::call("TRUNC(")
    }

    fn cast_type_name(&self, ty: LogicalType, length: Option<i64>, precision: Option<u8>, scale: Option<u8>) -> String {
        match ty {
            LogicalType::Boolean => "NUMBER(1)".into(),
            LogicalType::Byte => "NUMBER(3)".into(),
            LogicalType::Int16 => "NUMBER(5)".into(),
            LogicalType::Int32 => "NUMBER(10)".into(),
            LogicalType::Int64 => "NUMBER(19)".into(),
            LogicalType::Decimal => match (precision, scale) {
                (Some(p), Some(s)) => format!("NUMBER({},{})", p, s),
                (Some(p), None) => format!("NUMBER({})", p),
                _ => "NUMBER".into(),
            },
            LogicalType::Single => "BINARY_FLOAT".into(),
            LogicalType::Double => "BINARY_DOUBLE".into(),
            LogicalType::Date => "DATE".into(),
            LogicalType::Time | LogicalType::DateTime => "TIMESTAMP".into(),
            LogicalType::DateTimeOffset => "TIMESTAMP WITH TIME ZONE".into(),
            LogicalType::Guid => "RAW(16)".into(),
            LogicalType::Binary => "BLOB".into(),
            LogicalType::String | LogicalType::Unknown => format!("VARCHAR2({})", length.unwrap_or(4000)),
        }
    }

    fn native_types_case_insensitive(&self) -> bool {
        false
    }

    fn native_type_table(&self) -> &'static HashMap<&'static str, ProviderType> {
        &ORACLE_TYPES
    }

    fn temporal_precision_scale(&self, ty: ProviderType) -> (Option<u8>, Option<u8>) {
        if matches!(ty, ProviderType::Timestamp | ProviderType::TimestampTz) {
            (None, Some(6))
        } else {
            (None, None)
        }
    }
}

fn default_function_name(kind: SubOperatorKind) -> &'static str {
    match kind {
        SubOperatorKind::ToUpper => "UPPER",
        SubOperatorKind::ToLower => "LOWER",
        SubOperatorKind::LTrim => "LTRIM",
        SubOperatorKind::RTrim => "RTRIM",
        SubOperatorKind::Trim => "TRIM",
        SubOperatorKind::Substring => "SUBSTRING",
        SubOperatorKind::Coalesce => "COALESCE",
        SubOperatorKind::DateTruncate => "DATE",
        SubOperatorKind::Length => "LENGTH",
        SubOperatorKind::Round => "ROUND",
        SubOperatorKind::DatePart => "EXTRACT",
        SubOperatorKind::Avg => "AVG",
        SubOperatorKind::Count => "COUNT",
        SubOperatorKind::Max => "MAX",
        SubOperatorKind::Min => "MIN",
        SubOperatorKind::StdDev => "STDDEV",
        SubOperatorKind::Sum => "SUM",
        SubOperatorKind::Var => "VARIANCE",
        SubOperatorKind::Cast => "CAST",
    }
}

/// Get dialect for a database type
pub fn get_dialect(db_type: &DatabaseType) -> Box<dyn SqlDialect> {
    get_dialect_with_tokens(db_type, None)
}

/// Get dialect for a database type, replacing its default token table.
pub fn get_dialect_with_tokens(db_type: &DatabaseType, tokens: Option<TokenTable>) -> Box<dyn SqlDialect> {
    let tokens = tokens.unwrap_or_else(|| TokenTable::for_database(db_type));
    match db_type {
        DatabaseType::MsSQL => Box::new(MssqlDialect { tokens }),
        DatabaseType::PostgreSQL => Box::new(PostgresDialect { tokens }),
        DatabaseType::MySQL => Box::new(MySqlDialect { tokens }),
        DatabaseType::SQLite => Box::new(SqliteDialect { tokens }),
        DatabaseType::Oracle => Box::new(OracleDialect { tokens }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting_escapes_close_token() {
        let d = get_dialect(&DatabaseType::MsSQL);
        assert_eq!(d.quote_ident("Order]Details"), "[Order]]Details]");
        let d = get_dialect(&DatabaseType::PostgreSQL);
        assert_eq!(d.quote_ident("Name"), "\"Name\"");
        let d = get_dialect(&DatabaseType::MySQL);
        assert_eq!(d.quote_ident("Name"), "`Name`");
    }

    #[test]
    fn string_literals_double_the_close_token() {
        let d = get_dialect(&DatabaseType::MsSQL);
        assert_eq!(d.emit_literal(&Value::from("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn procedure_names_are_quoted_per_part() {
        let t = TokenTable::for_database(&DatabaseType::MsSQL);
        assert_eq!(t.quote_procedure("dbo.proc_GetOrders"), "[dbo].[proc_GetOrders]");
    }

    #[test]
    fn parameter_names_use_prefix() {
        assert_eq!(TokenTable::for_database(&DatabaseType::MsSQL).parameter_name("p", 3), "@p3");
        assert_eq!(TokenTable::for_database(&DatabaseType::Oracle).parameter_name("p", 1), ":p1");
    }

    #[test]
    fn mysql_placeholders_are_positional() {
        let tokens = TokenTable::for_database(&DatabaseType::MySQL);
        let name = tokens.parameter_name("p", 2);
        assert_eq!(name, "p2");
        assert_eq!(tokens.placeholder(&name), "?");
        let mssql = TokenTable::for_database(&DatabaseType::MsSQL);
        assert_eq!(mssql.placeholder("@p2"), "@p2");
    }

    #[test]
    fn native_type_lookup_honours_case_rules() {
        let d = get_dialect(&DatabaseType::MsSQL);
        assert_eq!(d.provider_type("NVarChar(50)"), Some(ProviderType::NVarChar));
        let d = get_dialect(&DatabaseType::Oracle);
        assert_eq!(d.provider_type("VARCHAR2"), Some(ProviderType::VarChar));
        assert_eq!(d.provider_type("varchar2"), None);
    }

    #[test]
    fn function_spellings_differ_per_backend() {
        assert_eq!(get_dialect(&DatabaseType::MsSQL).function_name(SubOperatorKind::Length), "LEN");
        assert_eq!(get_dialect(&DatabaseType::PostgreSQL).function_name(SubOperatorKind::Length), "LENGTH");
        assert_eq!(get_dialect(&DatabaseType::SQLite).function_name(SubOperatorKind::Substring), "SUBSTR");
    }

    #[test]
    fn binary_literals_are_hex_encoded() {
        assert_eq!(get_dialect(&DatabaseType::MsSQL).emit_literal(&Value::Binary(vec![0xde, 0xad])), "0xdead");
        assert_eq!(get_dialect(&DatabaseType::SQLite).emit_literal(&Value::Binary(vec![0x01])), "X'01'");
    }
}
