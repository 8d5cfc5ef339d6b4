//! Re-parse compiled SQL with `sqlparser` as a diagnostic check.

use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::errors::QueryAstError;
use crate::models::enums::DatabaseType;

fn parser_dialect(db_type: &DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MsSQL => Box::new(MsSqlDialect {}),
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
        DatabaseType::Oracle => Box::new(GenericDialect {}),
    }
}

/// Number of statements parsed, or the parser's complaint.
pub fn validate_sql(sql: &str, db_type: &DatabaseType) -> Result<usize, QueryAstError> {
    let dialect = parser_dialect(db_type);
    let statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| QueryAstError::Parse(e.to_string()))?;
    Ok(statements.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert_eq!(validate_sql("SELECT a FROM t WHERE b = 1", &DatabaseType::PostgreSQL), Ok(1));
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_sql("SELEC FROM", &DatabaseType::MySQL).is_err());
    }
}
