#![cfg(feature = "sql_validate")]

mod validate_tests {
    use tabular_query::models::enums::DatabaseType;
    use tabular_query::query_ast::validate::validate_sql;
    use tabular_query::query_ast::{QueryArena, compile, eq};

    fn joined() -> (QueryArena, tabular_query::QueryId) {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let c = arena.table("Customers");
        arena.at(c).alias("c").expect("ok");
        arena
            .at(o)
            .alias("o")
            .expect("ok")
            .select([c.col("Name"), o.col("Total").sum()])
            .expect("ok")
            .inner_join(c, eq(o.col("CustomerId"), c.col("Id")))
            .expect("ok")
            .group_by([c.col("Name")])
            .expect("ok")
            .order_by([c.col("Name").asc()])
            .expect("ok");
        (arena, o)
    }

    #[test]
    fn compiled_postgres_sql_parses() {
        let (mut arena, o) = joined();
        arena.at(o).page(3, 20).expect("ok");
        let out = compile(&arena, o, DatabaseType::PostgreSQL).expect("ok");
        assert_eq!(validate_sql(&out.sql, &DatabaseType::PostgreSQL), Ok(1));
    }

    #[test]
    fn compiled_mssql_sql_parses() {
        let (mut arena, o) = joined();
        arena.at(o).top(10).expect("ok");
        let out = compile(&arena, o, DatabaseType::MsSQL).expect("ok");
        assert_eq!(validate_sql(&out.sql, &DatabaseType::MsSQL), Ok(1));
    }
}
