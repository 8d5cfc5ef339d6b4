mod query_ast_tests {
    use tabular_query::models::enums::{DatabaseType, LogicalType};
    use tabular_query::query_ast::{
        ArithmeticOperator, CaseExpr, ColumnMetadata, ColumnRef, EntityMetadata, Expression, MetadataCatalog, OrderItem,
        QueryArena, QueryAstError, SqlCompiler, Value, compile, eq, gt,
    };

    fn mssql() -> SqlCompiler {
        SqlCompiler::new(DatabaseType::MsSQL)
    }

    #[test]
    fn plain_columns_have_no_alias_but_aggregates_do() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena
            .at(o)
            .select([o.col("CustomerId"), o.col("Total").sum()])?
            .group_by([o.col("CustomerId")])?;
        let out = mssql().compile(&arena, o)?;
        assert_eq!(
            out.sql,
            "SELECT [CustomerId], SUM([Total]) AS [Total] FROM [Orders] GROUP BY [CustomerId]"
        );
        Ok(())
    }

    #[test]
    fn inner_join_uses_aliases() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let c = arena.table("Customers");
        arena.at(c).alias("c")?;
        arena
            .at(o)
            .alias("o")?
            .select([o.col("Id"), c.col("Name")])?
            .inner_join(c, eq(o.col("CustomerId"), c.col("Id")))?;
        let out = mssql().compile(&arena, o)?;
        assert_eq!(
            out.sql,
            "SELECT o.[Id], c.[Name] FROM [Orders] o INNER JOIN [Customers] c ON o.[CustomerId] = c.[Id]"
        );
        assert!(out.parameters.is_empty());

        let pg = SqlCompiler::new(DatabaseType::PostgreSQL).compile(&arena, o)?;
        assert_eq!(
            pg.sql,
            "SELECT o.\"Id\", c.\"Name\" FROM \"Orders\" o INNER JOIN \"Customers\" c ON o.\"CustomerId\" = c.\"Id\""
        );
        Ok(())
    }

    #[test]
    fn join_target_without_alias_is_rejected_at_build_time() {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let c = arena.table("Customers");
        let err = arena.at(o).left_join(c, eq(o.col("CustomerId"), c.col("Id"))).err();
        assert!(matches!(err, Some(QueryAstError::Construction(_))));
    }

    #[test]
    fn derived_table_columns_take_the_outer_alias() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let inner = arena.table("Orders");
        arena
            .at(inner)
            .alias("sub")?
            .select([inner.col("CustomerId"), inner.col("Total")])?
            .filter(gt(inner.col("Total"), 100))?;
        let outer = arena.derived();
        arena
            .at(outer)
            .alias("d")?
            .from_subquery(inner)?
            .select([inner.col("CustomerId")])?;
        let out = mssql().compile(&arena, outer)?;
        assert_eq!(
            out.sql,
            "SELECT d.[CustomerId] FROM (SELECT sub.[CustomerId], sub.[Total] FROM [Orders] sub WHERE sub.[Total] > @p1) d"
        );
        assert_eq!(out.parameters.len(), 1);
        assert_eq!(out.parameters[0].value, Value::Int(100));
        Ok(())
    }

    #[test]
    fn derived_table_with_select_all_projects_alias_star() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let inner = arena.table("Orders");
        arena.at(inner).alias("sub")?;
        let outer = arena.derived();
        arena.at(outer).from_subquery(inner)?;
        let out = mssql().compile(&arena, outer)?;
        assert_eq!(out.sql, "SELECT sub.* FROM (SELECT * FROM [Orders] sub) sub");
        Ok(())
    }

    #[test]
    fn set_operations_precede_order_by() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let a = arena.table("Current");
        let b = arena.table("Archive");
        arena.at(b).select([b.col("Id")])?;
        arena
            .at(a)
            .select([a.col("Id")])?
            .union_all(b)?
            .order_by([a.col("Id").desc()])?;
        let out = mssql().compile(&arena, a)?;
        assert_eq!(
            out.sql,
            "SELECT [Id] FROM [Current] UNION ALL SELECT [Id] FROM [Archive] ORDER BY [Id] DESC"
        );

        let mut arena = QueryArena::new();
        let a = arena.table("A");
        let b = arena.table("B");
        arena.at(a).except(b)?;
        let oracle = compile(&arena, a, DatabaseType::Oracle)?;
        assert_eq!(oracle.sql, "SELECT * FROM \"A\" MINUS SELECT * FROM \"B\"");
        Ok(())
    }

    #[test]
    fn arithmetic_is_parenthesized_and_honours_operand_order() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Lines");
        arena.at(o).select([
            o.col("Price").times(o.col("Qty")).alias("Line"),
            Expression::value_first(100, ArithmeticOperator::Subtract, o.col("Discount")).alias("Net"),
        ])?;
        let out = mssql().compile(&arena, o)?;
        assert_eq!(
            out.sql,
            "SELECT ([Price] * [Qty]) AS [Line], (100 - [Discount]) AS [Net] FROM [Lines]"
        );
        Ok(())
    }

    #[test]
    fn string_addition_uses_the_dialect_concat_operator() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let p = arena.table("People");
        let full = p
            .column("First")
            .typed(LogicalType::String)
            .expr()
            .plus(" ")
            .plus(p.col("Last"))
            .alias("Full");
        arena.at(p).select([full])?;
        assert_eq!(
            mssql().compile(&arena, p)?.sql,
            "SELECT (([First] + ' ') + [Last]) AS [Full] FROM [People]"
        );
        assert_eq!(
            compile(&arena, p, DatabaseType::PostgreSQL)?.sql,
            "SELECT ((\"First\" || ' ') || \"Last\") AS \"Full\" FROM \"People\""
        );
        assert_eq!(
            compile(&arena, p, DatabaseType::MySQL)?.sql,
            "SELECT CONCAT(CONCAT(`First`, ' '), `Last`) AS `Full` FROM `People`"
        );
        Ok(())
    }

    #[test]
    fn searched_case_binds_parameters_and_aliases_by_owner() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let status = CaseExpr::new()
            .owner(o.column("Status"))
            .when(eq(o.col("Status"), 1), "Open")
            .when(eq(o.col("Status"), 2), "Closed")
            .otherwise("Unknown")
            .end();
        arena.at(o).select([status])?;
        let out = mssql().compile(&arena, o)?;
        assert_eq!(
            out.sql,
            "SELECT CASE WHEN [Status] = @p1 THEN 'Open' WHEN [Status] = @p2 THEN 'Closed' ELSE 'Unknown' END AS [Status] FROM [Orders]"
        );
        assert_eq!(out.parameters.len(), 2);
        Ok(())
    }

    #[test]
    fn simple_case_compares_an_operand() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let kind = CaseExpr::on(o.col("Kind"))
            .when(Value::from("A"), "Alpha")
            .otherwise("Other")
            .end()
            .alias("KindName");
        arena.at(o).select([kind])?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT CASE [Kind] WHEN 'A' THEN 'Alpha' ELSE 'Other' END AS [KindName] FROM [Orders]"
        );
        Ok(())
    }

    #[test]
    fn raw_fragments_bypass_quoting_and_direction() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena
            .at(o)
            .select([ColumnRef::raw("COUNT(*) + 1")])?
            .order_by([OrderItem::raw("LastName DESC"), OrderItem::from(o.col("Id"))])?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT COUNT(*) + 1 FROM [Orders] ORDER BY LastName DESC, [Id] DESC"
        );
        Ok(())
    }

    #[test]
    fn sub_operators_nest_in_call_order() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("People");
        arena.at(o).select([
            o.col("Name").trim().to_upper().alias("N"),
            o.col("Code").substring(2, 5),
            o.col("Nick").coalesce(""),
            o.col("Born").date_part("year").alias("Y"),
        ])?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT UPPER(LTRIM(RTRIM([Name]))) AS [N], SUBSTRING([Code],2,5) AS [Code], COALESCE([Nick],'') AS [Nick], DATEPART(year,[Born]) AS [Y] FROM [People]"
        );
        let pg = compile(&arena, o, DatabaseType::PostgreSQL)?;
        assert!(pg.sql.contains("UPPER(TRIM(\"Name\")) AS \"N\""));
        assert!(pg.sql.contains("DATE_PART('year',\"Born\") AS \"Y\""));
        Ok(())
    }

    #[test]
    fn count_distinct_from_the_column_flag() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena
            .at(o)
            .select([o.col("CustomerId").distinct().count().alias("Buyers")])?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT COUNT(DISTINCT [CustomerId]) AS [Buyers] FROM [Orders]"
        );
        Ok(())
    }

    #[test]
    fn flags_rollup_count_all_and_no_lock() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena
            .at(o)
            .alias("o")?
            .select([o.col("Region")])?
            .group_by([o.col("Region")])?
            .with_rollup()?
            .count_all()?
            .no_lock()?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT o.[Region], COUNT(*) AS [Count] FROM [Orders] o WITH (NOLOCK) GROUP BY o.[Region] WITH ROLLUP"
        );
        let pg = compile(&arena, o, DatabaseType::PostgreSQL)?;
        assert_eq!(
            pg.sql,
            "SELECT o.\"Region\", COUNT(*) AS \"Count\" FROM \"Orders\" o GROUP BY ROLLUP(o.\"Region\")"
        );
        Ok(())
    }

    #[test]
    fn count_all_alone_replaces_star() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena.at(o).count_all_as("Total")?;
        assert_eq!(mssql().compile(&arena, o)?.sql, "SELECT COUNT(*) AS [Total] FROM [Orders]");
        Ok(())
    }

    #[test]
    fn distinct_and_top() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena.at(o).distinct()?.top(3)?.select([o.col("Region")])?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT DISTINCT TOP (3) [Region] FROM [Orders]"
        );
        assert_eq!(
            compile(&arena, o, DatabaseType::MySQL)?.sql,
            "SELECT DISTINCT `Region` FROM `Orders` LIMIT 3"
        );
        assert_eq!(
            compile(&arena, o, DatabaseType::Oracle)?.sql,
            "SELECT DISTINCT \"Region\" FROM \"Orders\" FETCH FIRST 3 ROWS ONLY"
        );
        Ok(())
    }

    #[test]
    fn select_all_except_expands_metadata() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena.at(o).select_all_except([o.column("Notes")])?;
        assert!(matches!(mssql().compile(&arena, o), Err(QueryAstError::Emit(_))));

        let mut catalog = MetadataCatalog::new();
        catalog.register_entity(EntityMetadata::new(
            DatabaseType::MsSQL,
            "Orders",
            vec![
                ColumnMetadata::new("Id", "int"),
                ColumnMetadata::new("Total", "money"),
                ColumnMetadata::new("Notes", "nvarchar(max)"),
            ],
        ));
        assert_eq!(arena.attach_metadata(o, &catalog)?, 1);
        assert_eq!(mssql().compile(&arena, o)?.sql, "SELECT [Id], [Total] FROM [Orders]");
        Ok(())
    }

    #[test]
    fn scalar_subquery_and_alias_star_items() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let l = arena.table("Lines");
        arena.at(o).alias("o")?;
        arena
            .at(l)
            .alias("l")?
            .select([l.col("Qty").sum()])?
            .filter(eq(l.col("OrderId"), o.col("Id")))?;
        arena.at(o).select([o.all()])?.select_subquery(l, "Units")?;
        assert_eq!(
            mssql().compile(&arena, o)?.sql,
            "SELECT o.*, (SELECT SUM(l.[Qty]) AS [Qty] FROM [Lines] l WHERE l.[OrderId] = o.[Id]) AS [Units] FROM [Orders] o"
        );
        Ok(())
    }

    #[test]
    fn full_join_is_unsupported_where_the_backend_lacks_it() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let a = arena.table("A");
        let b = arena.table("B");
        arena.at(b).alias("b")?;
        arena.at(a).alias("a")?.full_join(b, eq(a.col("Id"), b.col("Id")))?;
        assert!(matches!(
            compile(&arena, a, DatabaseType::SQLite),
            Err(QueryAstError::Unsupported(_))
        ));
        assert!(compile(&arena, a, DatabaseType::PostgreSQL).is_ok());
        Ok(())
    }

    #[test]
    fn cross_join_has_no_on_clause() -> Result<(), QueryAstError> {
        let mut arena = QueryArena::new();
        let a = arena.table("Sizes");
        let b = arena.table("Colors");
        arena.at(b).alias("c")?;
        arena.at(a).alias("s")?.cross_join(b)?;
        assert_eq!(
            mssql().compile(&arena, a)?.sql,
            "SELECT * FROM [Sizes] s CROSS JOIN [Colors] c"
        );
        Ok(())
    }

    #[test]
    fn default_schema_qualifies_tables() -> Result<(), QueryAstError> {
        use std::sync::Arc;
        use tabular_query::config::CompilerConfig;
        use tabular_query::query_ast::ParameterCache;

        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        let s = arena.table("audit.Log");
        arena.at(o).union(s)?;
        let mut config = CompilerConfig::for_database(DatabaseType::MsSQL);
        config.default_schema = Some("dbo".into());
        let compiler = SqlCompiler::from_config(config, Arc::new(ParameterCache::new()));
        assert_eq!(
            compiler.compile(&arena, o)?.sql,
            "SELECT * FROM [dbo].[Orders] UNION SELECT * FROM [audit].[Log]"
        );
        Ok(())
    }

    #[test]
    fn last_query_tracks_the_latest_compile() -> Result<(), QueryAstError> {
        let compiler = mssql();
        assert_eq!(compiler.last_query(), None);
        let mut arena = QueryArena::new();
        let a = arena.table("A");
        let b = arena.table("B");
        compiler.compile(&arena, a)?;
        compiler.compile(&arena, b)?;
        assert_eq!(compiler.last_query().as_deref(), Some("SELECT * FROM [B]"));
        Ok(())
    }

    #[test]
    fn unknown_root_is_an_error() {
        let arena = QueryArena::new();
        let err = mssql().compile(&arena, tabular_query::query_ast::QueryId(7)).err();
        assert_eq!(err, Some(QueryAstError::UnknownQuery(7)));
    }
}
