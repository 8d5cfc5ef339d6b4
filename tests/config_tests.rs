mod config_tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tabular_query::config::{CompilerConfig, DIALECT_ENV, SCHEMA_ENV, is_identifier};
    use tabular_query::models::enums::DatabaseType;
    use tabular_query::query_ast::{ParameterCache, QueryArena, QueryAstError, SqlCompiler, TokenTable, eq};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tabular-query-tests-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn json_round_trip() {
        let path = scratch("round_trip/compiler.json");
        let mut config = CompilerConfig::for_database(DatabaseType::PostgreSQL);
        config.default_schema = Some("sales".into());
        config.count_all_alias = "Total".into();
        config.save_to_json(&path).expect("ok");

        let loaded = CompilerConfig::load_from_json(&path).expect("ok");
        assert_eq!(loaded, config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let path = scratch("partial.json");
        fs::create_dir_all(path.parent().expect("ok")).expect("ok");
        fs::write(&path, r#"{ "database_type": "Oracle", "default_schema": "hr" }"#).expect("ok");
        let loaded = CompilerConfig::load_from_json(&path).expect("ok");
        assert_eq!(loaded.database_type, DatabaseType::Oracle);
        assert_eq!(loaded.default_schema.as_deref(), Some("hr"));
        assert_eq!(loaded.count_all_alias, "Count");
        assert_eq!(loaded.paging_cte_name, "cte");
        assert!(loaded.tokens.is_none());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unreadable_or_invalid_files_are_config_errors() {
        let missing = scratch("does-not-exist.json");
        assert!(matches!(
            CompilerConfig::load_from_json(&missing),
            Err(QueryAstError::Config(_))
        ));

        let path = scratch("invalid.json");
        fs::create_dir_all(path.parent().expect("ok")).expect("ok");
        fs::write(&path, r#"{ "row_number_alias": "rn; DROP TABLE x" }"#).expect("ok");
        assert!(matches!(
            CompilerConfig::load_from_json(&path),
            Err(QueryAstError::Config(_))
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn validate_rejects_non_identifiers() {
        let mut config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        config.default_schema = Some("sales data".into());
        assert!(matches!(config.validate(), Err(QueryAstError::Config(_))));
        assert!(is_identifier("Row_Num$1"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn env_lookup_overrides_and_rejects_unknown_backends() {
        let mut config = CompilerConfig::default();
        config
            .apply_env(|key| match key {
                k if k == DIALECT_ENV => Some("sqlite".into()),
                k if k == SCHEMA_ENV => Some("   ".into()),
                _ => None,
            })
            .expect("ok");
        assert_eq!(config.database_type, DatabaseType::SQLite);
        assert_eq!(config.default_schema, None);

        let err = config
            .apply_env(|key| (key == DIALECT_ENV).then(|| "db2".to_string()))
            .err();
        assert!(matches!(err, Some(QueryAstError::Config(_))));
    }

    #[test]
    fn token_override_changes_punctuation() {
        let mut tokens = TokenTable::for_database(&DatabaseType::MsSQL);
        tokens.ident_open = "\"".into();
        tokens.ident_close = "\"".into();
        tokens.param_prefix = ":".into();
        let mut config = CompilerConfig::for_database(DatabaseType::MsSQL);
        config.tokens = Some(tokens.clone());
        config.parameter_name_stem = "arg".into();
        assert_eq!(config.token_table(), tokens);

        let mut arena = QueryArena::new();
        let o = arena.table("Orders");
        arena.at(o).filter(eq(o.col("Id"), 7)).expect("ok");
        let compiler = SqlCompiler::from_config(config, Arc::new(ParameterCache::new()));
        let out = compiler.compile(&arena, o).expect("ok");
        assert_eq!(out.sql, "SELECT * FROM \"Orders\" WHERE \"Id\" = :arg1");
        assert_eq!(out.parameters[0].name, ":arg1");
    }

    #[test]
    fn default_token_table_follows_the_backend() {
        let config = CompilerConfig::for_database(DatabaseType::MySQL);
        assert_eq!(config.token_table(), TokenTable::for_database(&DatabaseType::MySQL));
    }
}
