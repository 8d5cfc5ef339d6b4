use dirs::config_dir;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::enums::DatabaseType;
use crate::query_ast::emitter::dialect::TokenTable;
use crate::query_ast::errors::QueryAstError;

/// Env var naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TABULAR_QUERY_CONFIG";
pub const DIALECT_ENV: &str = "TABULAR_QUERY_DIALECT";
pub const SCHEMA_ENV: &str = "TABULAR_QUERY_SCHEMA";

const CONFIG_FILE_NAME: &str = "compiler.json";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").expect("valid identifier regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub database_type: DatabaseType,
    pub default_catalog: Option<String>,
    pub default_schema: Option<String>,
    /// Replaces the backend's built-in token table when set
    pub tokens: Option<TokenTable>,
    pub count_all_alias: String,
    pub paging_cte_name: String,
    pub row_number_alias: String,
    pub parameter_name_stem: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            database_type: DatabaseType::MsSQL,
            default_catalog: None,
            default_schema: None,
            tokens: None,
            count_all_alias: "Count".to_string(),
            paging_cte_name: "cte".to_string(),
            row_number_alias: "rn".to_string(),
            parameter_name_stem: "p".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn for_database(database_type: DatabaseType) -> Self {
        Self {
            database_type,
            ..Self::default()
        }
    }

    /// Defaults, then the JSON file, then environment overrides (`.env` included).
    pub fn load() -> Result<Self, QueryAstError> {
        dotenv::dotenv().ok();
        let mut config = match Self::json_path() {
            Some(path) if path.exists() => Self::load_from_json(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `$TABULAR_QUERY_CONFIG`, else `<config dir>/tabular-query/compiler.json`.
    pub fn json_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(explicit));
        }
        config_dir().map(|mut p| {
            p.push("tabular-query");
            p.push(CONFIG_FILE_NAME);
            p
        })
    }

    pub fn load_from_json(path: &Path) -> Result<Self, QueryAstError> {
        let content = fs::read_to_string(path)
            .map_err(|e| QueryAstError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: CompilerConfig = serde_json::from_str(&content)
            .map_err(|e| QueryAstError::Config(format!("{}: {}", path.display(), e)))?;
        info!(
            "Loaded compiler config from {}: database_type={:?}, default_schema={:?}",
            path.display(),
            config.database_type,
            config.default_schema
        );
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_json(&self, path: &Path) -> Result<(), QueryAstError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QueryAstError::Config(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| QueryAstError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Apply `TABULAR_QUERY_DIALECT` / `TABULAR_QUERY_SCHEMA` through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), QueryAstError> {
        if let Some(name) = lookup(DIALECT_ENV) {
            match DatabaseType::from_name(&name) {
                Some(db) => self.database_type = db,
                None => {
                    return Err(QueryAstError::Config(format!(
                        "{} names an unknown database '{}'",
                        DIALECT_ENV, name
                    )));
                }
            }
        }
        if let Some(schema) = lookup(SCHEMA_ENV) {
            let schema = schema.trim().to_string();
            if schema.is_empty() {
                warn!("{} is set but empty; ignored", SCHEMA_ENV);
            } else {
                self.default_schema = Some(schema);
            }
        }
        Ok(())
    }

    /// Name-like settings must be plain identifiers.
    pub fn validate(&self) -> Result<(), QueryAstError> {
        let named = [
            ("count_all_alias", Some(self.count_all_alias.as_str())),
            ("paging_cte_name", Some(self.paging_cte_name.as_str())),
            ("row_number_alias", Some(self.row_number_alias.as_str())),
            ("parameter_name_stem", Some(self.parameter_name_stem.as_str())),
            ("default_catalog", self.default_catalog.as_deref()),
            ("default_schema", self.default_schema.as_deref()),
        ];
        for (field, value) in named {
            if let Some(v) = value
                && !is_identifier(v)
            {
                return Err(QueryAstError::Config(format!("{} '{}' is not a valid identifier", field, v)));
            }
        }
        Ok(())
    }

    /// Token table in effect: the override, else the backend default.
    pub fn token_table(&self) -> TokenTable {
        self.tokens
            .clone()
            .unwrap_or_else(|| TokenTable::for_database(&self.database_type))
    }
}

pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}
