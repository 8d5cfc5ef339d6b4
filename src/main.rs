use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use tabular_query::config::CompilerConfig;
use tabular_query::models::structs::Parameter;
use tabular_query::query_ast::{EntityMetadata, MetadataCatalog, ParameterCache, QueryArena, QueryId, SqlCompiler};
use tabular_query::query_tools::{lint_compiled, pretty_print};

/// Input document: a serialized arena plus the root to compile.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    config: Option<CompilerConfig>,
    root: QueryId,
    arena: QueryArena,
    #[serde(default)]
    metadata: Vec<EntityMetadata>,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    sql: &'a str,
    parameters: &'a [Parameter],
    warnings: Vec<String>,
}

fn usage() -> &'static str {
    "usage: tabular-query <document.json> [--pretty]"
}

fn main() -> anyhow::Result<()> {
    tabular_query::init_logging();

    let mut path: Option<PathBuf> = None;
    let mut pretty = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--pretty" => pretty = true,
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            other if path.is_none() => path = Some(PathBuf::from(other)),
            other => bail!("unexpected argument '{}'\n{}", other, usage()),
        }
    }
    let Some(path) = path else {
        bail!("{}", usage());
    };

    let content = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let doc: Document = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    let config = match doc.config {
        Some(c) => {
            c.validate()?;
            c
        }
        None => CompilerConfig::load()?,
    };
    let db_type = config.database_type;

    let mut arena = doc.arena;
    arena.reindex();
    let mut catalog = MetadataCatalog::new();
    for entity in doc.metadata {
        catalog.register_entity(entity.with_shape_for(db_type));
    }
    let attached = arena.attach_metadata(doc.root, &catalog)?;
    log::debug!("{} queries matched provider metadata", attached);

    let compiler = SqlCompiler::from_config(config, Arc::new(ParameterCache::new()));
    let compiled = compiler.compile(&arena, doc.root)?;

    let sql = if pretty {
        pretty_print(&compiled.sql)
    } else {
        compiled.sql.clone()
    };
    let warnings = lint_compiled(&compiled)
        .into_iter()
        .map(|m| format!("{:?}: {}", m.severity, m.message))
        .collect();
    let output = Output {
        sql: &sql,
        parameters: &compiled.parameters,
        warnings,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
