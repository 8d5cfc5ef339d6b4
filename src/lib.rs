pub mod config;
pub mod models;
pub mod query_ast;
pub mod query_tools;

pub use models::structs::{CompiledQuery, Parameter};
pub use query_ast::{QueryArena, QueryAstError, QueryId, SqlCompiler};

/// Route `log` output for this crate through `env_logger`; repeated calls are no-ops.
pub fn init_logging() {
    dotenv::dotenv().ok();
    let _ = env_logger::Builder::from_default_env()
        .filter_module("tabular_query", log::LevelFilter::Debug)
        .is_test(false)
        .try_init();
}
