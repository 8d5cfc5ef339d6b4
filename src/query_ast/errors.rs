#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryAstError {
    #[error("construction error: {0}")] Construction(String),
    #[error("unsupported feature: {0}")] Unsupported(&'static str),
    #[error("emit error: {0}")] Emit(String),
    #[error("unknown query id: {0}")] UnknownQuery(usize),
    #[error("parse error: {0}")] Parse(String),
    #[error("config error: {0}")] Config(String),
}

impl From<serde_json::Error> for QueryAstError { fn from(e: serde_json::Error) -> Self { QueryAstError::Parse(e.to_string()) } }
