use sea_orm::DbBackend;
use thiserror::Error;

/// Errors returned by the nested-set engine.
#[derive(Debug, Error)]
pub enum NestedSetError {
    #[error("nested-set supports PostgreSQL and SQLite connections only (got {0:?})")]
    UnsupportedBackend(DbBackend),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("invalid nested-set options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("parent node {0} does not exist")]
    InvalidParent(String),

    #[error("invalid insert policy `{0}`; expected \"first\", \"last\" or \"alphabetical\"")]
    InvalidPolicy(String),

    #[error("nested-set intervals are corrupt: {0}")]
    TreeCorruption(String),

    #[error("nested-set models need exactly one primary key column, found {0}")]
    UnsupportedKeySchema(usize),

    #[error("node {0} does not exist")]
    NodeNotFound(String),

    #[error("invalid move: {0}")]
    InvalidMove(String),
}

impl NestedSetError {
    pub fn corruption(detail: impl Into<String>) -> Self {
        Self::TreeCorruption(detail.into())
    }

    pub fn invalid_move(detail: impl Into<String>) -> Self {
        Self::InvalidMove(detail.into())
    }
}
