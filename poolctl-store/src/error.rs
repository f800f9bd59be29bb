//! Error types for poolctl-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
