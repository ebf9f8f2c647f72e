//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid connection settings: {0}")]
    Connection(String),

    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    #[error("Unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply { expected: &'static str, got: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
