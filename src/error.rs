use thiserror::Error;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Everything a command can fail with. None of these end the shell.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed literal, expression or command syntax.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input is well-formed but breaks a schema rule.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Table or column does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A confirm-gated operation was declined.
    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl DbError {
    pub fn parse(msg: impl Into<String>) -> Self {
        DbError::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DbError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DbError::NotFound(msg.into())
    }
}
