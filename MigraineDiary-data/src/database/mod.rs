use thiserror::Error;

// Database modules
pub mod connection;
pub mod migrations;

// Re-export database connection types
pub use connection::*;

/// Database error enum
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Environment variable has an unusable value
    #[error("Invalid value for {0}: {1}")]
    InvalidEnvVar(String, String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Connection pool error
    #[error("SQLite connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    /// Filesystem error while preparing the database location
    #[error("Database path error: {0}")]
    PathError(#[from] std::io::Error),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),

    /// Generic database error
    #[error("Database error: {0}")]
    GenericError(String),
}

impl From<String> for DatabaseError {
    fn from(error: String) -> Self {
        DatabaseError::GenericError(error)
    }
}
