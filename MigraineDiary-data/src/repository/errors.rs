use thiserror::Error;

use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                RepositoryError::Conflict(error.to_string())
            }
            _ => RepositoryError::Sqlite(error),
        }
    }
}

impl From<String> for RepositoryError {
    fn from(error: String) -> Self {
        // Determine if it's a validation error based on the error message
        if error.contains("validation") || error.contains("invalid") {
            RepositoryError::Validation(error)
        } else {
            RepositoryError::Database(DatabaseError::GenericError(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();

        assert!(matches!(RepositoryError::from(err), RepositoryError::Conflict(_)));
    }

    #[test]
    fn test_string_error_classification() {
        assert!(matches!(
            RepositoryError::from("invalid date".to_string()),
            RepositoryError::Validation(_)
        ));
        assert!(matches!(
            RepositoryError::from("disk full".to_string()),
            RepositoryError::Database(_)
        ));
    }
}
