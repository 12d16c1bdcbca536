//! Database connection module for the MigraineDiary application
//!
//! The diary stores everything in a single SQLite database accessed through an
//! r2d2 connection pool. Repositories borrow a connection for the duration of
//! one call and hand it back immediately.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use tracing::{error, info, warn};

use super::migrations::run_sqlite_migrations;
use super::DatabaseError;

/// Pooled SQLite connection handed out by [`DatabasePool::get`]
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// File name used inside `DATA_DIR`
pub const DEFAULT_SQLITE_FILE: &str = "migraine_diary.db";

/// Default location of the database file
pub const DEFAULT_SQLITE_PATH: &str = "data/migraine_diary.db";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: DEFAULT_SQLITE_PATH.to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        // DB_SQLITE_PATH wins over DATA_DIR
        let sqlite_path = match (env::var("DB_SQLITE_PATH"), env::var("DATA_DIR")) {
            (Ok(path), _) => path,
            (Err(_), Ok(dir)) => Path::new(&dir).join(DEFAULT_SQLITE_FILE).to_string_lossy().into_owned(),
            _ => {
                info!("No DB_SQLITE_PATH provided, will use default path: {}", DEFAULT_SQLITE_PATH);
                defaults.sqlite_path.clone()
            }
        };

        let max_connections = parse_env("DB_MAX_CONNECTIONS", defaults.max_connections)?;
        let timeout_seconds = parse_env("DB_TIMEOUT_SECONDS", defaults.timeout_seconds)?;

        if max_connections == 0 {
            return Err(DatabaseError::InvalidEnvVar(
                "DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        info!(
            "Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path, max_connections, timeout_seconds
        );

        Ok(DatabaseConfig {
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, DatabaseError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| DatabaseError::InvalidEnvVar(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Shared SQLite connection pool
#[derive(Clone)]
pub struct DatabasePool {
    inner: Arc<r2d2::Pool<SqliteConnectionManager>>,
    in_memory: bool,
}

impl fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("DatabasePool")
            .field("in_memory", &self.in_memory)
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl DatabasePool {
    /// Open (or create) the database described by `config` and run migrations
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Initializing SQLite database at: {}", config.sqlite_path);

        if let Some(parent) = Path::new(&config.sqlite_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&config.sqlite_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));

        let pool = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.timeout_seconds))
            .build(manager)
            .map_err(|e| {
                error!("Failed to create SQLite connection pool: {}", e);
                DatabaseError::PoolError(e)
            })?;

        let pool = Self {
            inner: Arc::new(pool),
            in_memory: false,
        };
        pool.migrate()?;

        info!("SQLite connection pool created successfully");
        Ok(pool)
    }

    /// Create a migrated in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// capped at a single connection.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let pool = Self {
            inner: Arc::new(pool),
            in_memory: true,
        };
        pool.migrate()?;
        Ok(pool)
    }

    /// Check a connection out of the pool
    pub fn get(&self) -> Result<PooledConnection, DatabaseError> {
        self.inner.get().map_err(DatabaseError::PoolError)
    }

    /// Whether this pool is backed by an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    /// Run a trivial query to verify the database answers
    pub fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Describe the current connection for health reporting
    pub fn connection_info(&self) -> String {
        let state = self.inner.state();
        let location = if self.in_memory {
            "SQLite in-memory database".to_string()
        } else {
            match self.get().and_then(|conn| {
                conn.query_row("PRAGMA database_list", [], |row| row.get::<_, String>(2))
                    .map_err(DatabaseError::SqliteError)
            }) {
                Ok(path) => format!("SQLite database at {}", path),
                Err(e) => {
                    warn!("Failed to read database path: {}", e);
                    "SQLite database (path unknown)".to_string()
                }
            }
        };

        format!(
            "{} (connections: active={}, idle={})",
            location, state.connections, state.idle_connections
        )
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        run_sqlite_migrations(&conn)
    }
}
