use rusqlite::Connection;
use tracing::{debug, info};

use crate::database::DatabaseError;

/// Ordered schema steps. Every statement is idempotent so the list can be
/// replayed on each start.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "pain_entries",
        "CREATE TABLE IF NOT EXISTS pain_entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            pain_level INTEGER NOT NULL CHECK (pain_level BETWEEN 0 AND 10),
            pain_location TEXT,
            aura_type TEXT,
            triggers TEXT NOT NULL DEFAULT '[]',
            medications TEXT NOT NULL DEFAULT '[]',
            me_cfs_severity INTEGER CHECK (me_cfs_severity BETWEEN 0 AND 10),
            notes TEXT,
            latitude REAL,
            longitude REAL,
            weather_id TEXT,
            weather_attempts INTEGER NOT NULL DEFAULT 0,
            weather_attempted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pain_entries_user_timestamp
            ON pain_entries (user_id, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_pain_entries_missing_weather
            ON pain_entries (timestamp) WHERE weather_id IS NULL;",
    ),
    (
        "user_medications",
        "CREATE TABLE IF NOT EXISTS user_medications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            dosage TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_user_medications_user_name
            ON user_medications (user_id, name COLLATE NOCASE);",
    ),
    (
        "medication_limits",
        "CREATE TABLE IF NOT EXISTS medication_limits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            medication_name TEXT NOT NULL,
            limit_count INTEGER NOT NULL CHECK (limit_count > 0),
            period TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_medication_limits_user_name_period
            ON medication_limits (user_id, medication_name COLLATE NOCASE, period);",
    ),
    (
        "reminders",
        "CREATE TABLE IF NOT EXISTS reminders (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            medication_name TEXT,
            date_time TEXT NOT NULL,
            repeat TEXT NOT NULL DEFAULT 'none',
            status TEXT NOT NULL DEFAULT 'pending',
            last_sent_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reminders_status_date_time
            ON reminders (status, date_time);
        CREATE INDEX IF NOT EXISTS idx_reminders_user
            ON reminders (user_id);",
    ),
    (
        "push_subscriptions",
        "CREATE TABLE IF NOT EXISTS push_subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            endpoint TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_push_subscriptions_user
            ON push_subscriptions (user_id);",
    ),
    (
        "weather_logs",
        "CREATE TABLE IF NOT EXISTS weather_logs (
            id TEXT PRIMARY KEY,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            observed_at TEXT NOT NULL,
            temperature_c REAL,
            pressure_hpa REAL,
            pressure_change_24h REAL,
            humidity REAL,
            precipitation_mm REAL,
            wind_speed_kmh REAL,
            weather_code INTEGER,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (latitude, longitude, observed_at)
        );",
    ),
    (
        "doctor_shares",
        "CREATE TABLE IF NOT EXISTS doctor_shares (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            from_date TEXT NOT NULL,
            to_date TEXT NOT NULL,
            include_notes INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            revoked_at TEXT,
            last_accessed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_doctor_shares_user
            ON doctor_shares (user_id);",
    ),
    (
        "user_consents",
        "CREATE TABLE IF NOT EXISTS user_consents (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            consent_type TEXT NOT NULL,
            version TEXT NOT NULL,
            granted_at TEXT NOT NULL,
            withdrawn_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_user_consents_user_type
            ON user_consents (user_id, consent_type);",
    ),
    (
        "hit6_assessments",
        "CREATE TABLE IF NOT EXISTS hit6_assessments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            answers TEXT NOT NULL,
            score INTEGER NOT NULL,
            completed_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_hit6_assessments_user
            ON hit6_assessments (user_id, completed_at DESC);",
    ),
];

/// Columns added after a table first shipped: (table, column, definition)
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("pain_entries", "weather_attempts", "INTEGER NOT NULL DEFAULT 0"),
    ("pain_entries", "weather_attempted_at", "TEXT"),
];

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    for (name, sql) in MIGRATIONS {
        debug!("Creating {} table if not exists", name);
        conn.execute_batch(sql)
            .map_err(|e| DatabaseError::MigrationError(format!("{}: {}", name, e)))?;
    }

    for (table, column, definition) in ADDED_COLUMNS {
        let present = has_column(conn, table, column)
            .map_err(|e| DatabaseError::MigrationError(format!("{}.{}: {}", table, column, e)))?;
        if !present {
            debug!("Adding column {}.{}", table, column);
            conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition))
                .map_err(|e| DatabaseError::MigrationError(format!("{}.{}: {}", table, column, e)))?;
        }
    }

    info!("SQLite migrations completed successfully");
    Ok(())
}
