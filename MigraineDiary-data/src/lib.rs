// MigraineDiary Data
// This crate handles database access for the diary: connection pooling,
// schema migrations, storage models and repositories.

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
