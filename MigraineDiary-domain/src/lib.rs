// MigraineDiary Domain
// This crate contains the business logic for the MigraineDiary application

// Runtime configuration collected from the environment
pub mod config;

// Services that implement business logic
pub mod services;

// Outbound clients for weather, push and LLM gateways
pub mod clients;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Background jobs
pub mod scheduler;

// Re-export the database module from the data crate for convenience
pub use migraine_diary_data::database;

// Testing utilities - only available with mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
