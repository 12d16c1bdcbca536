// MigraineDiary-api lib.rs
//
// HTTP layer of the migraine diary: handlers, routing, shared state and the
// OpenAPI document.

pub mod api;
pub mod entities;
pub mod openapi;

pub use api::{create_app, AppState, Clients};
