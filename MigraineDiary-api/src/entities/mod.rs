// Public entities for the MigraineDiary API
// Query parameters and response envelopes that only exist at the HTTP boundary;
// request and response bodies are the domain entities themselves.

// Pagination, date ranges and other query parameters
pub mod common;
