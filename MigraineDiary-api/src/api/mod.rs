pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiResult, ErrorResponse};
pub use routes::create_app;
pub use state::{AppState, Clients};
