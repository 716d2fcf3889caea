//! HTTP API: job submission, status polling, report serving and the browser UI

pub mod api_key;
pub mod handlers;
pub mod routes;
pub mod runner;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::app;
pub use server::build_state;
pub use server::serve_api;
