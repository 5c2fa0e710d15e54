// HTTP layer - route handlers and wire-level error mapping.

#[path = "routes.rs"]
pub mod routes;

pub use routes::{router, AppState};
