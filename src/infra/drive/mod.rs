// Google Drive infra layer.
// - `auth.rs` mints service-account access tokens and wraps them in Sessions.
// - `drive_client.rs` talks to the Drive v3 and Docs v1 HTTP APIs.

#[path = "auth.rs"]
pub mod auth;

#[path = "drive_client.rs"]
pub mod drive_client;

pub use auth::ServiceAccountAuth;
pub use drive_client::DriveApiClient;
