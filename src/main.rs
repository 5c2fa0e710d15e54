// This is the entry point of the Drive text bridge.
//
// **Architecture Overview:**
// - `core/` = Business logic (format detection, extraction, listing)
// - `infra/` = Implementations of core traits (Google Drive/Docs HTTP APIs)
// - `http/` = HTTP adapters (axum routes and wire-level error mapping)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Bind the listener and serve the router

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use anyhow::Context;

use crate::core::extraction::GoogleDocMode;
use crate::http::AppState;
use crate::infra::drive::{DriveApiClient, ServiceAccountAuth};

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let auth = ServiceAccountAuth::from_env()
        .await
        .context("loading Google service account credentials")?;

    let drive = DriveApiClient::new().context("building Drive API client")?;

    // Export is the default; the structured Docs API path is opt-in.
    let doc_mode = match std::env::var("GOOGLE_DOC_MODE").as_deref() {
        Ok("structured") => GoogleDocMode::Structured,
        _ => GoogleDocMode::Export,
    };
    tracing::info!(?doc_mode, "google-doc extraction mode");

    let auth_url =
        std::env::var("GOOGLE_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string());

    let state = Arc::new(AppState::new(drive, doc_mode, Arc::new(auth), auth_url));
    let app = http::router(state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{bind}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
