// Session handling for the core layer.
//
// The core never talks to an OAuth endpoint. It receives a ready-to-use
// `Session` per request from whoever owns credential refresh (the infra
// layer's service-account authenticator, or a fake in tests) and passes it
// by reference into every provider call. Nothing in the core stores one.

use async_trait::async_trait;
use thiserror::Error;

/// An opaque authenticated-client capability: a bearer token that is valid
/// right now. Acquired once per request, dropped when the request ends.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: String) -> Self {
        Self { access_token }
    }

    pub fn token(&self) -> &str {
        &self.access_token
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no valid session: {0}")]
    Unavailable(String),
}

/// Supplies a valid `Session`, refreshing credentials beforehand if needed.
/// Refresh happens entirely behind this trait, before the core is invoked.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<Session, SessionError>;
}
