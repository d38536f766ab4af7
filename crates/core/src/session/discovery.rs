//! Session discovery: token lookup and relay roster check
//!
//! Before opening the stream transport, the client verifies that it holds an
//! access token and that the relay actually knows the session id. Both
//! collaborators sit behind traits so the lifecycle can be tested without a
//! network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, StreamError};

/// External auth collaborator exposing the current bearer token
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current access token, or `None` when signed out
    async fn access_token(&self) -> Option<String>;
}

/// Token provider backed by a fixed value (CLI flag or environment)
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// The relay's active-session roster
#[async_trait]
pub trait SessionRoster: Send + Sync {
    /// Ids of sessions currently registered with the relay
    async fn list_sessions(&self, token: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct RosterResponse {
    sessions: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    session_id: String,
}

/// Roster client for `GET /sessions`, bearer-authenticated
#[derive(Debug, Clone)]
pub struct HttpSessionRoster {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionRoster {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SessionRoster for HttpSessionRoster {
    async fn list_sessions(&self, token: &str) -> Result<Vec<String>> {
        let url = format!("{}/sessions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;

        let roster: RosterResponse = response.json().await?;
        Ok(roster
            .sessions
            .into_iter()
            .map(|entry| entry.session_id)
            .collect())
    }
}

/// Verify the token and roster for `session_id`; returns the token to connect with
///
/// Fails with [`StreamError::AuthMissing`] when signed out (fatal, no retry)
/// and [`StreamError::SessionNotRegistered`] when the relay does not know the
/// session (the remote session must register itself again).
pub async fn check_session(
    auth: &dyn AuthProvider,
    roster: &dyn SessionRoster,
    session_id: &str,
) -> Result<String> {
    let token = auth.access_token().await.ok_or(StreamError::AuthMissing)?;

    let sessions = roster.list_sessions(&token).await?;
    if sessions.iter().any(|id| id == session_id) {
        Ok(token)
    } else {
        tracing::warn!("session {} not in relay roster", session_id);
        Err(StreamError::SessionNotRegistered(session_id.to_string()))
    }
}
