//! HTTP client for the stats server.
//!
//! Every call is a single request / response exchange: no retry, no backoff,
//! the transport's default timeout. Any 2xx status whose body parses is a
//! success.

use crate::auth::SessionToken;
use crate::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use rover_engine::{SyncRequest, UserRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Request body for `/register`.
#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    display_name: &'a str,
    password: &'a str,
}

/// Request body for `/login`.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response of `/register`, `/login` and `/session`.
///
/// A user record, optionally with a session token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Token lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl AuthResponse {
    /// The session issued with this response, if any.
    pub fn session(&self, now: DateTime<Utc>) -> Option<SessionToken> {
        let token = self.session_token.as_ref()?;
        let expires_in = self.expires_in?;
        Some(SessionToken::issued(token.clone(), now, expires_in))
    }
}

/// Client for the stats server endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /register`
    pub async fn register(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let body = RegisterRequest {
            username,
            display_name,
            password,
        };
        self.execute(self.post("/register").json(&body)).await
    }

    /// `POST /login`
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest { username, password };
        self.execute(self.post("/login").json(&body)).await
    }

    /// `POST /session`: resume a session from a stored token.
    pub async fn resume_session(&self, token: &str) -> Result<AuthResponse> {
        self.execute(self.post("/session").bearer_auth(token)).await
    }

    /// `POST /update_stats`
    pub async fn update_stats(&self, request: &SyncRequest) -> Result<UserRecord> {
        self.execute(self.post("/update_stats").json(request)).await
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(format!("{}{}", self.base_url, path))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = status.as_u16(), url = %self.base_url, "Response received");

        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
    }
}
