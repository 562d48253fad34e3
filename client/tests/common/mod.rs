//! In-process stats server for integration tests.
//!
//! Implements the endpoints the client uses over a `DashMap` user table,
//! issues `uuid` session tokens and records every `/update_stats` body.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use dashmap::DashMap;
use rover_client::AuthResponse;
use rover_engine::{SyncRequest, UserRecord};
use serde::Deserialize;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Lifetime of issued tokens, seconds.
pub const TOKEN_LIFETIME: u64 = 3600;

/// A way to make the next `/update_stats` call fail.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Status(StatusCode),
    Malformed,
}

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    password: String,
}

#[derive(Debug, Default)]
pub struct MockState {
    users: DashMap<String, StoredUser>,
    tokens: DashMap<String, String>,
    next_id: AtomicI64,
    stats_requests: Mutex<Vec<SyncRequest>>,
    session_calls: AtomicUsize,
    fail_next_sync: Mutex<Option<Failure>>,
}

pub struct MockServer {
    pub url: String,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/session", post(session))
            .route("/update_stats", post(update_stats))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn add_user(&self, username: &str, password: &str, best_score: u64, total_playtime: u64) {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = UserRecord::new(id, username, capitalize(username), best_score, total_playtime);
        self.state.users.insert(
            username.to_string(),
            StoredUser {
                record,
                password: password.to_string(),
            },
        );
    }

    /// Someone played on another device.
    pub fn set_best_score(&self, username: &str, best_score: u64) {
        if let Some(mut user) = self.state.users.get_mut(username) {
            user.record.best_score = best_score;
        }
    }

    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.state.users.get(username).map(|u| u.record.clone())
    }

    pub fn stats_requests(&self) -> Vec<SyncRequest> {
        self.state.stats_requests.lock().unwrap().clone()
    }

    pub fn session_calls(&self) -> usize {
        self.state.session_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_sync(&self, failure: Failure) {
        *self.state.fail_next_sync.lock().unwrap() = Some(failure);
    }
}

/// A URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn issue_token(state: &MockState, user: UserRecord) -> Response {
    let token = uuid::Uuid::new_v4().to_string();
    state.tokens.insert(token.clone(), user.username.clone());
    Json(AuthResponse {
        user,
        session_token: Some(token),
        expires_in: Some(TOKEN_LIFETIME),
    })
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    display_name: String,
    password: String,
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<RegisterBody>) -> Response {
    if state.users.contains_key(&body.username) {
        return (StatusCode::CONFLICT, "Username already registered").into_response();
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let record = UserRecord::new(id, body.username.clone(), body.display_name, 0, 0);
    state.users.insert(
        body.username,
        StoredUser {
            record: record.clone(),
            password: body.password,
        },
    );

    issue_token(&state, record)
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<LoginBody>) -> Response {
    let record = match state.users.get(&body.username) {
        Some(user) if user.password == body.password => user.record.clone(),
        _ => return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response(),
    };
    issue_token(&state, record)
}

async fn session(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.session_calls.fetch_add(1, Ordering::SeqCst);

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let username = match token.and_then(|t| state.tokens.get(t)) {
        Some(username) => username.value().clone(),
        None => return (StatusCode::UNAUTHORIZED, "Invalid session").into_response(),
    };

    match state.users.get(&username) {
        Some(user) => Json(AuthResponse {
            user: user.record.clone(),
            session_token: None,
            expires_in: None,
        })
        .into_response(),
        None => (StatusCode::UNAUTHORIZED, "Invalid session").into_response(),
    }
}

async fn update_stats(
    State(state): State<Arc<MockState>>,
    Json(body): Json<SyncRequest>,
) -> Response {
    state.stats_requests.lock().unwrap().push(body.clone());

    if let Some(failure) = state.fail_next_sync.lock().unwrap().take() {
        return match failure {
            Failure::Status(status) => (status, "Internal failure").into_response(),
            Failure::Malformed => (StatusCode::OK, r#"{"unexpected":true}"#).into_response(),
        };
    }

    let Some(mut user) = state.users.get_mut(&body.username) else {
        return (StatusCode::NOT_FOUND, "User not found").into_response();
    };
    user.record.best_score = user.record.best_score.max(body.score);
    user.record.total_playtime += body.playtime_delta;

    Json(user.record.clone()).into_response()
}
