//! Server-side sessions keyed by a signed cookie.
//!
//! The cookie only carries a JWT naming a random session id; credentials and
//! the pending OAuth `state` stay in process memory.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::AppState;

use super::jwt;
use super::types::StoredCredentials;

/// Cookie signing settings.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub ttl: chrono::Duration,
    pub secure: bool,
}

impl SessionConfig {
    pub fn new(secret: String, ttl: chrono::Duration) -> Self {
        Self {
            secret,
            cookie_name: "mailtask_session".to_string(),
            ttl,
            secure: std::env::var("RUST_ENV").unwrap_or_default() == "production",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub credentials: Option<StoredCredentials>,
    pub oauth_state: Option<String>,
}

struct Entry {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Session contents, empty when unknown or expired.
    pub fn load(&self, id: Uuid) -> SessionData {
        let now = Utc::now();
        self.entries
            .read()
            .get(&id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.data.clone())
            .unwrap_or_default()
    }

    pub fn update<F>(&self, id: Uuid, f: F)
    where
        F: FnOnce(&mut SessionData),
    {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let entry = entries.entry(id).or_insert_with(|| Entry {
            data: SessionData::default(),
            expires_at: now + self.ttl,
        });
        if entry.expires_at <= now {
            entry.data = SessionData::default();
            entry.expires_at = now + self.ttl;
        }
        f(&mut entry.data);
    }

    pub fn remove(&self, id: Uuid) {
        self.entries.write().remove(&id);
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The current request's session, inserted as a request extension.
#[derive(Clone)]
pub struct SessionContext {
    id: Uuid,
    store: SessionStore,
}

impl SessionContext {
    pub fn new(id: Uuid, store: SessionStore) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn credentials(&self) -> Option<StoredCredentials> {
        self.store.load(self.id).credentials
    }

    pub fn set_credentials(&self, credentials: StoredCredentials) {
        self.store
            .update(self.id, |data| data.credentials = Some(credentials));
    }

    pub fn clear_credentials(&self) {
        self.store.update(self.id, |data| data.credentials = None);
    }

    /// Generate and remember a fresh OAuth `state` value.
    pub fn begin_oauth(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        let stored = state.clone();
        self.store
            .update(self.id, |data| data.oauth_state = Some(stored));
        state
    }

    /// Take the pending OAuth `state`; a second call returns `None`.
    pub fn take_oauth_state(&self) -> Option<String> {
        let mut taken = None;
        self.store
            .update(self.id, |data| taken = data.oauth_state.take());
        taken
    }
}

/// Attach a [`SessionContext`] to every request, issuing a cookie when the
/// request did not carry a valid one.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.session_config;

    let existing = extract_token_from_cookie(request.headers(), &config.cookie_name)
        .and_then(|token| jwt::validate_token(config, &token));

    let (session_id, new_token) = match existing {
        Some(id) => (id, None),
        None => {
            let id = Uuid::new_v4();
            let pruned = state.sessions.prune();
            if pruned > 0 {
                tracing::debug!("Pruned {} expired sessions", pruned);
            }
            match jwt::create_token(config, id) {
                Ok(token) => (id, Some(token)),
                Err(e) => {
                    tracing::error!("Failed to sign session token: {}", e);
                    (id, None)
                }
            }
        }
    };

    request
        .extensions_mut()
        .insert(SessionContext::new(session_id, state.sessions.clone()));

    let response = next.run(request).await;

    match new_token {
        Some(token) => {
            let cookie = build_session_cookie(
                &config.cookie_name,
                &token,
                config.ttl.num_seconds(),
                config.secure,
            );
            let (mut parts, body) = response.into_parts();
            if let Ok(cookie_value) = cookie.parse() {
                parts.headers.append(header::SET_COOKIE, cookie_value);
            }
            Response::from_parts(parts, body)
        }
        None => response,
    }
}

fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = value.to_str() else {
            continue;
        };
        for cookie_str in cookie_header.split(';') {
            if let Ok(cookie) = cookie::Cookie::parse(cookie_str.trim()) {
                if cookie.name() == cookie_name {
                    return Some(cookie.value().to_string());
                }
            }
        }
    }

    None
}

/// Build a session cookie string.
pub fn build_session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        name, value, max_age_secs, secure
    )
}
