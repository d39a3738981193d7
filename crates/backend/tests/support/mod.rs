//! Shared fixtures for router-level tests: fake Google ports, in-memory
//! repositories, and a cookie-carrying client.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tower::ServiceExt;

use mailtask_backend::auth::types::StoredCredentials;
use mailtask_backend::auth::{OAuthClient, SessionConfig, SessionStore};
use mailtask_backend::error::{AuthError, UpstreamError};
use mailtask_backend::google::{CalendarApi, CalendarEvent, Mailbox, MessageDetail, MessageHeader};
use mailtask_backend::repository::{InMemoryEmailRepository, InMemoryTaskRepository};
use mailtask_backend::{build_router, AppState, Settings};

pub const FAKE_AUTH_URL: &str = "https://accounts.test/o/oauth2/auth";

/// Codes accepted by [`FakeOAuth::exchange_code`].
pub const GOOD_CODE: &str = "good-code";
pub const STALE_CODE: &str = "stale-code";
pub const REFRESHABLE_CODE: &str = "refreshable-code";

#[derive(Default)]
pub struct FakeOAuth {
    pub exchanges: AtomicUsize,
    pub refreshes: AtomicUsize,
}

fn credentials(token: &str, refresh: Option<&str>, expires_in: Duration) -> StoredCredentials {
    StoredCredentials {
        token: token.to_string(),
        refresh_token: refresh.map(str::to_string),
        token_uri: "https://accounts.test/token".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/gmail.readonly".to_string()],
        expiry: Some(Utc::now() + expires_in),
    }
}

#[async_trait]
impl OAuthClient for FakeOAuth {
    fn authorization_url(&self, state: &str, force_consent: bool) -> String {
        format!("{}?state={}&consent={}", FAKE_AUTH_URL, state, force_consent)
    }

    async fn exchange_code(&self, code: &str) -> Result<StoredCredentials, AuthError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        match code {
            GOOD_CODE => Ok(credentials("access-1", Some("refresh"), Duration::hours(1))),
            // Already expired and not refreshable.
            STALE_CODE => Ok(credentials("access-old", None, Duration::hours(-1))),
            // Already expired but carries a refresh token.
            REFRESHABLE_CODE => Ok(credentials(
                "access-expired",
                Some("refresh"),
                Duration::hours(-1),
            )),
            other => Err(AuthError::Failed(format!("unknown code {}", other))),
        }
    }

    async fn refresh(
        &self,
        current: &StoredCredentials,
    ) -> Result<StoredCredentials, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let mut refreshed = current.clone();
        refreshed.token = "access-refreshed".to_string();
        refreshed.expiry = Some(Utc::now() + Duration::hours(1));
        Ok(refreshed)
    }
}

pub struct FakeMailbox {
    messages: Vec<MessageDetail>,
    pub list_calls: AtomicUsize,
    pub fail: AtomicBool,
    /// Access token of every list call, in order.
    pub tokens: Mutex<Vec<String>>,
}

impl FakeMailbox {
    pub fn with_messages(count: usize) -> Self {
        let messages = (0..count)
            .map(|i| MessageDetail {
                id: format!("msg-{}", i),
                snippet: format!("Snippet number {}", i),
                headers: vec![
                    MessageHeader::new("Subject", format!("Subject {}", i)),
                    MessageHeader::new("From", format!("Sender {} <sender{}@example.com>", i, i)),
                ],
            })
            .collect();

        Self {
            messages,
            list_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            tokens: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_recent_ids(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<String>, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().push(access_token.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::Timeout {
                service: "gmail",
                seconds: 30,
            });
        }
        Ok(self
            .messages
            .iter()
            .take(max_results as usize)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn get_message(
        &self,
        _access_token: &str,
        message_id: &str,
    ) -> Result<MessageDetail, UpstreamError> {
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| UpstreamError::malformed("gmail", "unknown message"))
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    pub events: Mutex<Vec<(String, String, CalendarEvent)>>,
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Option<String>, UpstreamError> {
        let mut events = self.events.lock();
        events.push((
            access_token.to_string(),
            calendar_id.to_string(),
            event.clone(),
        ));
        Ok(Some(format!("event-{}", events.len())))
    }
}

/// A router wired to fakes, plus a single browser's cookie jar.
pub struct TestApp {
    router: Router,
    cookie: Mutex<Option<String>>,
    pub emails: InMemoryEmailRepository,
    pub tasks: InMemoryTaskRepository,
    pub oauth: Arc<FakeOAuth>,
    pub mailbox: Arc<FakeMailbox>,
    pub calendar: Arc<FakeCalendar>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_messages(5)
    }

    pub fn with_messages(count: usize) -> Self {
        let emails = InMemoryEmailRepository::new();
        let tasks = InMemoryTaskRepository::new();
        let oauth = Arc::new(FakeOAuth::default());
        let mailbox = Arc::new(FakeMailbox::with_messages(count));
        let calendar = Arc::new(FakeCalendar::default());
        let ttl = Duration::hours(1);

        let state = AppState {
            emails: Arc::new(emails.clone()),
            tasks: Arc::new(tasks.clone()),
            oauth: oauth.clone(),
            mailbox: mailbox.clone(),
            calendar: calendar.clone(),
            sessions: SessionStore::new(ttl),
            session_config: SessionConfig {
                secret: "integration-test-secret".to_string(),
                cookie_name: "mailtask_session".to_string(),
                ttl,
                secure: false,
            },
            settings: Settings {
                sync_page_size: 20,
                calendar_tz: Tz::UTC,
            },
        };

        Self {
            router: build_router(state),
            cookie: Mutex::new(None),
            emails,
            tasks,
            oauth,
            mailbox,
            calendar,
        }
    }

    async fn send(&self, method: Method, uri: &str, form: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = self.cookie.lock().clone() {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string();
            *self.cookie.lock() = Some(pair);
        }

        response
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response {
        self.send(Method::POST, uri, Some(form)).await
    }

    /// Run the consent round trip, returning the callback response.
    pub async fn sign_in_with(&self, code: &str) -> Response {
        let response = self.get("/authorize").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let state = state_param(&location(&response));
        self.get(&format!("/oauth2callback?code={}&state={}", code, state))
            .await
    }

    pub async fn sign_in(&self) {
        let response = self.sign_in_with(GOOD_CODE).await;
        assert_eq!(location(&response), "/welcome");
    }
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response should redirect")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn state_param(url: &str) -> String {
    url.split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("authorization url should carry state")
        .to_string()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
