//! Google API ports used by the web layer, plus their hub-backed adapters.
//!
//! Every call takes the caller's access token, so one client serves every
//! session. The traits exist so handlers and services can be exercised
//! against in-memory fakes.

mod calendar;
mod gmail;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::UpstreamError;

pub use calendar::CalendarClient;
pub use gmail::GmailClient;

/// Calendar used for every pushed task.
pub const PRIMARY_CALENDAR: &str = "primary";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata for one message: id, snippet and top-level headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetail {
    pub id: String,
    pub snippet: String,
    pub headers: Vec<MessageHeader>,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Ids of the most recent messages, newest first, at most `max_results`.
    async fn list_recent_ids(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<String>, UpstreamError>;

    async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<MessageDetail, UpstreamError>;
}

/// A timed event to create on a calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA zone name recorded on the event.
    pub time_zone: String,
}

#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Create the event, returning the id Google assigned to it.
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Option<String>, UpstreamError>;
}

/// Bound a Google call by `timeout`.
pub(crate) async fn with_timeout<T, F>(
    service: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout {
            service,
            seconds: timeout.as_secs(),
        }),
    }
}

/// Map a failed call to an [`UpstreamError`], singling out rejected tokens.
pub(crate) fn classify_failure(
    service: &'static str,
    status: Option<u64>,
    err: impl std::fmt::Display,
) -> UpstreamError {
    match status {
        Some(401) => UpstreamError::Unauthorized { service },
        _ => UpstreamError::request(service, err),
    }
}

/// HTTP status carried in a Google JSON error body.
pub(crate) fn status_from_error_body(body: &serde_json::Value) -> Option<u64> {
    body.get("error")?.get("code")?.as_u64()
}
