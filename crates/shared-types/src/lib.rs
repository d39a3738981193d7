use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

mod task_input;

pub use task_input::{parse_due_date, TaskForm, TaskInputError};

/// Category assigned to every synced email. Nothing reassigns it.
pub const DEFAULT_EMAIL_CATEGORY: &str = "Inbox";

/// Email struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct Email {
    pub id: String, // provider message id
    pub subject: String,
    pub sender: String,
    pub snippet: String,
    pub category: String,
}

/// Message metadata pulled from the provider, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmail {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: String,
    pub category: String,
}

impl NewEmail {
    /// Build an email filed under the default category.
    pub fn inbox(
        id: impl Into<String>,
        subject: impl Into<String>,
        sender: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        NewEmail {
            id: id.into(),
            subject: subject.into(),
            sender: sender.into(),
            snippet: snippet.into(),
            category: DEFAULT_EMAIL_CATEGORY.to_string(),
        }
    }
}

impl From<NewEmail> for Email {
    fn from(email: NewEmail) -> Self {
        Email {
            id: email.id,
            subject: email.subject,
            sender: email.sender,
            snippet: email.snippet,
            category: email.category,
        }
    }
}

/// Task struct matching database column order exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub completed: bool,
    pub email_id: Option<String>,
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub email_id: Option<String>,
}

/// Full replacement of the user-editable task fields.
///
/// `email_id` is deliberately absent: the originating email never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub completed: bool,
}

/// OAuth token set held in a browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    /// When the access token stops being accepted. `None` means unknown,
    /// which is treated as still valid.
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    /// Whether the access token is past its expiry, allowing `skew` of slack.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        match self.expiry {
            Some(expiry) => now + skew >= expiry,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}
