//! Email listing pages.

use axum::{
    extract::{Query, State},
    response::Html,
};
use mailtask_types::Email;
use minijinja::context;
use serde::Deserialize;

use crate::error::AppResult;
use crate::views;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SenderQuery {
    pub sender: Option<String>,
}

impl SenderQuery {
    /// The trimmed filter text; blank means no filter.
    pub fn needle(&self) -> Option<&str> {
        self.sender
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

async fn load_emails(state: &AppState, query: &SenderQuery) -> AppResult<Vec<Email>> {
    let emails = match query.needle() {
        Some(needle) => state.emails.filter_by_sender(needle).await?,
        None => state.emails.list_all().await?,
    };
    Ok(emails)
}

/// Inbox page shown after a sync.
pub async fn welcome(
    State(state): State<AppState>,
    Query(query): Query<SenderQuery>,
) -> AppResult<Html<String>> {
    let emails = load_emails(&state, &query).await?;
    views::render(
        "welcome.html",
        context! {
            emails => emails,
            sender => query.needle().unwrap_or_default(),
        },
    )
}

pub async fn filter_emails(
    State(state): State<AppState>,
    Query(query): Query<SenderQuery>,
) -> AppResult<Html<String>> {
    let emails = load_emails(&state, &query).await?;
    tracing::debug!(
        "Sender filter {:?} matched {} emails",
        query.needle(),
        emails.len()
    );
    views::render(
        "emails.html",
        context! {
            emails => emails,
            sender => query.needle().unwrap_or_default(),
        },
    )
}
