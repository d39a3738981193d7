//! Pull the most recent messages from Gmail into the email store.
//!
//! Details for the whole page are fetched before anything is written, and the
//! page is stored with a single insert that skips known ids. A failure while
//! talking to Gmail therefore leaves the store untouched, and repeating a sync
//! never duplicates rows.

use mailtask_types::NewEmail;

use crate::error::AppResult;
use crate::google::{Mailbox, MessageDetail};
use crate::repository::EmailRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Messages returned by the listing.
    pub fetched: usize,
    /// Rows that did not exist before.
    pub inserted: usize,
}

pub async fn sync_recent_emails(
    mailbox: &dyn Mailbox,
    emails: &dyn EmailRepository,
    access_token: &str,
    page_size: u32,
) -> AppResult<SyncReport> {
    let ids = mailbox.list_recent_ids(access_token, page_size).await?;

    let mut batch = Vec::with_capacity(ids.len());
    for id in &ids {
        let detail = mailbox.get_message(access_token, id).await?;
        batch.push(to_new_email(detail));
    }

    let inserted = emails.insert_all_if_absent(&batch).await?;

    let report = SyncReport {
        fetched: batch.len(),
        inserted,
    };
    tracing::info!(
        "Synced {} messages ({} new)",
        report.fetched,
        report.inserted
    );
    Ok(report)
}

/// Build a store row from message metadata.
///
/// Header names match exactly; when a header repeats, the last one wins.
pub fn to_new_email(detail: MessageDetail) -> NewEmail {
    let mut subject = String::new();
    let mut sender = String::new();

    for header in detail.headers {
        match header.name.as_str() {
            "Subject" => subject = header.value,
            "From" => sender = header.value,
            other => tracing::trace!("Ignoring header {} on {}", other, detail.id),
        }
    }

    NewEmail::inbox(detail.id, subject, sender, detail.snippet)
}
