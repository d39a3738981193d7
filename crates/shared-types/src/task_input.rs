//! Task form parsing.
//!
//! HTML forms submit every field as a string. This module turns those raw
//! strings into [`NewTask`] / [`TaskChanges`], rejecting blank titles and
//! unparsable due dates instead of storing them verbatim.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{NewTask, TaskChanges};

/// Formats accepted for `due_date`, tried in order.
const DUE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskInputError {
    #[error("title is required")]
    MissingTitle,

    #[error("invalid due date '{0}', expected YYYY-MM-DDTHH:MM[:SS] or YYYY-MM-DD")]
    InvalidDueDate(String),
}

/// Raw task form as submitted by the browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub email_id: String,
    /// Checkbox: present (any value) means checked.
    #[serde(default)]
    pub completed: Option<String>,
}

impl TaskForm {
    pub fn into_new_task(self) -> Result<NewTask, TaskInputError> {
        Ok(NewTask {
            title: required_title(&self.title)?,
            description: non_blank(&self.description),
            due_date: parse_due_date(&self.due_date)?,
            email_id: non_blank_id(&self.email_id),
        })
    }

    pub fn into_changes(self) -> Result<TaskChanges, TaskInputError> {
        Ok(TaskChanges {
            title: required_title(&self.title)?,
            description: non_blank(&self.description),
            due_date: parse_due_date(&self.due_date)?,
            completed: self.completed.is_some(),
        })
    }
}

/// Parse a form due date. Blank input means "no due date".
pub fn parse_due_date(raw: &str) -> Result<Option<NaiveDateTime>, TaskInputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    for format in DUE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(parsed));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Some)
        .ok_or_else(|| TaskInputError::InvalidDueDate(raw.to_string()))
}

fn required_title(raw: &str) -> Result<String, TaskInputError> {
    non_blank(raw).ok_or(TaskInputError::MissingTitle)
}

/// Keeps the submitted text as-is; whitespace only counts for the blank check.
fn non_blank(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn non_blank_id(raw: &str) -> Option<String> {
    Some(raw.trim()).filter(|id| !id.is_empty()).map(str::to_string)
}
