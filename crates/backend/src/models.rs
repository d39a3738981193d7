// Database models for Diesel
use chrono::NaiveDateTime;
use diesel::prelude::*;
use mailtask_types::{NewEmail, NewTask, TaskChanges};

/// Insertable struct for new emails
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::emails)]
pub struct NewEmailRow<'a> {
    pub id: &'a str,
    pub subject: &'a str,
    pub sender: &'a str,
    pub snippet: &'a str,
    pub category: &'a str,
}

impl<'a> From<&'a NewEmail> for NewEmailRow<'a> {
    fn from(email: &'a NewEmail) -> Self {
        NewEmailRow {
            id: &email.id,
            subject: &email.subject,
            sender: &email.sender,
            snippet: &email.snippet,
            category: &email.category,
        }
    }
}

/// Insertable struct for new tasks
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::tasks)]
pub struct NewTaskRow<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<NaiveDateTime>,
    pub completed: bool,
    pub email_id: Option<&'a str>,
}

impl<'a> From<&'a NewTask> for NewTaskRow<'a> {
    fn from(task: &'a NewTask) -> Self {
        NewTaskRow {
            title: &task.title,
            description: task.description.as_deref(),
            due_date: task.due_date,
            completed: false,
            email_id: task.email_id.as_deref(),
        }
    }
}

/// Full replacement of editable task columns; `None` writes NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<NaiveDateTime>,
    pub completed: bool,
}

impl<'a> From<&'a TaskChanges> for TaskChangeset<'a> {
    fn from(changes: &'a TaskChanges) -> Self {
        TaskChangeset {
            title: &changes.title,
            description: changes.description.as_deref(),
            due_date: changes.due_date,
            completed: changes.completed,
        }
    }
}
