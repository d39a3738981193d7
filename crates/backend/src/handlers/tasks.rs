//! Task pages: list, create, edit, delete, and push to calendar.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    response::{Html, Redirect},
    Extension, Form,
};
use chrono::Utc;
use mailtask_types::{Task, TaskForm};
use minijinja::context;
use serde::Serialize;

use crate::auth::{credentials, SessionContext};
use crate::error::{AppError, AppResult, AuthError};
use crate::services::calendar;
use crate::views;
use crate::AppState;

const DUE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";
const DUE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Task shaped for the templates.
#[derive(Debug, Serialize)]
struct TaskView {
    id: i32,
    title: String,
    description: Option<String>,
    completed: bool,
    email_id: Option<String>,
    due_display: Option<String>,
    due_input: Option<String>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            due_display: task
                .due_date
                .map(|d| d.format(DUE_DISPLAY_FORMAT).to_string()),
            due_input: task.due_date.map(|d| d.format(DUE_INPUT_FORMAT).to_string()),
            title: task.title,
            description: task.description,
            completed: task.completed,
            email_id: task.email_id,
        }
    }
}

/// Task id from the `:id` path segment. Anything that is not a valid id
/// names no task, so it renders the not-found page.
#[derive(Debug, Clone, Copy)]
pub struct TaskId(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::not_found("Task"))?;

        raw.parse()
            .map(TaskId)
            .map_err(|_| AppError::not_found(format!("Task {}", raw)))
    }
}

async fn find_task(state: &AppState, id: i32) -> AppResult<Task> {
    state
        .tasks
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task {}", id)))
}

pub async fn list_tasks(State(state): State<AppState>) -> AppResult<Html<String>> {
    let tasks: Vec<TaskView> = state
        .tasks
        .list_all()
        .await?
        .into_iter()
        .map(TaskView::from)
        .collect();

    views::render("tasks.html", context! { tasks => tasks })
}

pub async fn create_task(
    State(state): State<AppState>,
    Form(form): Form<TaskForm>,
) -> AppResult<Redirect> {
    let new_task = form.into_new_task()?;

    if let Some(email_id) = &new_task.email_id {
        if state.emails.find_by_id(email_id).await?.is_none() {
            return Err(AppError::validation(format!(
                "email {} does not exist",
                email_id
            )));
        }
    }

    let task = state.tasks.create(&new_task).await?;
    tracing::info!("Created task {}: {}", task.id, task.title);

    Ok(Redirect::to("/tasks"))
}

pub async fn edit_task_form(
    State(state): State<AppState>,
    TaskId(id): TaskId,
) -> AppResult<Html<String>> {
    let task = find_task(&state, id).await?;
    views::render("task_edit.html", context! { task => TaskView::from(task) })
}

pub async fn update_task(
    State(state): State<AppState>,
    TaskId(id): TaskId,
    Form(form): Form<TaskForm>,
) -> AppResult<Redirect> {
    let changes = form.into_changes()?;

    let task = state
        .tasks
        .update(id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Task {}", id)))?;
    tracing::info!("Updated task {} (completed: {})", task.id, task.completed);

    Ok(Redirect::to("/tasks"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    TaskId(id): TaskId,
) -> AppResult<Redirect> {
    if !state.tasks.delete(id).await? {
        return Err(AppError::not_found(format!("Task {}", id)));
    }
    tracing::info!("Deleted task {}", id);

    Ok(Redirect::to("/tasks"))
}

/// Create a one-hour event for the task on the primary calendar.
pub async fn add_to_calendar(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    TaskId(id): TaskId,
) -> AppResult<Redirect> {
    let stored = session.credentials().ok_or(AuthError::Required)?;
    let task = find_task(&state, id).await?;

    // Reject undated tasks before touching the token endpoint.
    calendar::build_event(&task, state.settings.calendar_tz)?;

    let credentials =
        credentials::ensure_fresh(stored, state.oauth.as_ref(), Utc::now()).await?;
    session.set_credentials(credentials.clone());

    calendar::push_task(
        state.calendar.as_ref(),
        &credentials.token,
        &task,
        state.settings.calendar_tz,
    )
    .await?;

    Ok(Redirect::to("/tasks"))
}
