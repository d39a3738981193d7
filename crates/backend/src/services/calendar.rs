//! Pushing a task onto the user's primary calendar.

use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use mailtask_types::Task;

use crate::error::{AppError, AppResult};
use crate::google::{CalendarApi, CalendarEvent, PRIMARY_CALENDAR};

/// Every pushed task becomes a one-hour event.
pub const EVENT_LENGTH_MINUTES: i64 = 60;

/// Describe `task` as a calendar event, reading its due date in `tz`.
pub fn build_event(task: &Task, tz: Tz) -> AppResult<CalendarEvent> {
    let due = task.due_date.ok_or_else(|| {
        AppError::validation(format!(
            "Task {} has no due date; set one before adding it to the calendar",
            task.id
        ))
    })?;

    // Times skipped by a DST jump have no instant; ambiguous ones take the earlier.
    let start = tz
        .from_local_datetime(&due)
        .earliest()
        .ok_or_else(|| {
            AppError::validation(format!("{} does not exist in {}", due, tz.name()))
        })?
        .with_timezone(&Utc);

    Ok(CalendarEvent {
        summary: task.title.clone(),
        description: task.description.clone(),
        start,
        end: start + Duration::minutes(EVENT_LENGTH_MINUTES),
        time_zone: tz.name().to_string(),
    })
}

/// Create an event for `task`, returning the new event id.
///
/// Pushing the same task twice creates two events.
pub async fn push_task(
    calendar: &dyn CalendarApi,
    access_token: &str,
    task: &Task,
    tz: Tz,
) -> AppResult<Option<String>> {
    let event = build_event(task, tz)?;
    let event_id = calendar
        .insert_event(access_token, PRIMARY_CALENDAR, &event)
        .await?;
    tracing::info!("Task {} added to calendar as {:?}", task.id, event_id);
    Ok(event_id)
}
