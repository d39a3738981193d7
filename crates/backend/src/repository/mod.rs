//! Repository ports for emails and tasks.
//!
//! Handlers and services only see these traits; [`postgres`] is the
//! production adapter and [`memory`] backs tests and local experiments.

use async_trait::async_trait;
use mailtask_types::{Email, NewEmail, NewTask, Task, TaskChanges};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryEmailRepository, InMemoryTaskRepository};
pub use postgres::{PgEmailRepository, PgTaskRepository};

/// Result type for repository operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by repository implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No connection could be checked out of the pool.
    #[error("database connection unavailable: {0}")]
    Pool(String),

    /// The query itself failed (constraint violation, lost connection...).
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
}

/// Persistence contract for synced email metadata.
#[async_trait]
pub trait EmailRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Email>>;

    /// Stores the email unless a row with the same id already exists.
    ///
    /// Returns `true` when a row was written.
    async fn insert_if_absent(&self, email: &NewEmail) -> StorageResult<bool> {
        let inserted = self
            .insert_all_if_absent(std::slice::from_ref(email))
            .await?;
        Ok(inserted > 0)
    }

    /// Stores a whole batch in one atomic step, skipping ids already present
    /// (including duplicates inside the batch). Returns the number of new rows.
    async fn insert_all_if_absent(&self, batch: &[NewEmail]) -> StorageResult<usize>;

    async fn list_all(&self) -> StorageResult<Vec<Email>>;

    /// Emails whose sender contains `query`, ignoring case.
    async fn filter_by_sender(&self, query: &str) -> StorageResult<Vec<Email>>;
}

/// Persistence contract for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks in id order.
    async fn list_all(&self) -> StorageResult<Vec<Task>>;

    async fn find_by_id(&self, id: i32) -> StorageResult<Option<Task>>;

    /// Stores a new, not yet completed task and returns it with its id.
    async fn create(&self, task: &NewTask) -> StorageResult<Task>;

    /// Replaces the editable fields. Returns `None` when the task does not exist.
    async fn update(&self, id: i32, changes: &TaskChanges) -> StorageResult<Option<Task>>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: i32) -> StorageResult<bool>;
}
