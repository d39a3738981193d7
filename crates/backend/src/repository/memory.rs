//! In-memory repositories for tests and database-less runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mailtask_types::{Email, NewEmail, NewTask, Task, TaskChanges};
use parking_lot::RwLock;

use super::{EmailRepository, StorageResult, TaskRepository};

/// Thread-safe in-memory email repository. Keeps insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailRepository {
    emails: Arc<RwLock<Vec<Email>>>,
}

impl InMemoryEmailRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.emails.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.read().is_empty()
    }
}

#[async_trait]
impl EmailRepository for InMemoryEmailRepository {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Email>> {
        Ok(self.emails.read().iter().find(|e| e.id == id).cloned())
    }

    async fn insert_all_if_absent(&self, batch: &[NewEmail]) -> StorageResult<usize> {
        // One write lock for the whole batch keeps it atomic.
        let mut emails = self.emails.write();
        let mut inserted = 0;
        for email in batch {
            if emails.iter().any(|e| e.id == email.id) {
                continue;
            }
            emails.push(email.clone().into());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list_all(&self) -> StorageResult<Vec<Email>> {
        Ok(self.emails.read().clone())
    }

    async fn filter_by_sender(&self, query: &str) -> StorageResult<Vec<Email>> {
        let needle = query.to_lowercase();
        Ok(self
            .emails
            .read()
            .iter()
            .filter(|e| e.sender.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: BTreeMap<i32, Task>,
    last_id: i32,
}

/// Thread-safe in-memory task repository with serial ids starting at 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().tasks.is_empty()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list_all(&self) -> StorageResult<Vec<Task>> {
        Ok(self.state.read().tasks.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i32) -> StorageResult<Option<Task>> {
        Ok(self.state.read().tasks.get(&id).cloned())
    }

    async fn create(&self, task: &NewTask) -> StorageResult<Task> {
        let mut state = self.state.write();
        state.last_id += 1;
        let created = Task {
            id: state.last_id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            completed: false,
            email_id: task.email_id.clone(),
        };
        state.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: &TaskChanges) -> StorageResult<Option<Task>> {
        let mut state = self.state.write();
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.title = changes.title.clone();
            task.description = changes.description.clone();
            task.due_date = changes.due_date;
            task.completed = changes.completed;
            task.clone()
        }))
    }

    async fn delete(&self, id: i32) -> StorageResult<bool> {
        Ok(self.state.write().tasks.remove(&id).is_some())
    }
}
