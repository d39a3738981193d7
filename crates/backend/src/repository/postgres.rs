//! PostgreSQL adapters built on diesel-async.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::deadpool::Object, AsyncPgConnection, RunQueryDsl,
};
use mailtask_types::{Email, NewEmail, NewTask, Task, TaskChanges};

use super::{EmailRepository, StorageError, StorageResult, TaskRepository};
use crate::db::DbPool;
use crate::models::{NewEmailRow, NewTaskRow, TaskChangeset};

async fn get_conn(pool: &DbPool) -> StorageResult<Object<AsyncPgConnection>> {
    pool.get()
        .await
        .map_err(|e| StorageError::Pool(e.to_string()))
}

/// Escape `LIKE` metacharacters so user input matches literally.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Email database operations
mod emails {
    use super::*;

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        email_id: &str,
    ) -> StorageResult<Option<Email>> {
        use crate::schema::emails::dsl::*;

        let email = emails
            .find(email_id)
            .first::<Email>(conn)
            .await
            .optional()?;

        Ok(email)
    }

    /// Single `INSERT ... ON CONFLICT (id) DO NOTHING` for the whole batch.
    pub async fn insert_all_if_absent(
        conn: &mut AsyncPgConnection,
        rows: &[NewEmailRow<'_>],
    ) -> StorageResult<usize> {
        use crate::schema::emails::dsl::*;

        if rows.is_empty() {
            return Ok(0);
        }

        let inserted = diesel::insert_into(emails)
            .values(rows)
            .on_conflict(id)
            .do_nothing()
            .execute(conn)
            .await?;

        Ok(inserted)
    }

    pub async fn list_all(conn: &mut AsyncPgConnection) -> StorageResult<Vec<Email>> {
        use crate::schema::emails::dsl::*;

        let items = emails.load::<Email>(conn).await?;
        Ok(items)
    }

    pub async fn filter_by_sender(
        conn: &mut AsyncPgConnection,
        query: &str,
    ) -> StorageResult<Vec<Email>> {
        use crate::schema::emails::dsl::*;

        let pattern = format!("%{}%", escape_like(query));
        let items = emails
            .filter(sender.ilike(pattern))
            .load::<Email>(conn)
            .await?;

        Ok(items)
    }
}

// Task database operations
mod tasks {
    use super::*;

    pub async fn list_all(conn: &mut AsyncPgConnection) -> StorageResult<Vec<Task>> {
        use crate::schema::tasks::dsl::*;

        let items = tasks.order_by(id.asc()).load::<Task>(conn).await?;
        Ok(items)
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        task_id: i32,
    ) -> StorageResult<Option<Task>> {
        use crate::schema::tasks::dsl::*;

        let task = tasks.find(task_id).first::<Task>(conn).await.optional()?;
        Ok(task)
    }

    pub async fn create(conn: &mut AsyncPgConnection, row: NewTaskRow<'_>) -> StorageResult<Task> {
        use crate::schema::tasks::dsl::*;

        let task = diesel::insert_into(tasks)
            .values(&row)
            .get_result::<Task>(conn)
            .await?;

        Ok(task)
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        task_id: i32,
        changes: TaskChangeset<'_>,
    ) -> StorageResult<Option<Task>> {
        use crate::schema::tasks::dsl::*;

        let updated = diesel::update(tasks.find(task_id))
            .set(&changes)
            .get_result::<Task>(conn)
            .await
            .optional()?;

        Ok(updated)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, task_id: i32) -> StorageResult<bool> {
        use crate::schema::tasks::dsl::*;

        let deleted = diesel::delete(tasks.find(task_id)).execute(conn).await?;
        Ok(deleted > 0)
    }
}

/// Email repository backed by PostgreSQL.
#[derive(Clone)]
pub struct PgEmailRepository {
    pool: DbPool,
}

impl PgEmailRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailRepository for PgEmailRepository {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<Email>> {
        let mut conn = get_conn(&self.pool).await?;
        emails::find_by_id(&mut conn, id).await
    }

    async fn insert_all_if_absent(&self, batch: &[NewEmail]) -> StorageResult<usize> {
        let rows: Vec<NewEmailRow<'_>> = batch.iter().map(NewEmailRow::from).collect();
        let mut conn = get_conn(&self.pool).await?;
        emails::insert_all_if_absent(&mut conn, &rows).await
    }

    async fn list_all(&self) -> StorageResult<Vec<Email>> {
        let mut conn = get_conn(&self.pool).await?;
        emails::list_all(&mut conn).await
    }

    async fn filter_by_sender(&self, query: &str) -> StorageResult<Vec<Email>> {
        let mut conn = get_conn(&self.pool).await?;
        emails::filter_by_sender(&mut conn, query).await
    }
}

/// Task repository backed by PostgreSQL.
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: DbPool,
}

impl PgTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list_all(&self) -> StorageResult<Vec<Task>> {
        let mut conn = get_conn(&self.pool).await?;
        tasks::list_all(&mut conn).await
    }

    async fn find_by_id(&self, id: i32) -> StorageResult<Option<Task>> {
        let mut conn = get_conn(&self.pool).await?;
        tasks::find_by_id(&mut conn, id).await
    }

    async fn create(&self, task: &NewTask) -> StorageResult<Task> {
        let mut conn = get_conn(&self.pool).await?;
        tasks::create(&mut conn, NewTaskRow::from(task)).await
    }

    async fn update(&self, id: i32, changes: &TaskChanges) -> StorageResult<Option<Task>> {
        let mut conn = get_conn(&self.pool).await?;
        tasks::update(&mut conn, id, TaskChangeset::from(changes)).await
    }

    async fn delete(&self, id: i32) -> StorageResult<bool> {
        let mut conn = get_conn(&self.pool).await?;
        tasks::delete(&mut conn, id).await
    }
}
