//! Postgres adapters against an embedded PostgreSQL cluster.
//!
//! Each test gets its own database cloned from a template that already has
//! the migration applied.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_async::pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;
use mailtask_backend::repository::{
    EmailRepository, PgEmailRepository, PgTaskRepository, TaskRepository,
};
use mailtask_types::{NewEmail, NewTask, TaskChanges};
use pg_embedded_setup_unpriv::{test_support::shared_test_cluster, TestCluster};
use rstest::rstest;
use tokio::runtime::Runtime;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CREATE_TABLES_SQL: &str =
    include_str!("../migrations/2025-01-01-000000_create_emails_and_tasks/up.sql");

const TEMPLATE_DB: &str = "mailtask_test_template";

fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_TABLES_SQL)
                .map_err(|e| eyre::eyre!("migration failed: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Repositories sharing a single-connection pool on a fresh database.
///
/// The pool is built lazily, so this can run outside the runtime.
fn setup_repositories(
    cluster: &TestCluster,
    db_name: &str,
) -> Result<(PgEmailRepository, PgTaskRepository), BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
    let pool = Pool::builder(manager).max_size(1).build()?;
    Ok((
        PgEmailRepository::new(pool.clone()),
        PgTaskRepository::new(pool),
    ))
}

/// Drops the per-test database even when the test panics.
struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

fn fresh_database<'a>(cluster: &'a TestCluster, prefix: &str) -> CleanupGuard<'a> {
    ensure_template(cluster).expect("template setup");
    CleanupGuard {
        cluster,
        db_name: format!("test_{}_{}", prefix, uuid::Uuid::new_v4().simple()),
    }
}

fn inbox_batch(count: usize) -> Vec<NewEmail> {
    (0..count)
        .map(|i| {
            NewEmail::inbox(
                format!("msg-{}", i),
                format!("Subject {}", i),
                format!("Sender {} <sender{}@example.com>", i, i),
                format!("Snippet {}", i),
            )
        })
        .collect()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

#[rstest]
fn resyncing_a_batch_inserts_nothing(shared_test_cluster: &'static TestCluster) {
    let db = fresh_database(shared_test_cluster, "resync");
    let (emails, _) = setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();
    let batch = inbox_batch(5);

    let first = rt.block_on(emails.insert_all_if_absent(&batch)).expect("first sync");
    let second = rt.block_on(emails.insert_all_if_absent(&batch)).expect("second sync");
    assert_eq!(first, 5);
    assert_eq!(second, 0);

    let stored = rt.block_on(emails.list_all()).expect("list emails");
    assert_eq!(stored.len(), 5);

    let email = rt
        .block_on(emails.find_by_id("msg-3"))
        .expect("find email")
        .expect("msg-3 stored");
    assert_eq!(email.subject, "Subject 3");
    assert_eq!(email.category, "Inbox");
}

#[rstest]
fn duplicate_ids_within_a_batch_are_stored_once(shared_test_cluster: &'static TestCluster) {
    let db = fresh_database(shared_test_cluster, "dup_batch");
    let (emails, _) = setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();

    let batch = vec![
        NewEmail::inbox("same", "First copy", "a@example.com", "one"),
        NewEmail::inbox("other", "Other", "b@example.com", "two"),
        NewEmail::inbox("same", "Second copy", "a@example.com", "three"),
    ];

    let inserted = rt.block_on(emails.insert_all_if_absent(&batch)).expect("sync");
    assert_eq!(inserted, 2);
    assert_eq!(rt.block_on(emails.list_all()).expect("list emails").len(), 2);

    let email = rt
        .block_on(emails.find_by_id("same"))
        .expect("find email")
        .expect("row stored");
    assert_eq!(email.subject, "First copy");

    assert!(!rt
        .block_on(emails.insert_if_absent(&batch[1]))
        .expect("single insert"));
}

#[rstest]
fn sender_filter_matches_like_metacharacters_literally(
    shared_test_cluster: &'static TestCluster,
) {
    let db = fresh_database(shared_test_cluster, "filter");
    let (emails, _) = setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();

    let batch = vec![
        NewEmail::inbox("promo", "Sale", "50% OFF <deals@shop.test>", "today"),
        NewEmail::inbox("bulk", "Bulk", "500 Club <club@shop.test>", "join"),
        NewEmail::inbox("under", "Note", "first_last@example.com", "hi"),
        NewEmail::inbox("plain", "Note", "firstXlast@example.com", "hi"),
    ];
    rt.block_on(emails.insert_all_if_absent(&batch)).expect("seed");

    let matched = rt.block_on(emails.filter_by_sender("50%")).expect("filter");
    let ids: Vec<&str> = matched.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["promo"]);

    let matched = rt.block_on(emails.filter_by_sender("_last")).expect("filter");
    let ids: Vec<&str> = matched.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["under"]);

    let matched = rt.block_on(emails.filter_by_sender("SHOP.TEST")).expect("filter");
    assert_eq!(matched.len(), 2);
}

#[rstest]
fn update_clears_optional_fields(shared_test_cluster: &'static TestCluster) {
    let db = fresh_database(shared_test_cluster, "update");
    let (_, tasks) = setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();

    let created = rt
        .block_on(tasks.create(&NewTask {
            title: "Pay invoice".to_string(),
            description: Some("Landlord".to_string()),
            due_date: Some(at(2024, 5, 1, 10)),
            email_id: None,
        }))
        .expect("create task");
    assert!(!created.completed);

    let changes = TaskChanges {
        title: "Pay invoice".to_string(),
        description: None,
        due_date: None,
        completed: true,
    };
    let updated = rt
        .block_on(tasks.update(created.id, &changes))
        .expect("update task")
        .expect("task exists");
    assert_eq!(updated.description, None);
    assert_eq!(updated.due_date, None);
    assert!(updated.completed);

    let reloaded = rt
        .block_on(tasks.find_by_id(created.id))
        .expect("find task")
        .expect("task exists");
    assert_eq!(reloaded, updated);
}

#[rstest]
fn missing_task_updates_and_deletes_report_absence(shared_test_cluster: &'static TestCluster) {
    let db = fresh_database(shared_test_cluster, "missing");
    let (_, tasks) = setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();

    let changes = TaskChanges {
        title: "Ghost".to_string(),
        description: None,
        due_date: None,
        completed: false,
    };
    assert!(rt
        .block_on(tasks.update(404, &changes))
        .expect("update query")
        .is_none());
    assert!(!rt.block_on(tasks.delete(404)).expect("delete query"));
}

#[rstest]
fn tasks_link_to_stored_emails(shared_test_cluster: &'static TestCluster) {
    let db = fresh_database(shared_test_cluster, "link");
    let (emails, tasks) =
        setup_repositories(shared_test_cluster, &db.db_name).expect("repositories");
    let rt = test_runtime();

    rt.block_on(emails.insert_all_if_absent(&inbox_batch(1))).expect("seed");

    let first = rt
        .block_on(tasks.create(&NewTask {
            title: "Reply".to_string(),
            description: None,
            due_date: None,
            email_id: Some("msg-0".to_string()),
        }))
        .expect("create linked task");
    let second = rt
        .block_on(tasks.create(&NewTask {
            title: "Archive".to_string(),
            description: None,
            due_date: None,
            email_id: None,
        }))
        .expect("create task");

    let listed = rt.block_on(tasks.list_all()).expect("list tasks");
    let ids: Vec<i32> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(listed[0].email_id.as_deref(), Some("msg-0"));

    let dangling = rt.block_on(tasks.create(&NewTask {
        title: "Orphan".to_string(),
        description: None,
        due_date: None,
        email_id: Some("missing".to_string()),
    }));
    assert!(dangling.is_err());
}
