//! Mailtask web application: Gmail sync, tasks derived from email, and
//! calendar push, served as server-rendered pages.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod google;
pub mod handlers;
mod models;
pub mod repository;
mod schema;
pub mod services;
pub mod views;

use auth::{OAuthClient, SessionConfig, SessionStore};
use config::AppConfig;
use google::{CalendarApi, Mailbox};
use repository::{EmailRepository, TaskRepository};

/// Behavior knobs that handlers read on every request.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sync_page_size: u32,
    pub calendar_tz: Tz,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub emails: Arc<dyn EmailRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub oauth: Arc<dyn OAuthClient>,
    pub mailbox: Arc<dyn Mailbox>,
    pub calendar: Arc<dyn CalendarApi>,
    pub sessions: SessionStore,
    pub session_config: SessionConfig,
    pub settings: Settings,
}

impl AppState {
    /// Wire the Postgres repositories and Google clients from configuration.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::establish_connection_pool(config)?;
        let oauth_config = config.oauth_config().await?;
        tracing::info!("OAuth client configured: {:?}", oauth_config);

        let timeout = config.http_timeout();
        let ttl = chrono::Duration::hours(config.session_ttl_hours);

        Ok(Self {
            emails: Arc::new(repository::PgEmailRepository::new(pool.clone())),
            tasks: Arc::new(repository::PgTaskRepository::new(pool)),
            oauth: Arc::new(auth::GoogleOAuthClient::new(oauth_config, timeout)?),
            mailbox: Arc::new(google::GmailClient::new(timeout)?),
            calendar: Arc::new(google::CalendarClient::new(timeout)?),
            sessions: SessionStore::new(ttl),
            session_config: SessionConfig::new(config.session_key(), ttl),
            settings: Settings {
                sync_page_size: config.sync_page_size,
                calendar_tz: config.calendar_tz()?,
            },
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(auth::index))
        .route("/authorize", get(auth::authorize))
        .route("/reauthorize", get(auth::reauthorize))
        .route("/oauth2callback", get(auth::oauth_callback))
        // Email routes
        .route(
            "/welcome",
            get(handlers::emails::welcome).post(handlers::emails::welcome),
        )
        .route("/emails/filter", get(handlers::emails::filter_emails))
        // Task routes
        .route("/tasks", get(handlers::tasks::list_tasks))
        .route("/tasks/new", post(handlers::tasks::create_task))
        .route(
            "/tasks/:id/edit",
            get(handlers::tasks::edit_task_form).post(handlers::tasks::update_task),
        )
        .route("/tasks/:id/delete", post(handlers::tasks::delete_task))
        .route(
            "/tasks/:id/add_to_calendar",
            get(handlers::tasks::add_to_calendar),
        )
        .route("/health", get(handlers::health_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
