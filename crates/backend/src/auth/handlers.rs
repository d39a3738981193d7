//! OAuth consent flow handlers.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppResult, AuthError};
use crate::services::sync;
use crate::AppState;

use super::credentials;
use super::session::SessionContext;
use super::types::StoredCredentials;

/// Landing page: straight to the inbox when signed in.
pub async fn index(Extension(session): Extension<SessionContext>) -> Redirect {
    if session.credentials().is_some() {
        Redirect::to("/welcome")
    } else {
        Redirect::to("/authorize")
    }
}

/// Sync with existing credentials, or send the user to Google's consent page.
pub async fn authorize(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> AppResult<Response> {
    let Some(stored) = session.credentials() else {
        return Ok(start_consent(&state, &session, false));
    };

    let credentials =
        match credentials::ensure_fresh(stored, state.oauth.as_ref(), Utc::now()).await {
            Ok(credentials) => credentials,
            Err(AuthError::Required) => return Ok(Redirect::to("/reauthorize").into_response()),
            Err(e) => return Err(e.into()),
        };
    session.set_credentials(credentials.clone());

    sync_and_welcome(&state, &credentials).await
}

/// Discard stored credentials and force the consent screen.
pub async fn reauthorize(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    session.clear_credentials();
    start_consent(&state, &session, true)
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Google redirects here after consent.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(params): Query<AuthCallbackParams>,
) -> AppResult<Response> {
    let expected_state = session.take_oauth_state();

    if let Some(error) = params.error {
        return Err(AuthError::Failed(format!("Google reported '{}'", error)).into());
    }

    match (expected_state.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => {
            tracing::warn!("OAuth callback state mismatch for session {}", session.id());
            return Err(AuthError::Failed("state mismatch".to_string()).into());
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::Failed("missing authorization code".to_string()))?;

    let credentials = state.oauth.exchange_code(&code).await?;
    session.set_credentials(credentials.clone());
    tracing::info!("Authorized session {}", session.id());

    sync_and_welcome(&state, &credentials).await
}

fn start_consent(state: &AppState, session: &SessionContext, force_consent: bool) -> Response {
    let csrf_state = session.begin_oauth();
    let auth_url = state.oauth.authorization_url(&csrf_state, force_consent);
    Redirect::to(&auth_url).into_response()
}

async fn sync_and_welcome(state: &AppState, credentials: &StoredCredentials) -> AppResult<Response> {
    sync::sync_recent_emails(
        state.mailbox.as_ref(),
        state.emails.as_ref(),
        &credentials.token,
        state.settings.sync_page_size,
    )
    .await?;

    Ok(Redirect::to("/welcome").into_response())
}
