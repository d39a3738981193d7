//! Deciding whether stored credentials can be used, refreshed, or must be
//! replaced through a fresh consent.

use chrono::{DateTime, Duration, Utc};

use crate::error::AuthError;

use super::oauth_client::OAuthClient;
use super::types::{GoogleTokenResponse, OAuthConfig, StoredCredentials, OAUTH_SCOPES};

/// Tokens expiring within this window are treated as already expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Valid,
    Refreshable,
    ReauthorizationRequired,
}

pub fn assess(credentials: &StoredCredentials, now: DateTime<Utc>) -> Freshness {
    let expired = credentials.token.is_empty()
        || credentials.is_expired(now, Duration::seconds(EXPIRY_SKEW_SECS));

    if !expired {
        Freshness::Valid
    } else if credentials.can_refresh() {
        Freshness::Refreshable
    } else {
        Freshness::ReauthorizationRequired
    }
}

/// Return usable credentials, refreshing through `oauth` when needed.
///
/// Callers must write the returned value back to the session; a refresh
/// replaces the access token and expiry.
pub async fn ensure_fresh(
    credentials: StoredCredentials,
    oauth: &dyn OAuthClient,
    now: DateTime<Utc>,
) -> Result<StoredCredentials, AuthError> {
    match assess(&credentials, now) {
        Freshness::Valid => Ok(credentials),
        Freshness::Refreshable => {
            tracing::debug!("Access token expired, refreshing");
            oauth.refresh(&credentials).await
        }
        Freshness::ReauthorizationRequired => {
            tracing::info!("Credentials expired without a refresh token");
            Err(AuthError::Required)
        }
    }
}

/// Credentials from an authorization-code exchange.
pub fn from_code_exchange(
    config: &OAuthConfig,
    response: GoogleTokenResponse,
    now: DateTime<Utc>,
) -> StoredCredentials {
    StoredCredentials {
        token: response.access_token,
        refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
        token_uri: config.token_uri.clone(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        scopes: granted_scopes(response.scope.as_deref()),
        expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
    }
}

/// Merge a refresh response into existing credentials.
///
/// Google usually omits the refresh token on refresh; the old one stays.
pub fn apply_refresh(
    mut credentials: StoredCredentials,
    response: GoogleTokenResponse,
    now: DateTime<Utc>,
) -> StoredCredentials {
    credentials.token = response.access_token;
    if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
        credentials.refresh_token = Some(refresh_token);
    }
    if response.scope.is_some() {
        credentials.scopes = granted_scopes(response.scope.as_deref());
    }
    credentials.expiry = response.expires_in.map(|secs| now + Duration::seconds(secs));
    credentials
}

fn granted_scopes(scope: Option<&str>) -> Vec<String> {
    match scope {
        Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}
