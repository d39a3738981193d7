//! Google OAuth 2.0 web-server flow: consent URL, code exchange and refresh.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::AuthError;

use super::credentials;
use super::types::{GoogleTokenResponse, OAuthConfig, StoredCredentials, OAUTH_SCOPES};

/// Token endpoint operations, abstracted so handlers can run against a fake.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Consent page URL carrying `state`. `force_consent` makes Google show
    /// the consent screen again, which is what yields a new refresh token.
    fn authorization_url(&self, state: &str, force_consent: bool) -> String;

    async fn exchange_code(&self, code: &str) -> Result<StoredCredentials, AuthError>;

    async fn refresh(&self, credentials: &StoredCredentials)
        -> Result<StoredCredentials, AuthError>;
}

pub struct GoogleOAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'static str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
}

impl GoogleOAuthClient {
    pub fn new(config: OAuthConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, http })
    }

    async fn post_token<T: Serialize + ?Sized>(
        &self,
        token_uri: &str,
        form: &T,
    ) -> Result<GoogleTokenResponse, AuthError> {
        let response = self
            .http
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Failed("token endpoint timed out".to_string())
                } else {
                    AuthError::Failed(format!("token endpoint unreachable: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token request failed: {} - {}", status, body);
            return Err(AuthError::Failed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Failed(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuthClient {
    fn authorization_url(&self, state: &str, force_consent: bool) -> String {
        let scopes = OAUTH_SCOPES.join(" ");
        let mut url = format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             include_granted_scopes=true&\
             state={}",
            self.config.auth_uri,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state),
        );
        if force_consent {
            url.push_str("&prompt=consent");
        }
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<StoredCredentials, AuthError> {
        let tokens = self
            .post_token(
                &self.config.token_uri,
                &CodeExchangeRequest {
                    code,
                    client_id: &self.config.client_id,
                    client_secret: &self.config.client_secret,
                    redirect_uri: &self.config.redirect_uri,
                    grant_type: "authorization_code",
                },
            )
            .await?;

        if tokens.refresh_token.is_none() {
            tracing::warn!("No refresh token received - consent will be needed once the token expires");
        }

        Ok(credentials::from_code_exchange(&self.config, tokens, Utc::now()))
    }

    async fn refresh(
        &self,
        credentials: &StoredCredentials,
    ) -> Result<StoredCredentials, AuthError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Required)?;

        let tokens = self
            .post_token(
                &credentials.token_uri,
                &RefreshRequest {
                    refresh_token,
                    client_id: &credentials.client_id,
                    client_secret: &credentials.client_secret,
                    grant_type: "refresh_token",
                },
            )
            .await?;

        tracing::info!("Refreshed access token");
        Ok(credentials::apply_refresh(
            credentials.clone(),
            tokens,
            Utc::now(),
        ))
    }
}
