//! Runtime configuration.
//!
//! Every setting is a command-line flag with an environment fallback, so a
//! `.env` file (loaded by `dotenvy` before parsing) is enough to run locally.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use clap::Parser;

use crate::auth::types::OAuthConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "mailtask")]
#[command(about = "Sync recent Gmail messages and manage tasks derived from them")]
pub struct AppConfig {
    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Connect to PostgreSQL over TLS (webpki roots).
    #[arg(long, env = "DATABASE_TLS", default_value_t = false)]
    pub database_tls: bool,

    /// Maximum pooled database connections.
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pub database_pool_size: usize,

    /// Address the web server listens on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:7000")]
    pub bind_addr: SocketAddr,

    /// Google OAuth client id. Overrides the client-secrets file.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret. Overrides the client-secrets file.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub google_client_secret: Option<String>,

    /// Google client-secret JSON as downloaded from the cloud console.
    #[arg(long, env = "GOOGLE_CLIENT_SECRETS", default_value = "credentials.json")]
    pub google_client_secrets: PathBuf,

    /// Where Google sends the user back after consent.
    #[arg(
        long,
        env = "OAUTH_REDIRECT_URI",
        default_value = "http://localhost:7000/oauth2callback"
    )]
    pub oauth_redirect_uri: String,

    /// Key used to sign session cookies. Random per process when unset.
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in hours.
    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 24)]
    pub session_ttl_hours: i64,

    /// Number of recent messages pulled per sync.
    #[arg(long, env = "SYNC_PAGE_SIZE", default_value_t = 20)]
    pub sync_page_size: u32,

    /// Timeout applied to every outbound Google call.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// IANA time zone used to interpret task due dates on the calendar.
    #[arg(long, env = "CALENDAR_TIME_ZONE", default_value = "UTC")]
    pub calendar_time_zone: String,

    /// Key for the third-party email analysis service (not used yet).
    #[arg(long, env = "ANALYSIS_API_KEY", hide_env_values = true)]
    pub analysis_api_key: Option<String>,
}

impl AppConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn calendar_tz(&self) -> Result<Tz> {
        self.calendar_time_zone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("CALENDAR_TIME_ZONE: {}", e))
    }

    /// Session signing key, generating a throwaway one when none is configured.
    pub fn session_key(&self) -> String {
        match &self.session_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set, using a random key (sessions end on restart)"
                );
                format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_page_size == 0 || self.sync_page_size > 500 {
            bail!("SYNC_PAGE_SIZE must be between 1 and 500");
        }
        if self.session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive");
        }
        if self.http_timeout_secs == 0 {
            bail!("HTTP_TIMEOUT_SECS must be positive");
        }
        self.calendar_tz()?;
        Ok(())
    }

    /// Resolve OAuth client settings.
    ///
    /// `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` win when both are set;
    /// otherwise the client-secrets file must exist.
    pub async fn oauth_config(&self) -> Result<OAuthConfig> {
        if let (Some(client_id), Some(client_secret)) =
            (&self.google_client_id, &self.google_client_secret)
        {
            return Ok(OAuthConfig::google(
                client_id.clone(),
                client_secret.clone(),
                self.oauth_redirect_uri.clone(),
            ));
        }

        let secret = yup_oauth2::read_application_secret(&self.google_client_secrets)
            .await
            .with_context(|| {
                format!(
                    "GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set and {} is unreadable",
                    self.google_client_secrets.display()
                )
            })?;

        Ok(OAuthConfig {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            auth_uri: secret.auth_uri,
            token_uri: secret.token_uri,
            redirect_uri: self.oauth_redirect_uri.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["mailtask", "--database-url", "postgres://localhost/mailtask"];
        argv.extend_from_slice(args);
        AppConfig::try_parse_from(argv).expect("should parse")
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        assert_eq!(config.sync_page_size, 20);
        assert_eq!(config.bind_addr.port(), 7000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_time_zone_rejected() {
        let config = parse(&["--calendar-time-zone", "Mars/Olympus"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = parse(&["--sync-page-size", "0"]);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_env_client_credentials_skip_secrets_file() {
        let config = parse(&[
            "--google-client-id",
            "id",
            "--google-client-secret",
            "secret",
            "--google-client-secrets",
            "/nonexistent/credentials.json",
        ]);
        let oauth = config.oauth_config().await.expect("should resolve");
        assert_eq!(oauth.client_id, "id");
        assert_eq!(oauth.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[tokio::test]
    async fn test_missing_secrets_file_is_an_error() {
        let config = parse(&["--google-client-secrets", "/nonexistent/credentials.json"]);
        assert!(config.oauth_config().await.is_err());
    }
}
