//! Google Calendar adapter for [`CalendarApi`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_calendar3::api::{Event, EventDateTime};
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::UpstreamError;

use super::{classify_failure, status_from_error_body, with_timeout, CalendarApi, CalendarEvent};

const SERVICE: &str = "calendar";

pub struct CalendarClient {
    connector: HttpsConnector<HttpConnector>,
    timeout: Duration,
}

impl CalendarClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self { connector, timeout })
    }

    fn hub(&self, access_token: &str) -> CalendarHub<HttpsConnector<HttpConnector>> {
        let client = Client::builder(TokioExecutor::new()).build(self.connector.clone());
        CalendarHub::new(client, access_token.to_string())
    }
}

fn to_google_event(event: &CalendarEvent) -> Event {
    Event {
        summary: Some(event.summary.clone()),
        description: event.description.clone().filter(|d| !d.is_empty()),
        start: Some(EventDateTime {
            date_time: Some(event.start),
            time_zone: Some(event.time_zone.clone()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(event.end),
            time_zone: Some(event.time_zone.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn calendar_error(err: google_calendar3::Error) -> UpstreamError {
    let status = match &err {
        google_calendar3::Error::BadRequest(body) => status_from_error_body(body),
        google_calendar3::Error::Failure(response) => Some(u64::from(response.status().as_u16())),
        _ => None,
    };
    classify_failure(SERVICE, status, err)
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Option<String>, UpstreamError> {
        let hub = self.hub(access_token);
        let call = async {
            let (_, created) = hub
                .events()
                .insert(to_google_event(event), calendar_id)
                .doit()
                .await
                .map_err(calendar_error)?;
            Ok::<_, UpstreamError>(created)
        };
        let created = with_timeout(SERVICE, self.timeout, call).await?;

        tracing::info!(
            "Created calendar event {:?} for '{}'",
            created.id,
            event.summary
        );
        Ok(created.id)
    }
}
