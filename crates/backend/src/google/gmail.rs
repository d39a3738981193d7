//! Gmail API adapter for [`Mailbox`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::api::Message;
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::UpstreamError;

use super::{
    classify_failure, status_from_error_body, with_timeout, Mailbox, MessageDetail, MessageHeader,
};

const SERVICE: &str = "gmail";

/// Metadata is enough for subject, sender and snippet.
const MESSAGE_FORMAT: &str = "metadata";

pub struct GmailClient {
    connector: HttpsConnector<HttpConnector>,
    timeout: Duration,
}

impl GmailClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self { connector, timeout })
    }

    fn hub(&self, access_token: &str) -> Gmail<HttpsConnector<HttpConnector>> {
        let client = Client::builder(TokioExecutor::new()).build(self.connector.clone());
        Gmail::new(client, access_token.to_string())
    }

    fn parse_message(requested_id: &str, message: Message) -> MessageDetail {
        let headers = message
            .payload
            .and_then(|payload| payload.headers)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|header| match (header.name, header.value) {
                (Some(name), value) => Some(MessageHeader::new(name, value.unwrap_or_default())),
                _ => None,
            })
            .collect();

        MessageDetail {
            id: message.id.unwrap_or_else(|| requested_id.to_string()),
            snippet: message.snippet.unwrap_or_default(),
            headers,
        }
    }
}

fn gmail_error(err: google_gmail1::Error) -> UpstreamError {
    let status = match &err {
        google_gmail1::Error::BadRequest(body) => status_from_error_body(body),
        google_gmail1::Error::Failure(response) => Some(u64::from(response.status().as_u16())),
        _ => None,
    };
    classify_failure(SERVICE, status, err)
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_recent_ids(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<String>, UpstreamError> {
        let hub = self.hub(access_token);
        let call = async {
            let (_, list_response) = hub
                .users()
                .messages_list("me")
                .max_results(max_results)
                .doit()
                .await
                .map_err(gmail_error)?;
            Ok::<_, UpstreamError>(list_response)
        };
        let list_response = with_timeout(SERVICE, self.timeout, call).await?;

        let ids: Vec<String> = list_response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| msg.id)
            .collect();

        tracing::debug!("Gmail listed {} messages", ids.len());
        Ok(ids)
    }

    async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<MessageDetail, UpstreamError> {
        let hub = self.hub(access_token);
        let call = async {
            let (_, message) = hub
                .users()
                .messages_get("me", message_id)
                .format(MESSAGE_FORMAT)
                .doit()
                .await
                .map_err(gmail_error)?;
            Ok::<_, UpstreamError>(message)
        };
        let message = with_timeout(SERVICE, self.timeout, call).await?;

        Ok(Self::parse_message(message_id, message))
    }
}
