//! Outbound SMS notification
//!
//! `AfricasTalkingNotifier` talks to the Africa's Talking messaging API.
//! `LogNotifier` stands in when no credentials are configured.

use crate::runtime::{CollaboratorError, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const LIVE_URL: &str = "https://api.africastalking.com/version1/messaging";
const SANDBOX_URL: &str = "https://api.sandbox.africastalking.com/version1/messaging";

/// Recipient status codes meaning the message was accepted
const ACCEPTED_STATUS_CODES: [u16; 3] = [100, 101, 102];

/// Credentials and endpoint for the SMS gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsConfig {
    pub username: String,
    pub api_key: String,
    pub sender_id: Option<String>,
    pub url: String,
}

impl SmsConfig {
    /// The sandbox account gets the sandbox endpoint unless one is given
    pub fn new(username: String, api_key: String, sender_id: Option<String>, url: Option<String>) -> Self {
        let url = url.unwrap_or_else(|| {
            if username == "sandbox" {
                SANDBOX_URL.to_string()
            } else {
                LIVE_URL.to_string()
            }
        });
        Self {
            username,
            api_key,
            sender_id,
            url,
        }
    }
}

pub struct AfricasTalkingNotifier {
    client: Client,
    config: SmsConfig,
}

impl AfricasTalkingNotifier {
    pub fn new(config: SmsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for AfricasTalkingNotifier {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), CollaboratorError> {
        let mut form = vec![
            ("username", self.config.username.as_str()),
            ("to", phone),
            ("message", message),
        ];
        if let Some(sender_id) = &self.config.sender_id {
            form.push(("from", sender_id.as_str()));
        }

        let response = self
            .client
            .post(&self.config.url)
            .header("apiKey", &self.config.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Delivery(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    CollaboratorError::Delivery(format!("Connection failed: {e}"))
                } else {
                    CollaboratorError::Delivery(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Delivery(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(CollaboratorError::Delivery(format!("HTTP {status}: {body}")));
        }

        check_recipients(&body)?;
        tracing::info!(phone = %phone, "SMS sent");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(rename = "SMSMessageData")]
    data: SmsMessageData,
}

#[derive(Debug, Deserialize)]
struct SmsMessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    status_code: u16,
    #[serde(default)]
    status: String,
}

/// A 2xx reply can still reject the recipient
fn check_recipients(body: &str) -> Result<(), CollaboratorError> {
    let response: SendResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Delivery(format!("Failed to parse response: {e}")))?;

    match response.data.recipients.first() {
        Some(recipient) if ACCEPTED_STATUS_CODES.contains(&recipient.status_code) => Ok(()),
        Some(recipient) => Err(CollaboratorError::Delivery(format!(
            "Recipient rejected ({}): {}",
            recipient.status_code, recipient.status
        ))),
        None => Err(CollaboratorError::Delivery(format!(
            "No recipients accepted: {}",
            response.data.message
        ))),
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), CollaboratorError> {
        tracing::info!(phone = %phone, message = %message, "SMS (not sent, gateway not configured)");
        Ok(())
    }
}
