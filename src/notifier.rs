use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

pub const SUBJECT_REVIEWER_ASSIGNED: &str = "Reviewer Assigned";
pub const SUBJECT_FEEDBACK_SUBMITTED: &str = "Feedback Submitted";
pub const SUBJECT_FEEDBACK_UPDATED: &str = "Feedback Updated";

static ADDRESS_PATTERN: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Email {
    pub fn check_recipient(&self) -> Result<(), NotificationError> {
        let pattern = ADDRESS_PATTERN.get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("address pattern is valid")
        });
        if !pattern.is_match(&self.to) {
            return Err(NotificationError::InvalidAddress(self.to.clone()));
        }
        Ok(())
    }
}

/// Anything that goes wrong between a committed mutation and a delivered
/// email. Reported, never returned to the caller of the review operation.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("recipient lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("no recipient found for {0}")]
    MissingRecipient(String),

    #[error("invalid recipient address {0:?}")]
    InvalidAddress(String),

    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail service rejected the message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), NotificationError>;
}

/// Escapes course and file names before they are placed into an HTML body.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Sends mail through an HTTP mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    sender: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        sender: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint, api_key, sender })
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.endpoint).json(&MailRequest {
            from: &self.sender,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Used when no mail API is configured (local development).
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> Result<(), NotificationError> {
        tracing::info!(to = %email.to, subject = %email.subject, "mail not configured, logging message instead");
        Ok(())
    }
}
