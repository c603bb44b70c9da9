//! Outbound email: message model, the `EmailSender` seam, and the SendGrid v3 client.

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base64-encoded file content.
    pub content: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub disposition: String,
}

impl Attachment {
    pub fn new<S: Into<String>>(content: S, filename: S, mime_type: Option<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_ATTACHMENT_TYPE.to_string()),
            disposition: "attachment".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    /// SendGrid v3 `mail/send` request body.
    pub fn to_sendgrid_json(&self) -> Value {
        let to: Vec<Value> = self.to.iter().map(|e| json!({ "email": e })).collect();
        let mut body = json!({
            "personalizations": [{ "to": to, "subject": self.subject }],
            "from": { "email": self.from },
            "subject": self.subject,
            "content": [
                { "type": "text/plain", "value": self.text },
                { "type": "text/html", "value": self.html },
            ],
        });
        if !self.attachments.is_empty() {
            body["attachments"] = json!(self.attachments);
        }
        body
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmailError {
    /// The mail API answered with an error status; `body` is its response payload.
    #[error("mail API returned HTTP {status}")]
    Api { status: u16, body: Value },
    #[error("mail transport error: {0}")]
    Transport(String),
    #[error("mail sender is not configured (SENDGRID_API_KEY unset)")]
    NotConfigured,
}

pub trait EmailSender: Send + Sync {
    /// Deliver every message; stops at the first failure.
    fn send<'a>(&'a self, messages: &'a [EmailMessage]) -> BoxFuture<'a, Result<(), EmailError>>;
}

pub struct SendGridClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl SendGridClient {
    pub fn new<S: Into<String>>(api_base: S, api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), api_base: api_base.into(), api_key }
    }

    pub fn is_configured(&self) -> bool { self.api_key.is_some() }

    async fn send_one(&self, key: &str, msg: &EmailMessage) -> Result<(), EmailError> {
        let url = format!("{}/v3/mail/send", self.api_base.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(&msg.to_sendgrid_json())
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            debug!(target: "mail", to = ?msg.to, status = status.as_u16(), "mail.sent");
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        error!(target: "mail", to = ?msg.to, status = status.as_u16(), "mail.rejected");
        Err(EmailError::Api { status: status.as_u16(), body })
    }
}

impl EmailSender for SendGridClient {
    fn send<'a>(&'a self, messages: &'a [EmailMessage]) -> BoxFuture<'a, Result<(), EmailError>> {
        async move {
            let Some(key) = self.api_key.as_deref() else { return Err(EmailError::NotConfigured); };
            for msg in messages {
                self.send_one(key, msg).await?;
            }
            Ok(())
        }
        .boxed()
    }
}
