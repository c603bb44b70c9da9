//! `sendEmail` and `sendBulkEmail`: validate, build messages, hand them to the mail sender.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::mail::{Attachment, EmailError, EmailMessage};

use super::{parse_body, require_post, respond, AppState};

/// `to` may be one address or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Addresses {
    One(String),
    Many(Vec<String>),
}

impl Addresses {
    fn to_vec(&self) -> Vec<String> {
        let all = match self {
            Addresses::One(s) => vec![s.clone()],
            Addresses::Many(v) => v.clone(),
        };
        all.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct AttachmentPayload {
    content: Option<String>,
    filename: Option<String>,
    #[serde(rename = "type")]
    mime_type: Option<String>,
}

impl AttachmentPayload {
    /// Only attachments with both content and a filename are sent.
    fn to_attachment(&self) -> Option<Attachment> {
        let content = self.content.as_deref().filter(|s| !s.is_empty())?;
        let filename = self.filename.as_deref().filter(|s| !s.is_empty())?;
        Some(Attachment::new(content, filename, self.mime_type.clone().filter(|t| !t.is_empty())))
    }
}

#[derive(Debug, Default, Deserialize)]
struct SendEmailPayload {
    to: Option<Addresses>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    attachment: Option<AttachmentPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct RecipientPayload {
    to: Option<Addresses>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BulkEmailPayload {
    recipients: Option<Vec<RecipientPayload>>,
    attachment: Option<AttachmentPayload>,
}

fn non_empty(v: &Option<String>) -> Option<&str> { v.as_deref().filter(|s| !s.trim().is_empty()) }

/// Build one message; `None` when to/subject/text are missing. HTML falls back to the text body.
fn build_message(
    from: &str,
    to: &Option<Addresses>,
    subject: &Option<String>,
    text: &Option<String>,
    html: &Option<String>,
    attachment: Option<Attachment>,
) -> Option<EmailMessage> {
    let to = to.as_ref().map(|a| a.to_vec()).filter(|v| !v.is_empty())?;
    let subject = non_empty(subject)?;
    let text = non_empty(text)?;
    let html = non_empty(html).unwrap_or(text);
    Some(EmailMessage {
        to,
        from: from.to_string(),
        subject: subject.to_string(),
        text: text.to_string(),
        html: html.to_string(),
        attachments: attachment.into_iter().collect(),
    })
}

pub async fn send_email(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    respond(send_email_inner(&state, &method, &body).await)
}

async fn send_email_inner(state: &AppState, method: &Method, body: &Bytes) -> AppResult<Value> {
    require_post(method)?;
    let p: SendEmailPayload = parse_body(body);
    let attachment = p.attachment.as_ref().and_then(|a| a.to_attachment());
    let Some(msg) = build_message(&state.mail_from, &p.to, &p.subject, &p.text, &p.html, attachment) else {
        return Err(AppError::user("missing_fields", "Missing required fields: to, subject, text"));
    };

    match state.mailer.send(std::slice::from_ref(&msg)).await {
        Ok(()) => {
            info!(target: "functions", to = ?msg.to, "sendEmail ok");
            Ok(json!({
                "success": true,
                "message": "Email sent successfully",
                "to": p.to,
                "subject": msg.subject,
            }))
        }
        Err(EmailError::Api { status, body }) => {
            error!(target: "functions", status, "sendEmail upstream error");
            Err(AppError::upstream("upstream_error", "Failed to send email", status, Some(body)))
        }
        Err(e) => {
            error!(target: "functions", error = %e, "sendEmail failed");
            Err(AppError::internal("internal_error", "Internal server error").with_details(Value::String(e.to_string())))
        }
    }
}

pub async fn send_bulk_email(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    respond(send_bulk_email_inner(&state, &method, &body).await)
}

async fn send_bulk_email_inner(state: &AppState, method: &Method, body: &Bytes) -> AppResult<Value> {
    require_post(method)?;
    let p: BulkEmailPayload = parse_body(body);
    let recipients = match p.recipients {
        Some(r) if !r.is_empty() => r,
        _ => return Err(AppError::user("invalid_recipients", "Missing or invalid recipients array")),
    };
    let attachment = p.attachment.as_ref().and_then(|a| a.to_attachment());

    let mut messages = Vec::with_capacity(recipients.len());
    for (i, r) in recipients.iter().enumerate() {
        match build_message(&state.mail_from, &r.to, &r.subject, &r.text, &r.html, attachment.clone()) {
            Some(m) => messages.push(m),
            None => {
                let msg = format!("Recipient {} is missing required fields: to, subject, text", i);
                return Err(AppError::user("invalid_recipient".to_string(), msg));
            }
        }
    }

    match state.mailer.send(&messages).await {
        Ok(()) => {
            info!(target: "functions", count = messages.len(), "sendBulkEmail ok");
            Ok(json!({
                "success": true,
                "message": format!("Successfully sent {} emails", messages.len()),
                "count": messages.len(),
            }))
        }
        Err(e) => {
            error!(target: "functions", error = %e, "sendBulkEmail failed");
            Err(AppError::internal("bulk_send_failed", "Failed to send bulk emails").with_details(Value::String(e.to_string())))
        }
    }
}
