//! Unified application error model and mapping helpers.
//! `AppError` is what the HTTP functions return; it renders as the
//! `{success: false, error, details}` envelope. `GateError` covers the
//! navigation gate's internal failures, which never leave the gate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::identity::{ProfileError, ProviderFailure};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    MethodNotAllowed { code: String, message: String },
    NotFound { code: String, message: String },
    Upstream { code: String, message: String, status: u16, #[serde(default)] details: Option<Value> },
    Internal { code: String, message: String, #[serde(default)] details: Option<Value> },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::MethodNotAllowed { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::MethodNotAllowed { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            AppError::Upstream { details, .. } | AppError::Internal { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn method_not_allowed() -> Self {
        AppError::MethodNotAllowed { code: "method_not_allowed".into(), message: "Method not allowed. Use POST.".into() }
    }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn upstream<S: Into<String>>(code: S, msg: S, status: u16, details: Option<Value>) -> Self {
        AppError::Upstream { code: code.into(), message: msg.into(), status, details }
    }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self {
        AppError::Internal { code: code.into(), message: msg.into(), details: None }
    }

    /// Attach a `details` payload; only upstream and internal errors carry one.
    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            AppError::Upstream { details, .. } | AppError::Internal { details, .. } => *details = Some(value),
            _ => {}
        }
        self
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::MethodNotAllowed { .. } => 405,
            AppError::NotFound { .. } => 404,
            // Upstream statuses outside the error range would read as success
            AppError::Upstream { status, .. } if (400..=599).contains(status) => *status,
            AppError::Upstream { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// JSON body in the functions' response envelope.
    pub fn envelope(&self) -> Value {
        let mut body = json!({ "success": false, "error": self.message() });
        if let Some(d) = self.details() {
            body["details"] = d.clone();
        }
        body
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal("internal_error", "Internal server error").with_details(Value::String(err.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope())).into_response()
    }
}

/// Failures inside the navigation gate. These are converted into redirect
/// or allow decisions and never reach the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("identity unavailable: {0}")]
    IdentityUnavailable(#[from] ProviderFailure),
    #[error("profile lookup failed: {0}")]
    ProfileLookupFailed(#[from] ProfileError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
