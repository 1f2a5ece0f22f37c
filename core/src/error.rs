//! Error types for the users API client.
//!
//! # Design
//! `NotFound`, `Conflict` and `Validation` are specialisations of a non-2xx
//! response and report their status through [`ApiError::status`]; callers
//! frequently distinguish "the user does not exist" from "the server returned
//! an unexpected status." Every payload is owned text so the error is `Clone`
//! and can be stored in cached query and mutation state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the service, the transport and the parse methods.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, I/O).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server returned 404: the requested user does not exist.
    #[error("{}", .message.as_deref().unwrap_or("resource not found"))]
    NotFound { message: Option<String> },

    /// The server returned 409, e.g. an email already in use.
    #[error("{}", .message.as_deref().unwrap_or("resource already exists"))]
    Conflict { message: Option<String> },

    /// A 4xx response carrying structured per-field errors.
    #[error("validation failed (HTTP {status}): {}", summarize(.errors))]
    Validation { status: u16, errors: Vec<FieldError> },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("unexpected status"))]
    HttpStatus { status: u16, message: Option<String> },

    /// A success response body did not match the expected schema.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A single-resource operation was called with a blank id, or `.`/`..`.
    #[error("user id must not be blank or a dot segment")]
    InvalidId,

    /// The configured base URL cannot be extended with a path segment.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// HTTP status for every variant that originates from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Conflict { .. } => Some(409),
            ApiError::Validation { status, .. } | ApiError::HttpStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// One entry of a structured validation payload.
///
/// `loc` is the path to the offending value, e.g. `["body", "email"]`; its
/// segments may be strings or list indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl FieldError {
    /// Last path segment, which names the field for body validation errors.
    pub fn field(&self) -> Option<String> {
        self.loc.last().map(|seg| match seg {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

fn summarize(errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.field() {
            Some(field) => format!("{field}: {}", e.msg),
            None => e.msg.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
