//! Domain DTOs for the users API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently,
//! so the integration tests catch any schema drift between the two crates.
//! Every field of `User` is required: a server response that omits one is a
//! decode failure, never a partially-populated value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single user returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Server-assigned, immutable once created.
    pub id: String,
    pub name: String,
    pub email: String,
    /// Server-assigned creation time, ISO-8601 on the wire.
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a new user.
///
/// Both fields are required. Rejecting blank values is the caller's job;
/// see [`UserCreate::is_blank`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
}

impl UserCreate {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Copy with surrounding whitespace removed from both fields.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }

    /// True when either field is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() || self.email.trim().is_empty()
    }
}

/// Request payload for updating an existing user. Only the fields present in
/// the JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// An update with no fields set leaves the user untouched.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}
