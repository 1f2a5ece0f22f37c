//! Stateless HTTP request builder and response parser for the users API.
//!
//! # Design
//! `UsersClient` holds only a `base_url` and carries no mutable state between
//! calls. Each CRUD operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The round-trip in between belongs to a `Transport`, keeping this half
//! deterministic and free of I/O.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, FieldError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{User, UserCreate, UserUpdate};

const USERS_PATH: &str = "/users/";

/// Synchronous, stateless client for the users API.
#[derive(Debug, Clone)]
pub struct UsersClient {
    base_url: String,
}

impl UsersClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_users(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.collection_url(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_get_user(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            path: self.member_url(id)?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_create_user(&self, input: &UserCreate) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.collection_url(),
            headers: json_headers(),
            body: Some(encode(input)?),
        })
    }

    pub fn build_update_user(&self, id: &str, input: &UserUpdate) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Patch,
            path: self.member_url(id)?,
            headers: json_headers(),
            body: Some(encode(input)?),
        })
    }

    pub fn build_delete_user(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            path: self.member_url(id)?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        check_status(&response, &[200])?;
        decode(&response.body)
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, &[200])?;
        decode(&response.body)
    }

    pub fn parse_create_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, &[201, 200])?;
        decode(&response.body)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, &[200])?;
        decode(&response.body)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, &[204, 200])?;
        Ok(())
    }

    fn collection_url(&self) -> String {
        format!("{}{USERS_PATH}", self.base_url)
    }

    /// `{base}/users/{id}` with `id` percent-encoded as one path segment, so
    /// `/`, `?` and `#` inside an id can never reach another route.
    fn member_url(&self, id: &str) -> Result<String, ApiError> {
        if !is_valid_id(id) {
            return Err(ApiError::InvalidId);
        }
        let mut url = Url::parse(&self.collection_url())
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(id);
        Ok(url.into())
    }
}

/// Whether `id` can address a single user.
///
/// Blank ids are "not known yet". `.` and `..` are rejected too: URL
/// parsing resolves them as dot segments even when percent-encoded.
pub fn is_valid_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && id != "." && id != ".."
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn encode<T: serde::Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Error body shape: `{"detail": "message"}` or `{"detail": [FieldError, ..]}`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Fields(Vec<FieldError>),
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: &[u16]) -> Result<(), ApiError> {
    if expected.contains(&response.status) {
        return Ok(());
    }

    let detail = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .map(|b| b.detail);
    let message = match &detail {
        Some(Detail::Message(msg)) => Some(msg.clone()),
        _ if response.body.trim().is_empty() => None,
        _ => Some(response.body.clone()),
    };

    Err(match (response.status, detail) {
        (404, _) => ApiError::NotFound { message },
        (409, _) => ApiError::Conflict { message },
        (status @ 400..=499, Some(Detail::Fields(errors))) => {
            ApiError::Validation { status, errors }
        }
        (status, _) => ApiError::HttpStatus { status, message },
    })
}
