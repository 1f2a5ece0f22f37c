use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Span};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /users/` body. Both fields are required, but they deserialize as
/// optional so that every missing one is reported, not just the first.
/// `null` counts as missing.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserCreate {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserCreate {
    /// The `(name, email)` pair, or a 422 naming each missing field.
    pub fn validate(self) -> Result<(String, String), AppError> {
        match (self.name, self.email) {
            (Some(name), Some(email)) => Ok((name, email)),
            (name, email) => {
                let missing = [("name", name.is_none()), ("email", email.is_none())];
                Err(AppError::Validation(
                    missing
                        .iter()
                        .filter(|(_, absent)| *absent)
                        .map(|(field, _)| FieldError::body(field, "Field required", "missing"))
                        .collect(),
                ))
            }
        }
    }
}

/// `PATCH /users/{id}` body; absent and `null` fields are left unchanged.
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One entry of a 422 response: `{"loc": [...], "msg": "...", "type": "..."}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn body(field: &str, msg: &str, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Handler failures, rendered as `{"detail": ...}` bodies.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Conflict(String),
    Validation(Vec<FieldError>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Conflict(detail) => {
                (StatusCode::CONFLICT, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": errors })),
            )
                .into_response(),
        }
    }
}

/// Users in insertion order, so listing is stable.
pub type Db = Arc<RwLock<Vec<User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_span)
                .on_response(log_response),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn make_span(request: &Request<Body>) -> Span {
    info_span!("http-request", method = %request.method(), path = %request.uri().path())
}

fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    info!(status = response.status().as_u16(), ?latency, "request handled");
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    Json(db.read().await.clone())
}

async fn create_user(
    State(db): State<Db>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(input) = payload.map_err(rejected)?;
    let (name, email) = input.validate()?;
    let mut users = db.write().await;
    if users.iter().any(|u| u.email == email) {
        return Err(AppError::Conflict(format!(
            "User with email {email} already exists"
        )));
    }
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        created_at: Utc::now(),
    };
    users.push(user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<User>, AppError> {
    let users = db.read().await;
    users
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(input) = payload.map_err(rejected)?;
    let mut users = db.write().await;
    if !users.iter().any(|u| u.id == id) {
        return Err(not_found(&id));
    }
    if let Some(email) = &input.email {
        if users.iter().any(|u| &u.email == email && u.id != id) {
            return Err(AppError::Conflict(format!(
                "User with email {email} already exists"
            )));
        }
    }
    let user = users
        .iter_mut()
        .find(|u| u.id == id)
        .ok_or_else(|| not_found(&id))?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    let mut users = db.write().await;
    let index = users
        .iter()
        .position(|u| u.id == id)
        .ok_or_else(|| not_found(&id))?;
    users.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("User {id} not found"))
}

/// Undecodable bodies become a 422 on `["body"]`, like field errors.
fn rejected(rejection: JsonRejection) -> AppError {
    let kind = match &rejection {
        JsonRejection::JsonDataError(_) => "type_error",
        _ => "json_invalid",
    };
    AppError::Validation(vec![FieldError {
        loc: vec!["body".to_string()],
        msg: rejection.body_text(),
        kind: kind.to_string(),
    }])
}
