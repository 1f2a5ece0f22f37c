//! Async resource service: one method per CRUD verb.
//!
//! Each call is build → transport → parse. Errors are surfaced unmodified;
//! there are no retries at this layer.

use tracing::{debug, warn};

use crate::client::UsersClient;
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{User, UserCreate, UserUpdate};

#[derive(Debug, Clone)]
pub struct UsersService<T> {
    client: UsersClient,
    transport: T,
}

impl UsersService<ReqwestTransport> {
    /// Service talking to `config.base_url` over reqwest.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(UsersClient::new(&config.base_url), transport))
    }
}

impl<T: Transport> UsersService<T> {
    pub fn new(client: UsersClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &UsersClient {
        &self.client
    }

    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let response = self.send(self.client.build_list_users()).await?;
        self.client
            .parse_list_users(response)
            .inspect_err(|e| warn!(error = %e, "list users failed"))
    }

    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        let response = self.send(self.client.build_get_user(id)?).await?;
        self.client
            .parse_get_user(response)
            .inspect_err(|e| warn!(user_id = %id, error = %e, "get user failed"))
    }

    pub async fn create(&self, input: &UserCreate) -> Result<User, ApiError> {
        let response = self.send(self.client.build_create_user(input)?).await?;
        self.client
            .parse_create_user(response)
            .inspect(|user| debug!(user_id = %user.id, "user created"))
            .inspect_err(|e| warn!(error = %e, "create user failed"))
    }

    pub async fn update(&self, id: &str, input: &UserUpdate) -> Result<User, ApiError> {
        let response = self.send(self.client.build_update_user(id, input)?).await?;
        self.client
            .parse_update_user(response)
            .inspect_err(|e| warn!(user_id = %id, error = %e, "update user failed"))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_user(id)?).await?;
        self.client
            .parse_delete_user(response)
            .inspect_err(|e| warn!(user_id = %id, error = %e, "delete user failed"))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self
            .transport
            .execute(request)
            .await
            .inspect_err(|e| warn!(error = %e, "transport failed"))?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}
