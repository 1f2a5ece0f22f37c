//! Users queries and mutations bound to a shared [`QueryClient`].
//!
//! Every read goes through the cache under `["users"]` or `["users", id]`,
//! and every write invalidates the whole `["users"]` family on success, so
//! consumers never call [`UsersService`] directly.

use std::sync::Arc;

use crate::cache::{Mutation, QueryClient, QueryHandle, QueryKey, QueryOptions};
use crate::client::is_valid_id;
use crate::service::UsersService;
use crate::transport::Transport;
use crate::types::{User, UserCreate, UserUpdate};

pub const USERS_KEY: &str = "users";

/// Key of the user list, and the invalidation prefix for every users query.
pub fn users_key() -> QueryKey {
    QueryKey::new([USERS_KEY])
}

pub fn user_key(id: &str) -> QueryKey {
    users_key().with(id)
}

pub struct UsersQueries<T> {
    service: Arc<UsersService<T>>,
    client: QueryClient,
}

impl<T> Clone for UsersQueries<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            client: self.client.clone(),
        }
    }
}

impl<T: Transport + 'static> UsersQueries<T> {
    pub fn new(service: UsersService<T>, client: QueryClient) -> Self {
        Self {
            service: Arc::new(service),
            client,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// All users.
    pub fn users(&self) -> QueryHandle<Vec<User>> {
        let service = Arc::clone(&self.service);
        self.client.query(users_key(), move || {
            let service = Arc::clone(&service);
            async move { service.list().await }
        })
    }

    /// One user. Stays idle while `id` is not a usable id (see
    /// [`is_valid_id`]), so it never settles into `InvalidId`.
    pub fn user(&self, id: &str) -> QueryHandle<User> {
        let service = Arc::clone(&self.service);
        let owned = id.to_string();
        self.client.query_with(
            user_key(id),
            QueryOptions::enabled(is_valid_id(id)),
            move || {
                let service = Arc::clone(&service);
                let id = owned.clone();
                async move { service.get(&id).await }
            },
        )
    }

    pub fn create_user(&self) -> Mutation<UserCreate, User> {
        let service = Arc::clone(&self.service);
        Mutation::new(&self.client, move |input: UserCreate| {
            let service = Arc::clone(&service);
            async move { service.create(&input).await }
        })
        .invalidates(users_key())
    }

    /// Input is `(id, changes)`.
    pub fn update_user(&self) -> Mutation<(String, UserUpdate), User> {
        let service = Arc::clone(&self.service);
        Mutation::new(&self.client, move |(id, changes): (String, UserUpdate)| {
            let service = Arc::clone(&service);
            async move { service.update(&id, &changes).await }
        })
        .invalidates(users_key())
    }

    /// Input is the id to delete.
    pub fn delete_user(&self) -> Mutation<String, ()> {
        let service = Arc::clone(&self.service);
        Mutation::new(&self.client, move |id: String| {
            let service = Arc::clone(&service);
            async move { service.delete(&id).await }
        })
        .invalidates(users_key())
    }
}
