//! Client-side data-access layer for the users API.
//!
//! # Overview
//! Three layers, leaves first:
//! - `UsersClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern), and a
//!   `Transport` performs the round-trip in between.
//! - `UsersService` is the async CRUD surface: build → transport → parse.
//! - `QueryClient` / `Mutation` cache reads under structural keys, dedupe
//!   in-flight fetches and invalidate by key prefix after writes;
//!   `UsersQueries` binds the service to them.
//!
//! # Design
//! - `UsersClient` is stateless; it holds only `base_url`.
//! - The cache is an explicitly owned value, cloned into every consumer;
//!   there is no global instance.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod service;
pub mod transport;
pub mod types;

pub use cache::{
    KeySegment, Mutation, MutationState, MutationStatus, QueryClient, QueryHandle, QueryKey,
    QueryOptions, QueryState, QueryStatus,
};
pub use client::UsersClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FieldError};
pub use hooks::{user_key, users_key, UsersQueries};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use service::UsersService;
pub use transport::{ReqwestTransport, Transport};
pub use types::{User, UserCreate, UserUpdate};
