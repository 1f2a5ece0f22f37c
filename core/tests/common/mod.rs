//! Shared fixtures: a live mock server and a request-counting transport.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use users_core::{
    ApiError, ClientConfig, HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport,
    UsersClient, UsersService,
};

/// Bind the mock server to a random port on the current runtime and return
/// its base URL.
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

/// Real HTTP transport that counts what goes over the wire.
pub struct Counting {
    inner: ReqwestTransport,
    gets: AtomicUsize,
    total: AtomicUsize,
}

impl Counting {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Counting {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if request.method == HttpMethod::Get {
            self.gets.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.execute(request).await
    }
}

pub fn counting_service(base_url: &str) -> (UsersService<Arc<Counting>>, Arc<Counting>) {
    let config = ClientConfig::new(base_url);
    let transport = Arc::new(Counting {
        inner: ReqwestTransport::new(&config).unwrap(),
        gets: AtomicUsize::new(0),
        total: AtomicUsize::new(0),
    });
    let service = UsersService::new(UsersClient::new(base_url), Arc::clone(&transport));
    (service, transport)
}
