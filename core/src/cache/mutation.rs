//! Tracked write operations that invalidate queries on success.
//!
//! Ordering on success: declared prefixes are invalidated, then the success
//! state is published, then the caller's follow-up runs. All three happen
//! before `mutate` returns, without yielding in between.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::query::QueryClient;
use super::state::{MutationState, MutationStatus};
use crate::error::ApiError;

type MutateFn<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;

pub struct Mutation<I, O> {
    client: QueryClient,
    mutate_fn: MutateFn<I, O>,
    invalidates: Vec<QueryKey>,
    state: watch::Sender<MutationState<O>>,
    /// Number of the latest `mutate` call; only it may publish state.
    latest: AtomicU64,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    pub fn new<F, Fut>(client: &QueryClient, mutate_fn: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
    {
        let (state, _) = watch::channel(MutationState::idle());
        Self {
            client: client.clone(),
            mutate_fn: Arc::new(move |input| mutate_fn(input).boxed()),
            invalidates: Vec::new(),
            state,
            latest: AtomicU64::new(0),
        }
    }

    /// Invalidate every query under `prefix` after each successful call.
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    pub fn state(&self) -> MutationState<O> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState<O>> {
        self.state.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }

    pub async fn mutate(&self, input: I) -> Result<Arc<O>, ApiError> {
        self.mutate_with(input, |_| ()).await
    }

    /// Run the mutation; `on_success` sees the cache already invalidated.
    /// No retry on failure, and a failure invalidates nothing.
    ///
    /// Dropping the returned future before it completes (a timeout, a lost
    /// `select!` branch) puts the state back to `Idle`, unless a newer call
    /// has started since.
    pub async fn mutate_with<S>(&self, input: I, on_success: S) -> Result<Arc<O>, ApiError>
    where
        S: FnOnce(&O),
    {
        let call = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(MutationState {
            status: MutationStatus::Pending,
            data: None,
            error: None,
        });
        let mut guard = Unfinished {
            state: &self.state,
            latest: &self.latest,
            call,
            armed: true,
        };

        let result = (self.mutate_fn)(input).await;
        guard.armed = false;

        match result {
            Ok(output) => {
                let output = Arc::new(output);
                for prefix in &self.invalidates {
                    self.client.invalidate(prefix);
                }
                self.publish(
                    call,
                    MutationState {
                        status: MutationStatus::Success,
                        data: Some(Arc::clone(&output)),
                        error: None,
                    },
                );
                debug!(call, "mutation succeeded");
                on_success(&output);
                Ok(output)
            }
            Err(err) => {
                warn!(call, error = %err, "mutation failed");
                self.publish(
                    call,
                    MutationState {
                        status: MutationStatus::Error,
                        data: None,
                        error: Some(err.clone()),
                    },
                );
                Err(err)
            }
        }
    }

    /// Back to `Idle`, forgetting the last result.
    pub fn reset(&self) {
        self.state.send_replace(MutationState::idle());
    }

    fn publish(&self, call: u64, state: MutationState<O>) {
        publish_if_latest(&self.state, &self.latest, call, state);
    }
}

fn publish_if_latest<O>(
    state: &watch::Sender<MutationState<O>>,
    latest: &AtomicU64,
    call: u64,
    next: MutationState<O>,
) {
    if latest.load(Ordering::SeqCst) == call {
        state.send_replace(next);
    }
}

/// Armed while a call's future is awaited; dropping it armed means the call
/// was cancelled.
struct Unfinished<'a, O> {
    state: &'a watch::Sender<MutationState<O>>,
    latest: &'a AtomicU64,
    call: u64,
    armed: bool,
}

impl<O> Drop for Unfinished<'_, O> {
    fn drop(&mut self) {
        if self.armed {
            debug!(call = self.call, "mutation cancelled");
            publish_if_latest(self.state, self.latest, self.call, MutationState::idle());
        }
    }
}

impl<I, O: fmt::Debug> fmt::Debug for Mutation<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("invalidates", &self.invalidates)
            .field("state", &*self.state.borrow())
            .finish()
    }
}
