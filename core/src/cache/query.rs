//! Keyed query cache with in-flight deduplication and prefix invalidation.
//!
//! # Design
//! Each key owns one `Entry` whose state is published through a
//! `tokio::sync::watch` channel; subscribers are the channel's receivers, so
//! "has observers" is simply `receiver_count() > 0`. Fetches run as spawned
//! tasks owned by the entry. Every fetch start bumps a per-entry sequence
//! number and a completion is applied only if it still carries the latest
//! one, so an overlapping older fetch can never overwrite newer data.
//!
//! Locks are `parking_lot` mutexes and are never held across an `.await`.
//! Lock order is map → entry in-flight slot; entries never touch the map.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::key::QueryKey;
use super::state::{QueryState, QueryStatus};
use crate::error::ApiError;

type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// When false the producer is never run; the entry stays `Pending`.
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl QueryOptions {
    pub fn enabled(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// Type-erased view of an entry, as stored in the map.
trait Slot: Send + Sync {
    fn observers(&self) -> usize;
    /// Mark stale and refetch.
    fn invalidate(self: Arc<Self>);
    /// Cancel any in-flight fetch before the entry is dropped from the map.
    fn discard(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

#[derive(Default)]
struct Inflight {
    seq: u64,
    task: Option<JoinHandle<()>>,
}

struct Entry<T> {
    key: QueryKey,
    state: watch::Sender<QueryState<T>>,
    fetcher: Mutex<Option<QueryFn<T>>>,
    inflight: Mutex<Inflight>,
}

impl<T: Send + Sync + 'static> Entry<T> {
    fn new(key: QueryKey) -> Self {
        let (state, _) = watch::channel(QueryState::pending());
        Self {
            key,
            state,
            fetcher: Mutex::new(None),
            inflight: Mutex::new(Inflight::default()),
        }
    }

    /// Start a fetch. Without `force`, joins the one already in flight.
    fn fetch(self: &Arc<Self>, force: bool) {
        let Some(fetcher) = self.fetcher.lock().clone() else {
            trace!(key = %self.key, "no enabled producer, skipping fetch");
            return;
        };

        let mut inflight = self.inflight.lock();
        if let Some(task) = inflight.task.take() {
            if !force && !task.is_finished() {
                inflight.task = Some(task);
                trace!(key = %self.key, "joining in-flight fetch");
                return;
            }
            task.abort();
        }
        inflight.seq += 1;
        let seq = inflight.seq;

        self.state.send_modify(|s| {
            s.is_fetching = true;
            if s.status == QueryStatus::Error {
                s.status = QueryStatus::Pending;
            }
        });
        debug!(key = %self.key, seq, "fetch started");

        let entry = Arc::clone(self);
        let fut = fetcher();
        inflight.task = Some(tokio::spawn(async move {
            let result = fut.await;
            entry.complete(seq, result);
        }));
    }

    fn complete(&self, seq: u64, result: Result<T, ApiError>) {
        let mut inflight = self.inflight.lock();
        if inflight.seq != seq {
            trace!(key = %self.key, seq, latest = inflight.seq, "discarding superseded result");
            return;
        }
        inflight.task = None;

        match result {
            Ok(data) => {
                debug!(key = %self.key, seq, "fetch succeeded");
                self.state.send_modify(|s| {
                    s.data = Some(Arc::new(data));
                    s.status = QueryStatus::Success;
                    s.error = None;
                    s.last_fetched_at = Some(Utc::now());
                    s.is_fetching = false;
                    s.is_stale = false;
                });
            }
            Err(err) => {
                warn!(key = %self.key, seq, error = %err, "fetch failed");
                self.state.send_modify(|s| {
                    s.status = QueryStatus::Error;
                    s.error = Some(err);
                    s.is_fetching = false;
                });
            }
        }
    }

    /// Drop interest in the in-flight fetch; its result, if any, is ignored.
    fn abandon(&self) {
        let mut inflight = self.inflight.lock();
        let Some(task) = inflight.task.take() else {
            return;
        };
        task.abort();
        inflight.seq += 1;
        self.state.send_modify(|s| {
            s.is_fetching = false;
            s.is_stale = true;
        });
        debug!(key = %self.key, "in-flight fetch abandoned");
    }
}

impl<T: Send + Sync + 'static> Slot for Entry<T> {
    fn observers(&self) -> usize {
        self.state.receiver_count()
    }

    fn invalidate(self: Arc<Self>) {
        self.state.send_modify(|s| s.is_stale = true);
        self.fetch(true);
    }

    fn discard(&self) {
        self.abandon();
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Process-wide query cache.
///
/// Cheap to clone; clones share the same entries. Create one at startup and
/// hand it to every consumer; call [`QueryClient::clear`] on teardown.
#[derive(Clone, Default)]
pub struct QueryClient {
    entries: Arc<Mutex<HashMap<QueryKey, Arc<dyn Slot>>>>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .finish()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `key`, fetching with `fetch_fn` unless a fresh value is
    /// cached or a fetch is already in flight.
    pub fn query<T, F, Fut>(&self, key: QueryKey, fetch_fn: F) -> QueryHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.query_with(key, QueryOptions::default(), fetch_fn)
    }

    /// Like [`QueryClient::query`]. A key with an empty segment is treated
    /// as disabled regardless of `options`.
    pub fn query_with<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch_fn: F,
    ) -> QueryHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let enabled = options.enabled && key.is_complete();
        let entry = self.entry::<T>(&key);
        let rx = entry.state.subscribe();

        if enabled {
            let producer: QueryFn<T> = Arc::new(move || fetch_fn().boxed());
            *entry.fetcher.lock() = Some(producer);

            let fresh = entry.state.borrow().is_fresh();
            if fresh {
                trace!(key = %key, "cache hit");
            } else {
                entry.fetch(false);
            }
        } else {
            trace!(key = %key, "query disabled");
        }

        QueryHandle { entry, rx }
    }

    /// Invalidate every entry whose key starts with `prefix`.
    ///
    /// Observed entries are marked stale and refetched; unobserved ones are
    /// dropped so the next subscriber fetches from scratch. Returns the
    /// number of entries affected.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut active = Vec::new();
        let mut discarded = 0;
        self.entries.lock().retain(|key, slot| {
            if !key.starts_with(prefix) {
                return true;
            }
            if slot.observers() > 0 {
                active.push(Arc::clone(slot));
                true
            } else {
                slot.discard();
                discarded += 1;
                false
            }
        });

        let refetched = active.len();
        for slot in active {
            slot.invalidate();
        }
        debug!(prefix = %prefix, refetched, discarded, "queries invalidated");
        refetched + discarded
    }

    /// Current snapshot of `key`, if cached with value type `T`.
    pub fn query_state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.lookup::<T>(key).map(|entry| entry.state.borrow().clone())
    }

    pub fn query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.lookup::<T>(key)
            .and_then(|entry| entry.state.borrow().data.clone())
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry nobody is subscribed to. Returns how many went.
    pub fn gc(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, slot| {
            let keep = slot.observers() > 0;
            if !keep {
                slot.discard();
            }
            keep
        });
        before - entries.len()
    }

    /// Cancel all in-flight fetches and forget every entry.
    pub fn clear(&self) {
        for (_, slot) in self.entries.lock().drain() {
            slot.discard();
        }
    }

    fn lookup<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<Entry<T>>> {
        let slot = Arc::clone(self.entries.lock().get(key)?);
        slot.into_any().downcast::<Entry<T>>().ok()
    }

    fn entry<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Arc<Entry<T>> {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.get(key) {
            match Arc::clone(slot).into_any().downcast::<Entry<T>>() {
                Ok(entry) => return entry,
                Err(_) => warn!(key = %key, "replacing cache entry holding a different value type"),
            }
        }

        let entry = Arc::new(Entry::new(key.clone()));
        let slot: Arc<dyn Slot> = entry.clone();
        if let Some(previous) = entries.insert(key.clone(), slot) {
            previous.discard();
        }
        entry
    }
}

/// A subscription to one cache entry. Dropping it unsubscribes; dropping the
/// last one abandons any in-flight fetch for the key.
///
/// A different key is a different query: to follow a changed key, create a
/// new handle and drop the old one.
pub struct QueryHandle<T: Send + Sync + 'static> {
    entry: Arc<Entry<T>>,
    rx: watch::Receiver<QueryState<T>>,
}

impl<T: Send + Sync + 'static> QueryHandle<T> {
    pub fn key(&self) -> &QueryKey {
        &self.entry.key
    }

    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.rx.borrow().data.clone()
    }

    /// Wait for the next state change and return the new state.
    pub async fn changed(&mut self) -> QueryState<T> {
        // The handle keeps the entry, and so the sender, alive.
        if self.rx.changed().await.is_err() {
            return self.state();
        }
        self.rx.borrow_and_update().clone()
    }

    /// Wait until no fetch is in flight and return that state.
    pub async fn settled(&mut self) -> QueryState<T> {
        let settled = self
            .rx
            .wait_for(|s| !s.is_fetching)
            .await
            .map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Fetch again now, superseding any fetch in flight. No-op for a query
    /// that was never enabled.
    pub fn refetch(&self) {
        self.entry.fetch(true);
    }
}

impl<T: Send + Sync + 'static> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        // `self.rx` is still counted here.
        if self.entry.state.receiver_count() <= 1 {
            self.entry.abandon();
        }
    }
}

impl<T: Send + Sync + fmt::Debug + 'static> fmt::Debug for QueryHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("key", &self.entry.key)
            .field("state", &*self.rx.borrow())
            .finish()
    }
}
