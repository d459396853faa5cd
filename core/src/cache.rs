use crate::api::ApiResult;
use chrono::DateTime;
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// The identity of a cacheable request: endpoint path plus ordered query
/// parameters. Construction sorts the parameters so equal requests hash
/// equal regardless of call-site ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    path: String,
    params: Vec<(String, String)>,
}

impl RequestKey {
    pub fn new(path: impl Into<String>, params: impl Into<Vec<(String, String)>>) -> Self {
        let mut params = params.into();
        params.sort();
        Self {
            path: path.into(),
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        for (idx, (name, value)) in self.params.iter().enumerate() {
            let sep = if idx == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Expiry configuration. The default keeps entries for the lifetime of the
/// process, matching the dashboard's demo-scale datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub items: usize,
}

type SharedFetch = Shared<BoxFuture<'static, ApiResult<Value>>>;

struct CacheInner {
    entries: Mutex<HashMap<RequestKey, CacheEntry>>,
    inflight: Mutex<HashMap<RequestKey, SharedFetch>>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Process-wide store of the most recent successful result per request
/// signature. Cheap to clone; every clone shares the same entries, so
/// controllers receive it by injection rather than through a module-level
/// singleton.
#[derive(Clone)]
pub struct FetchCache {
    inner: Arc<CacheInner>,
}

impl FetchCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
                policy,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Entry lookup only; never triggers a fetch. Expired entries are
    /// dropped on read.
    pub fn get(&self, key: &RequestKey) -> Option<CacheEntry> {
        let mut entries = self.inner.entries.lock().expect("cache entries lock");
        let expired = match entries.get(key) {
            Some(entry) => self.is_expired(entry),
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if expired {
            entries.remove(key);
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).cloned()
    }

    /// Serves an existing entry immediately; otherwise joins the in-flight
    /// fetch for this key, or starts one. Exactly one network call is made
    /// for any number of concurrent callers with the same key, and all of
    /// them observe the same resolved value. Failures are propagated without
    /// being cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &RequestKey, fetch: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        if let Some(entry) = self.get(key) {
            return ApiResult::Ok {
                data: entry.value,
                status: 200,
            };
        }
        self.join_or_spawn(key, fetch).await
    }

    /// Same dedup and store rules as `get_or_fetch`, but always goes to the
    /// network. Used by slice refresh so stale entries are actually
    /// refetched.
    pub async fn refresh<F, Fut>(&self, key: &RequestKey, fetch: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        self.join_or_spawn(key, fetch).await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            items: self.inner.entries.lock().expect("cache entries lock").len(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().expect("cache entries lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .entries
            .lock()
            .expect("cache entries lock")
            .clear();
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        match self.inner.policy.ttl {
            Some(ttl) => Utc::now() >= entry.fetched_at + ttl,
            None => false,
        }
    }

    async fn join_or_spawn<F, Fut>(&self, key: &RequestKey, fetch: F) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let shared = {
            let mut inflight = self.inner.inflight.lock().expect("cache inflight lock");
            if let Some(existing) = inflight.get(key) {
                existing.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let owned_key = key.clone();
                let future = fetch();
                let shared = async move {
                    let result = future.await;
                    if let ApiResult::Ok { data, .. } = &result {
                        inner
                            .entries
                            .lock()
                            .expect("cache entries lock")
                            .insert(
                                owned_key.clone(),
                                CacheEntry {
                                    value: data.clone(),
                                    fetched_at: Utc::now(),
                                },
                            );
                    }
                    inner
                        .inflight
                        .lock()
                        .expect("cache inflight lock")
                        .remove(&owned_key);
                    result
                }
                .boxed()
                .shared();
                inflight.insert(key.clone(), shared.clone());
                shared
            }
        };
        shared.await
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("FetchCache")
            .field("items", &stats.items)
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .finish()
    }
}
