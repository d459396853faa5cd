use crate::api::ApiResult;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tracing::debug;

/// One domain value's observable record.
#[derive(Debug, Clone, Serialize)]
pub struct SliceState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for SliceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_updated: None,
        }
    }
}

/// The merged loading/error view a slice presents to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliceStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SliceStatus {
    /// loading = any constituent loading; error = first non-null;
    /// last_updated = most recent.
    pub fn merge<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = SliceStatus>,
    {
        let mut merged = SliceStatus::default();
        for part in parts {
            merged.loading = merged.loading || part.loading;
            if merged.error.is_none() {
                merged.error = part.error;
            }
            if part.last_updated > merged.last_updated {
                merged.last_updated = part.last_updated;
            }
        }
        merged
    }
}

#[derive(Debug)]
pub struct ResourceOptions<T> {
    /// Clear list-typed data before a refresh refetch so a consumer never
    /// renders old and new items concatenated.
    pub clear_on_refresh: bool,
    /// Substitute dataset for endpoints that may legitimately not exist in
    /// this environment (backend answered 404).
    pub not_found_fallback: Option<fn() -> T>,
}

impl<T> ResourceOptions<T> {
    pub fn with_clear_on_refresh(mut self) -> Self {
        self.clear_on_refresh = true;
        self
    }

    pub fn with_not_found_fallback(mut self, fallback: fn() -> T) -> Self {
        self.not_found_fallback = Some(fallback);
        self
    }
}

impl<T> Default for ResourceOptions<T> {
    fn default() -> Self {
        Self {
            clear_on_refresh: false,
            not_found_fallback: None,
        }
    }
}

/// A single fetchable value with loading/error bookkeeping. Every outgoing
/// fetch is stamped with a monotonic generation; a completion whose
/// generation is no longer the latest is discarded instead of overwriting a
/// newer response.
#[derive(Debug)]
pub struct Resource<T> {
    state: Mutex<SliceState<T>>,
    generation: AtomicU64,
    options: ResourceOptions<T>,
}

impl<T> Resource<T> {
    pub fn new(options: ResourceOptions<T>) -> Self {
        Self {
            state: Mutex::new(SliceState::default()),
            generation: AtomicU64::new(0),
            options,
        }
    }

    pub fn status(&self) -> SliceStatus {
        let state = self.state.lock().expect("slice state lock");
        SliceStatus {
            loading: state.loading,
            error: state.error.clone(),
            last_updated: state.last_updated,
        }
    }

    pub fn loading(&self) -> bool {
        self.state.lock().expect("slice state lock").loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().expect("slice state lock").error.clone()
    }

    /// Direct state overwrite with no network call.
    pub fn set(&self, data: T) {
        let mut state = self.state.lock().expect("slice state lock");
        state.data = Some(data);
        state.last_updated = Some(Utc::now());
    }

    /// In-place edit of the current data, used for optimistic updates after
    /// a mutation POST succeeds.
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut Option<T>),
    {
        let mut state = self.state.lock().expect("slice state lock");
        edit(&mut state.data);
    }

    pub fn clear(&self) {
        self.state.lock().expect("slice state lock").data = None;
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let mut state = self.state.lock().expect("slice state lock");
        state.error = Some(error.into());
        state.loading = false;
    }

    /// Clears the error without retrying, leaving stale data visible.
    pub fn dismiss_error(&self) {
        self.state.lock().expect("slice state lock").error = None;
    }

    pub fn reset(&self) {
        *self.state.lock().expect("slice state lock") = SliceState::default();
    }

    /// Marks a fetch as started: loading on, error cleared, new generation.
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().expect("slice state lock");
        state.loading = true;
        state.error = None;
        generation
    }

    /// Like `begin`, additionally clearing data when the resource is
    /// configured to avoid stale-plus-fresh list rendering.
    pub fn begin_refresh(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock().expect("slice state lock");
        state.loading = true;
        state.error = None;
        if self.options.clear_on_refresh {
            state.data = None;
        }
        generation
    }

    /// Applies a completed fetch. Success replaces data wholesale; a 404
    /// with a configured fallback substitutes the mock dataset and clears
    /// the error; any other failure records the message and preserves prior
    /// data.
    pub fn apply(&self, generation: u64, result: ApiResult<T>) {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding superseded response");
            return;
        }
        let mut state = self.state.lock().expect("slice state lock");
        match result {
            ApiResult::Ok { data, .. } => {
                state.data = Some(data);
                state.loading = false;
                state.error = None;
                state.last_updated = Some(Utc::now());
            }
            ApiResult::Err { error, status } => {
                match (status, self.options.not_found_fallback) {
                    (Some(404), Some(fallback)) => {
                        state.data = Some(fallback());
                        state.loading = false;
                        state.error = None;
                        state.last_updated = Some(Utc::now());
                    }
                    _ => {
                        state.error = Some(error);
                        state.loading = false;
                    }
                }
            }
        }
    }

    pub async fn fetch_with<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        let generation = self.begin();
        let result = future.await;
        self.apply(generation, result);
    }

    pub async fn refresh_with<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        let generation = self.begin_refresh();
        let result = future.await;
        self.apply(generation, result);
    }
}

impl<T: Clone> Resource<T> {
    pub fn snapshot(&self) -> SliceState<T> {
        self.state.lock().expect("slice state lock").clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.lock().expect("slice state lock").data.clone()
    }
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self::new(ResourceOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(value: u32) -> ApiResult<u32> {
        ApiResult::Ok {
            data: value,
            status: 200,
        }
    }

    fn err(message: &str, status: Option<u16>) -> ApiResult<u32> {
        ApiResult::Err {
            error: message.to_string(),
            status,
        }
    }

    #[test]
    fn success_populates_and_clears_loading() {
        let resource: Resource<u32> = Resource::default();
        let generation = resource.begin();
        assert!(resource.loading());
        resource.apply(generation, ok(7));

        let state = resource.snapshot();
        assert_eq!(state.data, Some(7));
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert!(state.last_updated.is_some());
    }

    #[test]
    fn failure_preserves_prior_data() {
        let resource: Resource<u32> = Resource::default();
        resource.set(42);

        let generation = resource.begin();
        resource.apply(generation, err("backend exploded", Some(500)));

        let state = resource.snapshot();
        assert_eq!(state.data, Some(42));
        assert_eq!(state.error, Some("backend exploded".to_string()));
        assert!(!state.loading);
    }

    #[test]
    fn not_found_substitutes_fallback_without_error() {
        let resource = Resource::new(ResourceOptions::default().with_not_found_fallback(|| 99));
        let generation = resource.begin();
        resource.apply(generation, err("Request failed with status 404", Some(404)));

        let state = resource.snapshot();
        assert_eq!(state.data, Some(99));
        assert_eq!(state.error, None);
    }

    #[test]
    fn not_found_without_fallback_is_an_error() {
        let resource: Resource<u32> = Resource::default();
        let generation = resource.begin();
        resource.apply(generation, err("missing", Some(404)));
        assert_eq!(resource.error(), Some("missing".to_string()));
    }

    #[test]
    fn superseded_response_is_discarded() {
        let resource: Resource<u32> = Resource::default();
        let stale = resource.begin();
        let fresh = resource.begin();

        resource.apply(fresh, ok(2));
        resource.apply(stale, ok(1));

        assert_eq!(resource.data(), Some(2));
    }

    #[test]
    fn refresh_clears_only_when_configured() {
        let clearing: Resource<u32> =
            Resource::new(ResourceOptions::default().with_clear_on_refresh());
        clearing.set(5);
        clearing.begin_refresh();
        assert_eq!(clearing.data(), None);

        let keeping: Resource<u32> = Resource::default();
        keeping.set(5);
        keeping.begin_refresh();
        assert_eq!(keeping.data(), Some(5));
    }

    #[test]
    fn dismiss_error_keeps_stale_data() {
        let resource: Resource<u32> = Resource::default();
        resource.set(11);
        let generation = resource.begin();
        resource.apply(generation, err("boom", Some(500)));

        resource.dismiss_error();
        let state = resource.snapshot();
        assert_eq!(state.error, None);
        assert_eq!(state.data, Some(11));
    }

    #[test]
    fn status_merge_is_first_error_wins() {
        let merged = SliceStatus::merge(vec![
            SliceStatus {
                loading: false,
                error: None,
                last_updated: None,
            },
            SliceStatus {
                loading: true,
                error: Some("network error".to_string()),
                last_updated: None,
            },
            SliceStatus {
                loading: false,
                error: Some("later".to_string()),
                last_updated: None,
            },
        ]);
        assert!(merged.loading);
        assert_eq!(merged.error, Some("network error".to_string()));
    }
}
