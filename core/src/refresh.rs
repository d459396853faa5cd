use futures::future::BoxFuture;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// One constituent refresh: resolves to the slice's error after it has run
/// to completion, or `None` on success.
pub type RefreshTask = BoxFuture<'static, Option<String>>;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RefreshSummary {
    pub error: Option<String>,
    pub failed: usize,
    pub total: usize,
}

#[derive(Default)]
struct CoordinatorInner {
    loading: AtomicBool,
    error: Mutex<Option<String>>,
}

/// Fans a "refresh everything" request out over independent slices and
/// presents one merged loading/error state. Constituents run concurrently
/// and to completion; one slice failing never cancels the others.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while any constituent refresh is outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// The first non-null error from the most recent `refresh_all`.
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .error
            .lock()
            .expect("refresh error lock")
            .clone()
    }

    pub fn dismiss_error(&self) {
        *self.inner.error.lock().expect("refresh error lock") = None;
    }

    pub async fn refresh_all(&self, tasks: Vec<RefreshTask>) -> RefreshSummary {
        let total = tasks.len();
        self.inner.loading.store(true, Ordering::SeqCst);
        *self.inner.error.lock().expect("refresh error lock") = None;

        let outcomes = join_all(tasks).await;

        let failed = outcomes.iter().filter(|outcome| outcome.is_some()).count();
        let error = outcomes.into_iter().flatten().next();
        *self.inner.error.lock().expect("refresh error lock") = error.clone();
        self.inner.loading.store(false, Ordering::SeqCst);

        RefreshSummary {
            error,
            failed,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn first_error_wins_and_all_tasks_complete() {
        let coordinator = RefreshCoordinator::new();
        let completions = Arc::new(AtomicU32::new(0));

        let succeed = |completions: Arc<AtomicU32>| {
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                completions.fetch_add(1, Ordering::SeqCst);
                None::<String>
            }
            .boxed()
        };
        let fail = |completions: Arc<AtomicU32>, message: &'static str| {
            async move {
                completions.fetch_add(1, Ordering::SeqCst);
                Some(message.to_string())
            }
            .boxed()
        };

        let summary = coordinator
            .refresh_all(vec![
                succeed(Arc::clone(&completions)),
                fail(Arc::clone(&completions), "network error"),
                fail(Arc::clone(&completions), "second failure"),
            ])
            .await;

        assert_eq!(completions.load(Ordering::SeqCst), 3);
        assert_eq!(summary.error, Some("network error".to_string()));
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total, 3);
        assert!(!coordinator.is_loading());
        assert_eq!(coordinator.last_error(), Some("network error".to_string()));
    }

    #[tokio::test]
    async fn dismiss_clears_merged_error() {
        let coordinator = RefreshCoordinator::new();
        coordinator
            .refresh_all(vec![async { Some("boom".to_string()) }.boxed()])
            .await;
        coordinator.dismiss_error();
        assert_eq!(coordinator.last_error(), None);
    }

    #[tokio::test]
    async fn empty_refresh_is_a_clean_noop() {
        let coordinator = RefreshCoordinator::new();
        let summary = coordinator.refresh_all(Vec::new()).await;
        assert_eq!(summary, RefreshSummary::default());
    }
}
