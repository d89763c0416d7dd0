// ── List screen controller ──
//
// Holds the page / per-page / search / filter state of one list screen
// and turns every state change into a cache-first fetch. Consumers
// render from the `ListView` published on a `watch` channel.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use adminkit_api::{ApiClient, Error as ApiError, Filters, ListEnvelope, ListQuery};

use crate::cache::{CacheEntry, ResultCache, compute_key};
use crate::notify::{Notice, Notifier, TracingNotifier};

const DEFAULT_PER_PAGE: u32 = 10;

/// Anything that can serve one page of a resource.
pub trait ListSource: Send + Sync {
    fn fetch_page(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> impl Future<Output = Result<ListEnvelope, ApiError>> + Send;
}

impl ListSource for ApiClient {
    fn fetch_page(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> impl Future<Output = Result<ListEnvelope, ApiError>> + Send {
        self.list(resource, query)
    }
}

impl<T: ListSource> ListSource for Arc<T> {
    fn fetch_page(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> impl Future<Output = Result<ListEnvelope, ApiError>> + Send {
        (**self).fetch_page(resource, query)
    }
}

/// Query state of one list screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQueryState {
    pub current_page: u32,
    pub per_page: u32,
    pub search_term: String,
    pub filters: Filters,
    /// Caller-supplied values that scope the cache key (e.g. a tenant id).
    pub deps: Vec<Value>,
}

impl Default for ListQueryState {
    fn default() -> Self {
        Self {
            current_page: 1,
            per_page: DEFAULT_PER_PAGE,
            search_term: String::new(),
            filters: Filters::new(),
            deps: Vec::new(),
        }
    }
}

/// What a list screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub data: Arc<CacheEntry>,
    pub loading: bool,
    pub total_rows: u64,
    pub current_page: u32,
    pub per_page: u32,
    pub search_term: String,
}

/// One fetch. Unset query fields fall back to the controller's state.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub filters: Option<Filters>,
    /// Skip the cache and always hit the network.
    pub force: bool,
    /// Leave the loading flag untouched (background refresh).
    pub silent: bool,
}

impl FetchRequest {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Cache-backed controller for a paginated resource.
pub struct ListController<S> {
    source: S,
    cache: Arc<ResultCache>,
    notifier: Arc<dyn Notifier>,
    resource: String,
    state: ListQueryState,
    view: watch::Sender<ListView>,
    /// Bumped by every fetch; only the newest one may publish data.
    generation: AtomicU64,
    /// Non-silent network fetches still in flight.
    loading: AtomicUsize,
}

impl<S: ListSource> ListController<S> {
    /// A controller for `resource` backed by the process-wide cache.
    pub fn new(source: S, resource: impl Into<String>) -> Self {
        Self::with_cache(source, resource, ResultCache::shared())
    }

    pub fn with_cache(source: S, resource: impl Into<String>, cache: Arc<ResultCache>) -> Self {
        let state = ListQueryState::default();
        let (view, _) = watch::channel(ListView {
            data: Arc::new(CacheEntry::empty()),
            loading: false,
            total_rows: 0,
            current_page: state.current_page,
            per_page: state.per_page,
            search_term: state.search_term.clone(),
        });
        Self {
            source,
            cache,
            notifier: Arc::new(TracingNotifier),
            resource: resource.into(),
            state,
            view,
            generation: AtomicU64::new(0),
            loading: AtomicUsize::new(0),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the initial state without fetching.
    pub fn with_state(mut self, mut state: ListQueryState) -> Self {
        state.current_page = state.current_page.max(1);
        state.per_page = state.per_page.max(1);
        self.state = state;
        self.publish_state();
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn state(&self) -> &ListQueryState {
        &self.state
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// The latest view.
    pub fn view(&self) -> ListView {
        self.view.borrow().clone()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.view.subscribe()
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Fetch a page, consulting the cache unless `request.force` is set.
    ///
    /// Never fails: a network or parse error is logged, reported through
    /// the notifier once, and degrades to an empty, uncached result.
    ///
    /// Overlapping fetches on one controller are allowed. The view shows
    /// the data of the most recently started one, and stays loading until
    /// every non-silent fetch has finished.
    pub async fn fetch(&self, request: FetchRequest) -> Arc<CacheEntry> {
        let query = ListQuery {
            page: request.page.unwrap_or(self.state.current_page).max(1),
            per_page: request.per_page.unwrap_or(self.state.per_page).max(1),
            search: request
                .search
                .unwrap_or_else(|| self.state.search_term.clone()),
            filters: request
                .filters
                .unwrap_or_else(|| self.state.filters.clone()),
        };
        let key = compute_key(
            &self.resource,
            query.page,
            query.per_page,
            &query.search,
            &query.filters,
            &self.state.deps,
        );

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !request.force {
            if let Some(hit) = self.cache.read(&key) {
                debug!(resource = %self.resource, page = query.page, "served from cache");
                self.publish_data(&hit, generation, None);
                return hit;
            }
        }

        if !request.silent {
            self.loading.fetch_add(1, Ordering::SeqCst);
            self.view.send_modify(|v| v.loading = true);
        }

        let source = &self.source;
        let resource = self.resource.as_str();
        let fetch_page = || async move {
            source
                .fetch_page(resource, &query)
                .await
                .map(CacheEntry::from)
        };
        let result = if request.force {
            self.cache.load(key, true, fetch_page).await
        } else {
            self.cache.fill(key, fetch_page).await
        };

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(resource = %self.resource, error = %e, "list fetch failed");
                self.notifier
                    .notify(Notice::error(format!("Failed to load {}: {e}", self.resource)));
                Arc::new(CacheEntry::empty())
            }
        };

        let loading =
            (!request.silent).then(|| self.loading.fetch_sub(1, Ordering::SeqCst) > 1);
        self.publish_data(&entry, generation, loading);
        entry
    }

    /// Re-fetch the current state from the network, bypassing the cache.
    ///
    /// Call after any create / update / delete on the resource.
    pub async fn refresh(&self) -> Arc<CacheEntry> {
        self.fetch(FetchRequest::forced()).await
    }

    // ── State changes (each one fetches) ─────────────────────────────

    pub async fn set_current_page(&mut self, page: u32) -> Arc<CacheEntry> {
        self.state.current_page = page.max(1);
        self.publish_state();
        self.fetch(FetchRequest::default()).await
    }

    pub async fn set_per_page(&mut self, per_page: u32) -> Arc<CacheEntry> {
        self.state.per_page = per_page.max(1);
        self.publish_state();
        self.fetch(FetchRequest::default()).await
    }

    /// Change the search term. Always returns to page 1.
    pub async fn handle_search(&mut self, term: impl Into<String>) -> Arc<CacheEntry> {
        self.state.search_term = term.into();
        self.state.current_page = 1;
        self.publish_state();
        self.fetch(FetchRequest::default()).await
    }

    /// Replace the extra filters. Always returns to page 1.
    pub async fn set_filters(&mut self, filters: Filters) -> Arc<CacheEntry> {
        self.state.filters = filters;
        self.state.current_page = 1;
        self.publish_state();
        self.fetch(FetchRequest::default()).await
    }

    /// Replace the dependency values that scope the cache key.
    pub async fn set_deps(&mut self, deps: Vec<Value>) -> Arc<CacheEntry> {
        self.state.deps = deps;
        self.fetch(FetchRequest::default()).await
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn publish_state(&self) {
        let state = &self.state;
        self.view.send_modify(|v| {
            v.current_page = state.current_page;
            v.per_page = state.per_page;
            v.search_term.clone_from(&state.search_term);
        });
    }

    fn publish_data(&self, entry: &Arc<CacheEntry>, generation: u64, loading: Option<bool>) {
        let current = self.generation.load(Ordering::SeqCst) == generation;
        if !current {
            debug!(resource = %self.resource, "dropping superseded page");
        }
        self.view.send_modify(|v| {
            if current {
                v.data = Arc::clone(entry);
                v.total_rows = entry.total_count;
            }
            if let Some(loading) = loading {
                v.loading = loading;
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use adminkit_api::FilterValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::notify::NoticeLevel;

    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        queries: Mutex<Vec<ListQuery>>,
        /// Per-page response latency.
        delays: Mutex<Vec<(u32, Duration)>>,
    }

    impl FakeSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_query(&self) -> ListQuery {
            self.queries.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl ListSource for FakeSource {
        fn fetch_page(
            &self,
            _resource: &str,
            query: &ListQuery,
        ) -> impl Future<Output = Result<ListEnvelope, ApiError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            let fail = self.fail.load(Ordering::SeqCst);
            let page = query.page;
            let delay = self
                .delays
                .lock()
                .unwrap()
                .iter()
                .find(|(p, _)| *p == page)
                .map(|(_, d)| *d);
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    return Err(ApiError::Server {
                        status: 500,
                        message: "boom".into(),
                    });
                }
                let rows: Vec<Value> = (1..=5).map(|i| json!({ "id": i, "page": page })).collect();
                ListEnvelope::from_value(json!({ "data": rows, "meta": { "total": 5 } }))
            }
        }
    }

    fn controller() -> (Arc<FakeSource>, ListController<Arc<FakeSource>>) {
        let source = Arc::new(FakeSource::default());
        let ctrl = ListController::with_cache(
            Arc::clone(&source),
            "widgets",
            Arc::new(ResultCache::default()),
        );
        (source, ctrl)
    }

    #[tokio::test]
    async fn repeated_fetch_is_served_from_cache() {
        let (source, ctrl) = controller();

        let first = ctrl.fetch(FetchRequest::default()).await;
        let second = ctrl.fetch(FetchRequest::default()).await;

        assert_eq!(first.items.len(), 5);
        assert_eq!(first.total_count, 5);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_always_reaches_network() {
        let (source, ctrl) = controller();

        ctrl.fetch(FetchRequest::default()).await;
        ctrl.refresh().await;
        ctrl.refresh().await;

        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn search_resets_page_before_fetching() {
        let (source, mut ctrl) = controller();

        ctrl.set_current_page(4).await;
        assert_eq!(source.last_query().page, 4);

        ctrl.handle_search("blue").await;

        assert_eq!(ctrl.state().current_page, 1);
        let query = source.last_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.search, "blue");
        assert_eq!(ctrl.view().current_page, 1);
        assert_eq!(ctrl.view().search_term, "blue");
    }

    #[tokio::test]
    async fn setters_fetch_with_updated_state() {
        let (source, mut ctrl) = controller();

        ctrl.set_per_page(50).await;
        assert_eq!(source.last_query().per_page, 50);

        let mut filters = Filters::new();
        filters.insert("status".into(), FilterValue::from("active"));
        ctrl.set_current_page(3).await;
        ctrl.set_filters(filters.clone()).await;

        let query = source.last_query();
        assert_eq!(query.filters, filters);
        assert_eq!(query.page, 1);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn returning_to_a_seen_page_uses_cache() {
        let (source, mut ctrl) = controller();

        ctrl.set_current_page(1).await;
        ctrl.set_current_page(2).await;
        ctrl.set_current_page(1).await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn deps_scope_the_cache_key() {
        let (source, mut ctrl) = controller();

        ctrl.fetch(FetchRequest::default()).await;
        ctrl.set_deps(vec![json!("tenant-2")]).await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_degrades_and_does_not_poison_cache() {
        let (source, ctrl) = controller();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctrl = ctrl.with_notifier(Arc::new(tx));

        source.fail.store(true, Ordering::SeqCst);
        let failed = ctrl.fetch(FetchRequest::default()).await;
        assert!(failed.items.is_empty());
        assert_eq!(failed.total_count, 0);
        assert!(ctrl.cache().is_empty());

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(rx.try_recv().is_err(), "exactly one notice per failure");

        source.fail.store(false, Ordering::SeqCst);
        let recovered = ctrl.fetch(FetchRequest::default()).await;
        assert_eq!(recovered.items.len(), 5);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn view_tracks_loading_and_totals() {
        let (_source, ctrl) = controller();
        let mut rx = ctrl.subscribe();

        ctrl.fetch(FetchRequest::default()).await;

        let view = rx.borrow_and_update().clone();
        assert!(!view.loading);
        assert_eq!(view.total_rows, 5);
        assert_eq!(view.data.items.len(), 5);
    }

    #[tokio::test]
    async fn cache_hit_and_silent_fetch_never_toggle_loading() {
        let (_source, ctrl) = controller();
        ctrl.fetch(FetchRequest::default()).await;

        let mut rx = ctrl.subscribe();

        // Loading would only be observable mid-flight; check it was never
        // left on and that the silent path did not flip it.
        ctrl.fetch(FetchRequest::default()).await;
        assert!(!rx.borrow_and_update().loading);
        ctrl.fetch(FetchRequest::forced().silent()).await;
        assert!(!rx.borrow_and_update().loading);
    }

    #[tokio::test]
    async fn explicit_request_fields_override_state() {
        let (source, ctrl) = controller();

        ctrl.fetch(FetchRequest {
            page: Some(7),
            search: Some("x".into()),
            ..FetchRequest::default()
        })
        .await;

        let query = source.last_query();
        assert_eq!(query.page, 7);
        assert_eq!(query.search, "x");
        assert_eq!(ctrl.state().current_page, 1);
    }

    #[tokio::test]
    async fn cache_miss_is_counted_once() {
        let (_source, ctrl) = controller();

        ctrl.fetch(FetchRequest::default()).await;
        ctrl.fetch(FetchRequest::default()).await;

        let stats = ctrl.cache().stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_does_not_replace_newer_page() {
        let (source, ctrl) = controller();
        source
            .delays
            .lock()
            .unwrap()
            .extend([(1, Duration::from_millis(100)), (2, Duration::from_millis(10))]);
        let ctrl = Arc::new(ctrl);

        let slow = tokio::spawn({
            let ctrl = Arc::clone(&ctrl);
            async move {
                ctrl.fetch(FetchRequest {
                    page: Some(1),
                    ..FetchRequest::default()
                })
                .await
            }
        });
        while source.calls() == 0 {
            tokio::task::yield_now().await;
        }

        ctrl.fetch(FetchRequest {
            page: Some(2),
            ..FetchRequest::default()
        })
        .await;
        let view = ctrl.view();
        assert!(view.loading, "page 1 is still in flight");
        assert_eq!(view.data.items[0]["page"], 2);

        let stale = slow.await.unwrap();
        assert_eq!(stale.items[0]["page"], 1);
        let view = ctrl.view();
        assert!(!view.loading);
        assert_eq!(view.data.items[0]["page"], 2);
        assert_eq!(source.calls(), 2);
    }
}
