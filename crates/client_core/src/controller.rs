use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::{
    actions::{ActionExecutor, ActionOutcome, ActionRequest},
    error::Result,
    notify::{Notification, NotificationSink},
    page::{Filterable, ListQuery, Page, SortDirection},
    resources::ListSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Error,
}

/// Everything a view renders from. The last good page survives failures.
#[derive(Debug, Clone)]
pub struct ListViewState<T> {
    pub query: ListQuery,
    pub search_draft: String,
    pub status: LoadStatus,
    pub page: Option<Page<T>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loading { generation: u64 },
    Loaded { generation: u64, total_items: u64 },
    Failed { generation: u64, message: String },
    Superseded { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    /// A newer fetch was issued while this one was in flight.
    Superseded,
}

/// Pagination, sort, filter and search state for one list view.
///
/// Handles are cheap to clone and all point at the same view. Every fetch
/// takes a generation number; only the newest generation may write its
/// result back, so a slow response can never overwrite a newer query.
pub struct ListController<T> {
    inner: Arc<ControllerInner<T>>,
}

impl<T> Clone for ListController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ControllerInner<T> {
    label: &'static str,
    source: Arc<dyn ListSource<T>>,
    executor: Arc<dyn ActionExecutor>,
    notifier: Arc<dyn NotificationSink>,
    generation: AtomicU64,
    state: Mutex<ListViewState<T>>,
    events: broadcast::Sender<ListEvent>,
}

impl<T> ListController<T>
where
    T: Filterable + Clone + Send + Sync + 'static,
{
    pub fn new(
        label: &'static str,
        source: Arc<dyn ListSource<T>>,
        executor: Arc<dyn ActionExecutor>,
        notifier: Arc<dyn NotificationSink>,
        query: ListQuery,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let search_draft = query.search_text.clone().unwrap_or_default();
        Self {
            inner: Arc::new(ControllerInner {
                label,
                source,
                executor,
                notifier,
                generation: AtomicU64::new(0),
                state: Mutex::new(ListViewState {
                    query,
                    search_draft,
                    status: LoadStatus::Idle,
                    page: None,
                    error: None,
                }),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.inner.events.subscribe()
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub async fn snapshot(&self) -> ListViewState<T> {
        self.inner.state.lock().await.clone()
    }

    pub async fn query(&self) -> ListQuery {
        self.inner.state.lock().await.query.clone()
    }

    pub async fn page(&self) -> Option<Page<T>> {
        self.inner.state.lock().await.page.clone()
    }

    pub async fn set_sort(&self, field: &str, direction: SortDirection) -> FetchOutcome {
        self.update_and_fetch(|query| {
            query.sort_field = field.to_owned();
            query.sort_direction = direction;
        })
        .await
    }

    /// Header click on `field`.
    pub async fn toggle_sort(&self, field: &str) -> FetchOutcome {
        self.update_and_fetch(|query| {
            query.sort_direction = query.next_sort_direction(field);
            query.sort_field = field.to_owned();
        })
        .await
    }

    /// Returns `None` without fetching when `index` is outside the known
    /// page range.
    pub async fn set_page(&self, index: u64) -> Option<FetchOutcome> {
        {
            let mut state = self.inner.state.lock().await;
            let in_range = state
                .page
                .as_ref()
                .is_some_and(|page| page.contains_page(index));
            if !in_range {
                debug!(view = self.inner.label, index, "list: ignoring out of range page");
                return None;
            }
            state.query.page_index = index;
        }
        Some(self.fetch().await)
    }

    /// A zero size is rejected without fetching.
    pub async fn set_page_size(&self, size: u64) -> Option<FetchOutcome> {
        if size == 0 {
            return None;
        }
        Some(self.update_and_fetch(|query| query.page_size = size).await)
    }

    /// An empty value or `all` clears the filter.
    pub async fn set_filter(&self, key: &str, value: &str) -> FetchOutcome {
        self.update_and_fetch(|query| query.set_filter(key, value))
            .await
    }

    /// Typing only edits the draft; nothing is fetched.
    pub async fn edit_search_draft(&self, text: &str) {
        self.inner.state.lock().await.search_draft = text.to_owned();
    }

    pub async fn submit_search(&self) -> FetchOutcome {
        {
            let mut state = self.inner.state.lock().await;
            let draft = state.search_draft.clone();
            state.query.set_search(draft);
            state.query.page_index = 0;
        }
        self.fetch().await
    }

    pub async fn set_search(&self, text: &str) -> FetchOutcome {
        self.edit_search_draft(text).await;
        self.submit_search().await
    }

    /// Re-issues the current query unconditionally.
    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch().await
    }

    /// Replaces the whole query, page index included, with a single fetch.
    /// Used when a view is opened at a known position.
    pub async fn load(&self, query: ListQuery) -> FetchOutcome {
        {
            let mut state = self.inner.state.lock().await;
            state.search_draft = query.search_text.clone().unwrap_or_default();
            state.query = query;
        }
        self.fetch().await
    }

    /// Runs one mutation. Success is announced and followed by a refresh of
    /// the current page; failure is announced and leaves the page alone.
    pub async fn submit(&self, request: ActionRequest) -> Result<ActionOutcome> {
        debug!(view = self.inner.label, action = request.kind(), "list: submitting");
        match self.inner.executor.execute(&request).await {
            Ok(outcome) => {
                self.inner
                    .notifier
                    .notify(Notification::success(&outcome.title, &outcome.message));
                self.refresh().await;
                Ok(outcome)
            }
            Err(err) => {
                let (title, fallback) = request.failure();
                warn!(
                    view = self.inner.label,
                    action = request.kind(),
                    "list: action failed: {err}"
                );
                self.inner
                    .notifier
                    .notify(Notification::error(title, err.user_message(fallback)));
                Err(err)
            }
        }
    }

    async fn update_and_fetch(&self, update: impl FnOnce(&mut ListQuery)) -> FetchOutcome {
        {
            let mut state = self.inner.state.lock().await;
            update(&mut state.query);
            state.query.page_index = 0;
        }
        self.fetch().await
    }

    async fn fetch(&self) -> FetchOutcome {
        let label = self.inner.label;
        let (generation, query) = {
            let mut state = self.inner.state.lock().await;
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.status = LoadStatus::Loading;
            (generation, state.query.clone())
        };
        let _ = self.inner.events.send(ListEvent::Loading { generation });
        debug!(
            view = label,
            generation,
            page = query.page_index,
            size = query.page_size,
            sort = %query.sort_field,
            "list: fetching"
        );

        let result = self.inner.source.fetch_listing(&query).await;

        let mut state = self.inner.state.lock().await;
        if generation != self.inner.generation.load(Ordering::SeqCst) {
            debug!(view = label, generation, "list: discarding stale response");
            let _ = self.inner.events.send(ListEvent::Superseded { generation });
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(listing) => {
                let client_side: Vec<(&str, &str)> = query
                    .filters
                    .iter()
                    .filter(|(key, _)| !self.inner.source.handles_filter(key, &query))
                    .map(|(key, value)| (key.as_str(), value.as_str()))
                    .collect();
                let page = listing.into_page(&query, &client_side);
                let total_items = page.total_items;
                state.page = Some(page);
                state.status = LoadStatus::Idle;
                state.error = None;
                let _ = self.inner.events.send(ListEvent::Loaded {
                    generation,
                    total_items,
                });
                FetchOutcome::Applied
            }
            Err(err) => {
                let message = err.user_message(&format!("Failed to load {label}"));
                warn!(view = label, generation, "list: fetch failed: {err}");
                state.status = LoadStatus::Error;
                state.error = Some(message.clone());
                drop(state);
                self.inner
                    .notifier
                    .notify(Notification::error("Loading Failed", message.clone()));
                let _ = self
                    .inner
                    .events
                    .send(ListEvent::Failed { generation, message });
                FetchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
