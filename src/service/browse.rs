//! Listing browse orchestrator
//!
//! Owns the browse state (page, search text, filters, deep-linked id, the
//! current page of listings and the detail selection). Every change to an
//! input that shapes the listing query dispatches a fresh fetch.
//!
//! Ordering: each dispatch takes the next generation number and aborts the
//! previous in-flight task. A finished fetch is applied only if its
//! generation is still the latest, so a slow stale response can never
//! overwrite a fresh one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{OnceCell, RwLock};
use tokio::task::{AbortHandle, JoinHandle};

use super::listing_query::{ListingPage, ListingSource, derive_request};
use crate::data::{Catalog, Listing, ListingFilter};
use crate::error::AppError;
use crate::metrics::STALE_RESPONSES_TOTAL;

/// Snapshot of everything the listing views render from
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseState {
    pub search_query: String,
    pub filters: ListingFilter,
    /// 1-based
    pub page: u32,
    pub items: Vec<Listing>,
    pub total_pages: u32,
    /// Deep-linked listing id, 0 when none
    pub car_selected_by_id: i64,
    /// Listing shown in the detail sheet
    pub car_selected: Option<Listing>,
    pub open_sheet: bool,
    pub catalog: Option<Arc<Catalog>>,
    /// Message of the last failed fetch, cleared by the next success
    pub last_error: Option<String>,
    pub loading: bool,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            filters: ListingFilter::default(),
            page: 1,
            items: Vec::new(),
            total_pages: 0,
            car_selected_by_id: 0,
            car_selected: None,
            open_sheet: false,
            catalog: None,
            last_error: None,
            loading: false,
        }
    }
}

/// How a dispatched fetch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Items and page count were replaced
    Applied,
    /// A newer fetch was dispatched first; the result was dropped
    Stale,
    /// The fetch failed; state kept its previous items
    Failed(String),
    /// Aborted before completing
    Cancelled,
}

/// Handle on one dispatched fetch
#[derive(Debug)]
pub struct FetchHandle {
    generation: u64,
    task: JoinHandle<FetchOutcome>,
}

impl FetchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Abort this fetch only
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Wait for the fetch to finish and report how it ended
    pub async fn wait(self) -> FetchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => FetchOutcome::Cancelled,
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

struct Inner {
    state: BrowseState,
    in_flight: Option<AbortHandle>,
}

/// Browse orchestrator over a listing source
pub struct ListingBrowser<S: ListingSource> {
    source: Arc<S>,
    viewer: Option<i64>,
    inner: Arc<RwLock<Inner>>,
    generation: Arc<AtomicU64>,
    catalog: OnceCell<Arc<Catalog>>,
}

impl<S: ListingSource> ListingBrowser<S> {
    /// Create a browser; `viewer` is the logged-in user whose own listings are hidden
    pub fn new(source: Arc<S>, viewer: Option<i64>) -> Self {
        Self {
            source,
            viewer,
            inner: Arc::new(RwLock::new(Inner {
                state: BrowseState::default(),
                in_flight: None,
            })),
            generation: Arc::new(AtomicU64::new(0)),
            catalog: OnceCell::new(),
        }
    }

    pub fn viewer(&self) -> Option<i64> {
        self.viewer
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> BrowseState {
        self.inner.read().await.state.clone()
    }

    /// Generation of the most recent dispatch
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Query-shaping setters
    // =========================================================================

    pub async fn set_page(&self, page: u32) -> FetchHandle {
        self.update_and_dispatch(|state| state.page = page.max(1))
            .await
    }

    /// Change the free text; the page goes back to 1
    pub async fn set_search_query(&self, text: impl Into<String>) -> FetchHandle {
        let text = text.into();
        self.update_and_dispatch(move |state| {
            state.search_query = text;
            state.page = 1;
        })
        .await
    }

    /// Change the advanced filter; the page goes back to 1
    pub async fn set_filters(&self, filters: ListingFilter) -> FetchHandle {
        self.update_and_dispatch(move |state| {
            state.filters = filters;
            state.page = 1;
        })
        .await
    }

    /// Show a single listing by id, bypassing paging and filters
    pub async fn select_by_id(&self, id: i64) -> FetchHandle {
        self.update_and_dispatch(move |state| state.car_selected_by_id = id)
            .await
    }

    /// Leave the deep-linked view and return to the regular browse
    pub async fn clear_selection(&self) -> FetchHandle {
        self.update_and_dispatch(|state| state.car_selected_by_id = 0)
            .await
    }

    /// Re-run the current query, e.g. after a listing was created or deleted
    pub async fn refresh(&self) -> FetchHandle {
        self.update_and_dispatch(|_| {}).await
    }

    /// Abort the in-flight fetch; its result, if any, is dropped
    pub async fn cancel(&self) {
        let mut inner = self.inner.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = inner.in_flight.take() {
            handle.abort();
        }
        inner.state.loading = false;
    }

    // =========================================================================
    // Detail sheet
    // =========================================================================

    pub async fn open_detail(&self, listing: Listing) {
        let mut inner = self.inner.write().await;
        inner.state.car_selected = Some(listing);
        inner.state.open_sheet = true;
    }

    pub async fn close_detail(&self) {
        let mut inner = self.inner.write().await;
        inner.state.car_selected = None;
        inner.state.open_sheet = false;
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Load the lookup lists once per browser
    pub async fn load_catalog(&self) -> Result<Arc<Catalog>, AppError> {
        let catalog = self
            .catalog
            .get_or_try_init(|| self.source.load_catalog())
            .await?
            .clone();

        self.inner.write().await.state.catalog = Some(catalog.clone());
        Ok(catalog)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    async fn update_and_dispatch<F>(&self, update: F) -> FetchHandle
    where
        F: FnOnce(&mut BrowseState),
    {
        let mut inner = self.inner.write().await;
        update(&mut inner.state);

        let request = derive_request(
            inner.state.car_selected_by_id,
            &inner.state.search_query,
            &inner.state.filters,
            inner.state.page,
            self.viewer,
        );

        // Bumped under the write lock so generations follow state changes.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = inner.in_flight.take() {
            previous.abort();
        }
        inner.state.loading = true;

        tracing::debug!(generation, ?request, "Dispatching listing fetch");

        let source = self.source.clone();
        let shared = self.inner.clone();
        let counter = self.generation.clone();
        let task = tokio::spawn(async move {
            let result = source.fetch(request).await;
            apply(&shared, &counter, generation, result).await
        });

        inner.in_flight = Some(task.abort_handle());
        FetchHandle { generation, task }
    }

    /// Apply a fetch result produced for `generation`
    #[cfg(test)]
    pub(crate) async fn apply_result(
        &self,
        generation: u64,
        result: Result<ListingPage, AppError>,
    ) -> FetchOutcome {
        apply(&self.inner, &self.generation, generation, result).await
    }
}

async fn apply(
    inner: &RwLock<Inner>,
    counter: &AtomicU64,
    generation: u64,
    result: Result<ListingPage, AppError>,
) -> FetchOutcome {
    let mut inner = inner.write().await;

    let latest = counter.load(Ordering::SeqCst);
    if generation != latest {
        STALE_RESPONSES_TOTAL.inc();
        tracing::debug!(generation, latest, "Dropping stale listing response");
        return FetchOutcome::Stale;
    }

    inner.in_flight = None;
    inner.state.loading = false;
    match result {
        Ok(page) => {
            inner.state.items = page.items;
            inner.state.total_pages = page.total_pages;
            inner.state.last_error = None;
            FetchOutcome::Applied
        }
        Err(error) => {
            tracing::warn!(%error, generation, "Listing fetch failed");
            let message = error.user_message("browse");
            inner.state.last_error = Some(message.clone());
            FetchOutcome::Failed(message)
        }
    }
}
