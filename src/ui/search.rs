use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::models::Seller;
use crate::api::SearchBackend;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Seller>,
    /// Query the current `results` were fetched for.
    pub results_query: Option<String>,
    pub loading: bool,
}

struct Inner<B> {
    backend: Arc<B>,
    state: watch::Sender<SearchState>,
    latest: AtomicU64,
}

/// Process-wide seller search state shared by every view.
///
/// Each search is tagged with a sequence number; a response is only applied
/// if no newer search was issued while it was in flight.
pub struct SearchContext<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for SearchContext<B> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<B: SearchBackend> SearchContext<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self { inner: Arc::new(Inner { backend, state, latest: AtomicU64::new(0) }) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn query(&self) -> String {
        self.inner.state.borrow().query.clone()
    }

    pub fn set_query(&self, query: &str) {
        self.inner.state.send_modify(|s| s.query = query.to_string());
    }

    pub fn results(&self) -> Vec<Seller> {
        self.inner.state.borrow().results.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub async fn search_sellers(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let seq = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| s.loading = true);
        log::debug!("[search] #{seq} q={query}");

        let results = match self.inner.backend.search_sellers(query).await {
            Ok(sellers) => sellers,
            Err(e) => {
                log::warn!("[search] #{seq} failed: {e}");
                Vec::new()
            }
        };

        let latest = &self.inner.latest;
        let applied = self.inner.state.send_if_modified(|s| {
            if latest.load(Ordering::SeqCst) != seq {
                return false;
            }
            s.results = results;
            s.results_query = Some(query.to_string());
            s.loading = false;
            true
        });
        if !applied {
            log::debug!("[search] #{seq} superseded, dropping response");
        }
    }
}
