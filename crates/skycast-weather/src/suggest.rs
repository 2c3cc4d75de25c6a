//! Debounced location suggestions for a search box.
//!
//! Each call gets a generation number. Only the newest generation may
//! publish to the visible suggestion list, so a slow response to an
//! abandoned query can never replace results for a newer one.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::provider::FetchClient;
use crate::types::GeoSuggestion;

/// Default quiet period before a query is sent
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// Queries shorter than this never reach the provider
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Default)]
struct PendingState {
    generation: u64,
    /// Debounce timer of the newest call
    timer: Option<CancellationToken>,
}

pub struct SearchSuggester {
    client: Arc<FetchClient>,
    delay: Duration,
    state: Mutex<PendingState>,
    visible: watch::Sender<Vec<GeoSuggestion>>,
}

impl SearchSuggester {
    pub fn new(client: Arc<FetchClient>, delay: Duration) -> Self {
        let (visible, _) = watch::channel(Vec::new());
        Self {
            client,
            delay,
            state: Mutex::new(PendingState::default()),
            visible,
        }
    }

    /// Suggestions for `query`, or an empty list if the query is too short,
    /// fails, or is superseded by a later call before its results land.
    pub async fn suggest(&self, query: &str, limit: u32) -> Vec<GeoSuggestion> {
        let query = query.trim();

        if query.chars().count() < MIN_QUERY_CHARS {
            self.cancel();
            return Vec::new();
        }

        let (generation, timer) = {
            let mut state = self.state.lock();
            state.generation += 1;
            let timer = CancellationToken::new();
            if let Some(previous) = state.timer.replace(timer.clone()) {
                previous.cancel();
            }
            (state.generation, timer)
        };

        tokio::select! {
            _ = timer.cancelled() => {
                tracing::trace!("Suggestion query {:?} superseded while waiting", query);
                return Vec::new();
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        let results = self.client.search_geocode(query, limit).await;

        let state = self.state.lock();
        if state.generation != generation {
            tracing::debug!("Discarding stale suggestions for {:?}", query);
            return Vec::new();
        }
        self.visible.send_replace(results.clone());
        results
    }

    /// Suggestions currently shown to the user
    pub fn current(&self) -> Vec<GeoSuggestion> {
        self.visible.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<GeoSuggestion>> {
        self.visible.subscribe()
    }

    /// Abandon any pending query and clear the visible list.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        self.visible.send_replace(Vec::new());
    }
}
