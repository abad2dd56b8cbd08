//! # Debounced Catalog Search
//!
//! Last-query-wins search over the product catalog.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Catalog Search                                 │
//! │                                                                     │
//! │  keystroke ──► begin_query() ──► ticket (generation N)              │
//! │                    │                                                │
//! │                    │  < 2 chars: no ticket, results cleared,        │
//! │                    │  any in-flight query orphaned                  │
//! │                    ▼                                                │
//! │  execute(ticket):  sleep 300ms ── still newest? ──► query source    │
//! │                         │                               │           │
//! │                   superseded ◄── newer ticket ──► still newest?     │
//! │                   (dropped)                             │           │
//! │                                                     Applied         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every keystroke takes a fresh generation number; a response is applied
//! only if its ticket is still the newest when it lands. Out-of-order
//! responses can therefore never overwrite newer results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::error::SessionResult;
use optica_core::validation::validate_search_query;
use optica_core::Product;

/// Keystroke settle time before a query is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this (after trimming) do not fire.
pub const MIN_QUERY_LEN: usize = 2;

/// Something that can answer catalog queries: the local database, or a
/// remote catalog service.
pub trait CatalogSource {
    /// Returns candidate products for a query, best matches first.
    fn search(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = SessionResult<Vec<Product>>> + Send;
}

/// A claim on one generation of the search box's contents.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    query: String,
}

impl SearchTicket {
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Outcome of executing a search ticket.
#[derive(Debug)]
pub enum SearchOutcome {
    /// This ticket was still the newest when its results landed; show them.
    Applied(Vec<Product>),
    /// A newer keystroke arrived while this ticket was waiting or in
    /// flight; discard silently.
    Superseded,
}

/// Debounced, generation-counted search over a [`CatalogSource`].
#[derive(Debug)]
pub struct CatalogSearch<S> {
    source: S,
    generation: AtomicU64,
    debounce: Duration,
}

impl<S: CatalogSource> CatalogSearch<S> {
    pub fn new(source: S) -> Self {
        CatalogSearch {
            source,
            generation: AtomicU64::new(0),
            debounce: SEARCH_DEBOUNCE,
        }
    }

    /// Registers a keystroke.
    ///
    /// Returns a ticket to [`execute`](Self::execute) when the query is
    /// long enough to fire. Returns `None` for short or invalid input:
    /// the caller clears its result list, and the bumped generation
    /// orphans any query still in flight (its outcome becomes
    /// `Superseded`).
    pub fn begin_query(&self, raw: &str) -> Option<SearchTicket> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = match validate_search_query(raw) {
            Ok(q) => q,
            Err(_) => return None,
        };

        if query.len() < MIN_QUERY_LEN {
            return None;
        }

        debug!(generation, query = %query, "Search query registered");
        Some(SearchTicket { generation, query })
    }

    /// Waits out the debounce window, then runs the query if the ticket
    /// is still the newest. The generation is re-checked after the
    /// source responds, so a slow response for an old keystroke can
    /// never clobber a newer one.
    pub async fn execute(&self, ticket: SearchTicket) -> SessionResult<SearchOutcome> {
        tokio::time::sleep(self.debounce).await;

        if self.is_superseded(&ticket) {
            debug!(generation = ticket.generation, "Query superseded during debounce");
            return Ok(SearchOutcome::Superseded);
        }

        let products = self.source.search(&ticket.query).await?;

        if self.is_superseded(&ticket) {
            debug!(generation = ticket.generation, "Response superseded in flight");
            return Ok(SearchOutcome::Superseded);
        }

        debug!(
            generation = ticket.generation,
            hits = products.len(),
            "Search results applied"
        );
        Ok(SearchOutcome::Applied(products))
    }

    fn is_superseded(&self, ticket: &SearchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) != ticket.generation
    }

    /// The underlying source, for direct (non-debounced) lookups.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use optica_core::ProductKind;
    use std::sync::Mutex;

    struct RecordingSource {
        served: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSource {
        fn new() -> Self {
            RecordingSource {
                served: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn served(&self) -> Vec<String> {
            self.served.lock().unwrap().clone()
        }
    }

    impl CatalogSource for RecordingSource {
        async fn search(&self, query: &str) -> SessionResult<Vec<Product>> {
            if self.fail {
                return Err(SessionError::Network("connection refused".to_string()));
            }
            self.served.lock().unwrap().push(query.to_string());
            Ok(vec![Product {
                id: "f1".to_string(),
                kind: ProductKind::Frame,
                name: format!("match for {query}"),
                price_cents: 18000,
                stock: Some(3),
                details: None,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_fires_after_debounce() {
        let search = CatalogSearch::new(RecordingSource::new());

        let ticket = search.begin_query("wayfarer").unwrap();
        let outcome = search.execute(ticket).await.unwrap();

        match outcome {
            SearchOutcome::Applied(products) => {
                assert_eq!(products.len(), 1);
                assert_eq!(products[0].name, "match for wayfarer");
            }
            SearchOutcome::Superseded => panic!("sole query must apply"),
        }
        assert_eq!(search.source().served(), vec!["wayfarer".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_keystrokes_only_last_fires() {
        let search = CatalogSearch::new(RecordingSource::new());

        // Three keystrokes inside one settle window
        let t1 = search.begin_query("ra").unwrap();
        let t2 = search.begin_query("ray").unwrap();
        let t3 = search.begin_query("rayb").unwrap();

        assert!(matches!(
            search.execute(t1).await.unwrap(),
            SearchOutcome::Superseded
        ));
        assert!(matches!(
            search.execute(t2).await.unwrap(),
            SearchOutcome::Superseded
        ));
        assert!(matches!(
            search.execute(t3).await.unwrap(),
            SearchOutcome::Applied(_)
        ));

        // The source only ever saw the final query
        assert_eq!(search.source().served(), vec!["rayb".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_clears_and_orphans_in_flight() {
        let search = CatalogSearch::new(RecordingSource::new());

        let ticket = search.begin_query("wayfarer").unwrap();

        // Operator deletes down to one character: no new ticket, and the
        // older query must not apply when it lands
        assert!(search.begin_query("w").is_none());
        assert!(matches!(
            search.execute(ticket).await.unwrap(),
            SearchOutcome::Superseded
        ));
        assert!(search.source().served().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_and_empty_queries_do_not_fire() {
        let search = CatalogSearch::new(RecordingSource::new());

        assert!(search.begin_query("").is_none());
        assert!(search.begin_query("   ").is_none());
        assert!(search.begin_query(" x ").is_none());

        // Trimmed two-character query does fire
        assert!(search.begin_query("  xy  ").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_failure_propagates() {
        let mut source = RecordingSource::new();
        source.fail = true;
        let search = CatalogSearch::new(source);

        let ticket = search.begin_query("wayfarer").unwrap();
        let err = search.execute(ticket).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
    }
}
