//! Catalog lifecycle state machine.
//!
//! One [`CatalogState`] instance exists per catalog kind (softwares,
//! services). The machine has two phases:
//!
//! ```text
//! NotFetched { is_fetching: false }
//!     │ fetch_started
//!     ▼
//! NotFetched { is_fetching: true }
//!     │ fetched(items)
//!     ▼
//! Ready { items, display_count, is_processing }   (terminal phase)
//! ```
//!
//! `Ready` never reverts to `NotFetched`; the machine lives for the
//! application session. Transitions take `&mut self` — exclusive ownership
//! is the lock: the owning use case is the only writer, and illegal
//! transitions are surfaced as [`CatalogError::InvalidTransition`] instead
//! of being guarded by a runtime mutex.

use std::mem;

use tracing::debug;

use crate::error::CatalogError;
use crate::types::Entity;

/// Per-catalog fetch lifecycle, item list and pagination cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogState<T> {
    NotFetched {
        is_fetching: bool,
        /// Whatever was typed before the data arrived; carried over into
        /// `Ready` so a search set during the splash screen is not lost.
        query_string: String,
    },
    Ready {
        /// Insertion order from the fetch, mutated in place afterwards.
        items: Vec<T>,
        is_processing: bool,
        /// Pagination cursor. Only meaningful while `query_string` is empty.
        display_count: usize,
        query_string: String,
    },
}

impl<T> Default for CatalogState<T> {
    fn default() -> Self {
        CatalogState::NotFetched {
            is_fetching: false,
            query_string: String::new(),
        }
    }
}

/// Read-only view of the `Ready` phase, for the derivation layer.
#[derive(Debug, Clone, Copy)]
pub struct ReadyView<'a, T> {
    pub items: &'a [T],
    pub is_processing: bool,
    pub display_count: usize,
    pub query_string: &'a str,
}

impl<T: Entity> CatalogState<T> {
    fn describe(&self) -> &'static str {
        match self {
            CatalogState::NotFetched { is_fetching: false, .. } => "not fetched",
            CatalogState::NotFetched { is_fetching: true, .. } => "fetching",
            CatalogState::Ready { .. } => "ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CatalogState::Ready { .. })
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, CatalogState::NotFetched { is_fetching: true, .. })
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, CatalogState::Ready { is_processing: true, .. })
    }

    pub fn query_string(&self) -> &str {
        match self {
            CatalogState::NotFetched { query_string, .. } => query_string,
            CatalogState::Ready { query_string, .. } => query_string,
        }
    }

    pub fn ready(&self) -> Option<ReadyView<'_, T>> {
        match self {
            CatalogState::Ready {
                items,
                is_processing,
                display_count,
                query_string,
            } => Some(ReadyView {
                items,
                is_processing: *is_processing,
                display_count: *display_count,
                query_string,
            }),
            CatalogState::NotFetched { .. } => None,
        }
    }

    /// Mark the initial fetch as in flight. A second fetch while one is
    /// pending, or any fetch once `Ready`, is a programming error.
    pub fn fetch_started(&mut self) -> Result<(), CatalogError> {
        match self {
            CatalogState::NotFetched { is_fetching: is_fetching @ false, .. } => {
                *is_fetching = true;
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "start a fetch")),
        }
    }

    /// Roll back `fetch_started` after the remote call was rejected, so the
    /// caller can retry. (The original frontend left the flag stuck; see
    /// DESIGN.md.)
    pub fn fetch_aborted(&mut self) {
        if let CatalogState::NotFetched { is_fetching, .. } = self {
            *is_fetching = false;
        }
    }

    /// Enter `Ready` with the fetched items, preserving the query string.
    pub fn fetched(&mut self, items: Vec<T>, page_size: usize) -> Result<(), CatalogError> {
        match self {
            CatalogState::NotFetched { is_fetching: true, query_string } => {
                debug!(count = items.len(), "catalog fetched");
                let query_string = mem::take(query_string);
                *self = CatalogState::Ready {
                    items,
                    is_processing: false,
                    display_count: page_size,
                    query_string,
                };
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "complete a fetch")),
        }
    }

    /// Replace the query string. Clearing it resets the pagination cursor.
    pub fn query_string_set(&mut self, new_query_string: &str, page_size: usize) {
        match self {
            CatalogState::NotFetched { query_string, .. } => {
                new_query_string.clone_into(query_string);
            }
            CatalogState::Ready {
                query_string,
                display_count,
                ..
            } => {
                new_query_string.clone_into(query_string);
                if new_query_string.is_empty() {
                    *display_count = page_size;
                }
            }
        }
    }

    /// Reveal one more page.
    pub fn more_loaded(&mut self, page_size: usize) -> Result<(), CatalogError> {
        match self {
            CatalogState::Ready { display_count, .. } => {
                *display_count += page_size;
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "load more")),
        }
    }

    /// Flag a mutation as in flight, making it observable to the UI.
    pub fn processing_started(&mut self) -> Result<(), CatalogError> {
        match self {
            CatalogState::Ready { is_processing, .. } => {
                *is_processing = true;
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "start processing")),
        }
    }

    /// Clear the processing flag. Forgiving on purpose: it is also the
    /// failure-recovery path, so it must be callable from any state.
    pub fn processing_finished(&mut self) {
        if let CatalogState::Ready { is_processing, .. } = self {
            *is_processing = false;
        }
    }

    /// Replace the entity with the same id, or append it. Ignored while
    /// `NotFetched`: the upcoming fetch will include the entity anyway.
    pub fn upserted(&mut self, item: T) {
        match self {
            CatalogState::NotFetched { .. } => {
                debug!(id = item.id(), "upsert ignored, catalog not fetched");
            }
            CatalogState::Ready { items, .. } => {
                match items.iter_mut().find(|existing| existing.id() == item.id()) {
                    Some(existing) => *existing = item,
                    None => items.push(item),
                }
            }
        }
    }

    /// Patch one entity's mutable fields in place, keyed by id.
    pub fn item_patched(
        &mut self,
        id: i64,
        patch: impl FnOnce(&mut T),
    ) -> Result<(), CatalogError> {
        match self {
            CatalogState::Ready { items, .. } => {
                let item = items
                    .iter_mut()
                    .find(|item| item.id() == id)
                    .ok_or(CatalogError::UnknownEntity { id })?;
                patch(item);
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "patch an entity")),
        }
    }

    /// Remove the entity and clear the processing flag that the pending
    /// mutation had set.
    pub fn removed(&mut self, id: i64) -> Result<(), CatalogError> {
        match self {
            CatalogState::Ready {
                items,
                is_processing,
                ..
            } => {
                let index = items
                    .iter()
                    .position(|item| item.id() == id)
                    .ok_or(CatalogError::UnknownEntity { id })?;
                items.remove(index);
                *is_processing = false;
                Ok(())
            }
            other => Err(CatalogError::invalid_transition(other.describe(), "remove an entity")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        label: String,
    }

    impl Entity for Row {
        fn id(&self) -> i64 {
            self.id
        }
    }

    fn row(id: i64, label: &str) -> Row {
        Row {
            id,
            label: label.to_owned(),
        }
    }

    fn ready_with(count: i64) -> CatalogState<Row> {
        let mut state = CatalogState::default();
        state.fetch_started().unwrap();
        state
            .fetched((1..=count).map(|i| row(i, "r")).collect(), 24)
            .unwrap();
        state
    }

    #[test]
    fn test_fetch_lifecycle() {
        let mut state: CatalogState<Row> = CatalogState::default();
        assert!(!state.is_ready());

        state.fetch_started().unwrap();
        assert!(state.is_fetching());

        state.fetched(vec![row(1, "a")], 24).unwrap();
        let view = state.ready().unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.display_count, 24);
        assert!(!view.is_processing);
    }

    #[test]
    fn test_double_fetch_is_an_invalid_transition() {
        let mut state: CatalogState<Row> = CatalogState::default();
        state.fetch_started().unwrap();
        assert!(matches!(
            state.fetch_started(),
            Err(CatalogError::InvalidTransition { .. })
        ));

        let mut ready = ready_with(1);
        assert!(ready.fetch_started().is_err());
    }

    #[test]
    fn test_query_string_survives_the_fetch_transition() {
        let mut state: CatalogState<Row> = CatalogState::default();
        state.query_string_set("typed during splash", 24);
        state.fetch_started().unwrap();
        state.fetched(vec![row(1, "a")], 24).unwrap();
        assert_eq!(state.query_string(), "typed during splash");
    }

    #[test]
    fn test_clearing_the_query_resets_the_display_count() {
        let mut state = ready_with(100);
        state.more_loaded(24).unwrap();
        state.more_loaded(24).unwrap();
        assert_eq!(state.ready().unwrap().display_count, 72);

        state.query_string_set("jitsi", 24);
        assert_eq!(state.ready().unwrap().display_count, 72);

        state.query_string_set("", 24);
        assert_eq!(state.ready().unwrap().display_count, 24);
    }

    #[test]
    fn test_load_more_increases_by_exactly_one_page() {
        let mut state = ready_with(100);
        let mut previous = state.ready().unwrap().display_count;
        for _ in 0..4 {
            state.more_loaded(24).unwrap();
            let current = state.ready().unwrap().display_count;
            assert_eq!(current, previous + 24);
            previous = current;
        }
    }

    #[test]
    fn test_upsert_replaces_by_id_or_appends() {
        let mut state = ready_with(2);
        state.upserted(row(2, "replaced"));
        state.upserted(row(9, "appended"));

        let view = state.ready().unwrap();
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.items[1].label, "replaced");
        assert_eq!(view.items[2].id, 9);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut state = ready_with(2);
        state.upserted(row(9, "new"));
        let once = state.clone();
        state.upserted(row(9, "new"));
        assert_eq!(state, once);
    }

    #[test]
    fn test_upsert_ignored_while_not_fetched() {
        let mut state: CatalogState<Row> = CatalogState::default();
        state.upserted(row(1, "early"));
        assert!(!state.is_ready());
    }

    #[test]
    fn test_removed_drops_entity_and_clears_processing() {
        let mut state = ready_with(10);
        state.processing_started().unwrap();
        state.removed(5).unwrap();

        let view = state.ready().unwrap();
        assert_eq!(view.items.len(), 9);
        assert!(view.items.iter().all(|r| r.id != 5));
        assert!(!view.is_processing);
    }

    #[test]
    fn test_removing_an_unknown_id_is_an_error() {
        let mut state = ready_with(3);
        assert!(matches!(
            state.removed(99),
            Err(CatalogError::UnknownEntity { id: 99 })
        ));
    }

    #[test]
    fn test_item_patched_by_id() {
        let mut state = ready_with(3);
        state
            .item_patched(2, |r| r.label = "patched".to_owned())
            .unwrap();
        assert_eq!(state.ready().unwrap().items[1].label, "patched");
        assert!(state.item_patched(42, |_| {}).is_err());
    }

    #[test]
    fn test_fetch_aborted_allows_retry() {
        let mut state: CatalogState<Row> = CatalogState::default();
        state.fetch_started().unwrap();
        state.fetch_aborted();
        assert!(!state.is_fetching());
        state.fetch_started().unwrap();
    }
}
