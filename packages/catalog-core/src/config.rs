//! Tunables for the catalog use cases.
//!
//! This core is embedded, so it does not read the environment or any file;
//! the shell that owns configuration sources builds a [`CatalogConfig`] and
//! hands it to each use case at construction.

use std::time::Duration;

/// Page size and debounce windows for one catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// How many items one "load more" reveals, and the initial display count.
    pub page_size: usize,
    /// Settle time after the last keystroke before a search applies.
    pub search_debounce: Duration,
    /// Settle time coalescing repeated "load more" intents (scroll events).
    pub load_more_debounce: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 24,
            search_debounce: Duration::from_millis(750),
            load_more_debounce: Duration::from_millis(50),
        }
    }
}
