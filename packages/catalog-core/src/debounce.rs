//! Delay-and-coalesce gate for rapid-fire intents.
//!
//! A [`Debouncer`] turns a burst of calls into at most one effective firing:
//! every call opens a fresh delay window, and only the most recent caller's
//! future ever resolves. Superseded futures stay pending forever — there is
//! no explicit cancellation and no queue, the newer timer simply wins.
//!
//! This is the trailing-edge half of a classic debounce. It relies on the
//! cooperative model: a pending wait suspends only its own flow, other
//! intents keep dispatching while the timer runs.

use std::future::pending;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;

/// Coalesces overlapping `wait` calls into one delayed resolution.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Resolve after the configured delay, unless a later call supersedes
    /// this one — in which case this future never resolves.
    pub async fn wait(&self) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.delay).await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            // Superseded. Implicit cancellation: the caller's flow is
            // abandoned when its future is dropped.
            pending::<()>().await;
        }
    }
}

/// Per-use-case debounce context: the two gates plus the previously applied
/// raw query string. Owned by the use case, torn down with it — never a
/// module-level singleton.
#[derive(Debug)]
pub(crate) struct QueryContext {
    pub(crate) prev_query_string: String,
    pub(crate) search: Debouncer,
    pub(crate) load_more: Debouncer,
}

impl QueryContext {
    pub(crate) fn new(search_delay: Duration, load_more_delay: Duration) -> Self {
        Self {
            prev_query_string: String::new(),
            search: Debouncer::new(search_delay),
            load_more: Debouncer::new(load_more_delay),
        }
    }
}
