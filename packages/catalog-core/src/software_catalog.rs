//! Software catalog use case.
//!
//! Owns the `CatalogState<Software>` machine, the debounce context and the
//! memoized selectors for the software directory: fetch once, then search,
//! filter by tags, paginate, and patch referent counts through the API.
//!
//! Concurrency model: single writer, cooperative. Every public operation
//! and item-reading selector first drains the software event subscription,
//! so an entity added elsewhere is visible before anything is read. The
//! flag selectors skip the drain; upserts never change those flags.

use std::mem;
use std::sync::Arc;

use tracing::debug;

use crate::config::CatalogConfig;
use crate::debounce::QueryContext;
use crate::error::CatalogError;
use crate::events::{SoftwareEvent, Subscription};
use crate::memo::Memo;
use crate::ports::{BaseApiClient, BaseAuthClient};
use crate::query::SoftwareQuery;
use crate::select::{self, Relevance, SerializedSize};
use crate::state::CatalogState;
use crate::types::Software;

pub struct SoftwareCatalog {
    api: Arc<dyn BaseApiClient>,
    auth: Arc<dyn BaseAuthClient>,
    config: CatalogConfig,
    state: CatalogState<Software>,
    ctx: QueryContext,
    updates: Subscription<SoftwareEvent>,
    relevance: Box<dyn Relevance<Software>>,
    filtered_memo: Memo<Vec<Software>>,
    tags_memo: Memo<Vec<String>>,
}

impl SoftwareCatalog {
    pub fn new(
        api: Arc<dyn BaseApiClient>,
        auth: Arc<dyn BaseAuthClient>,
        updates: Subscription<SoftwareEvent>,
        config: CatalogConfig,
    ) -> Self {
        let ctx = QueryContext::new(config.search_debounce, config.load_more_debounce);
        Self {
            api,
            auth,
            config,
            state: CatalogState::default(),
            ctx,
            updates,
            relevance: Box::new(SerializedSize),
            filtered_memo: Memo::default(),
            tags_memo: Memo::default(),
        }
    }

    /// Swap the result-ordering strategy.
    pub fn with_relevance(mut self, relevance: impl Relevance<Software> + 'static) -> Self {
        self.relevance = Box::new(relevance);
        self
    }

    fn absorb_events(&mut self) {
        for event in self.updates.drain() {
            match event {
                SoftwareEvent::AddedOrUpdated(software) => self.state.upserted(software),
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Run the initial fetch. A no-op once `Ready` or while a fetch is
    /// already in flight; a rejected fetch rolls the flag back and
    /// propagates the error for the shell to handle.
    pub async fn fetch(&mut self) -> Result<(), CatalogError> {
        self.absorb_events();
        if self.state.is_ready() || self.state.is_fetching() {
            return Ok(());
        }
        self.state.fetch_started()?;
        match self.api.get_compiled_data().await {
            Ok(data) => self.state.fetched(data.softwares, self.config.page_size),
            Err(error) => {
                self.state.fetch_aborted();
                Err(CatalogError::Api(error))
            }
        }
    }

    /// Apply a new raw query string from the URL.
    ///
    /// A tag-filter change applies immediately. A free-text change is
    /// ignored below three characters, and debounced while the user is
    /// typing — unless the length jumped by more than one character, which
    /// means the text was pasted or restored from the URL and applies
    /// immediately.
    pub async fn set_query_string(&mut self, query_string: &str) -> Result<(), CatalogError> {
        self.absorb_events();

        let prev_raw = mem::replace(&mut self.ctx.prev_query_string, query_string.to_owned());
        let prev = SoftwareQuery::parse(&prev_raw)?;
        let next = SoftwareQuery::parse(query_string)?;

        if prev.tags != next.tags {
            self.state.query_string_set(query_string, self.config.page_size);
            return Ok(());
        }

        if prev.search == next.search {
            return Ok(());
        }

        // At least 3 characters to trigger a search.
        if !query_string.is_empty() && next.search.chars().count() <= 2 {
            return Ok(());
        }

        if next.search.chars().count().abs_diff(prev_raw.chars().count()) <= 1 {
            self.ctx.search.wait().await;
        }

        debug!(query_string, "software query applied");
        self.state.query_string_set(query_string, self.config.page_size);
        Ok(())
    }

    /// Reveal the next page, coalescing bursts of scroll events.
    pub async fn load_more(&mut self) -> Result<(), CatalogError> {
        self.ctx.load_more.wait().await;
        self.absorb_events();
        self.state.more_loaded(self.config.page_size)
    }

    pub fn has_more_to_load(&mut self) -> Result<bool, CatalogError> {
        self.absorb_events();
        let view = self
            .state
            .ready()
            .ok_or(CatalogError::invalid_transition("not fetched", "check for more pages"))?;
        Ok(view.query_string.is_empty() && view.display_count < view.items.len())
    }

    /// Declare the current user referent for a software and patch the local
    /// count. Requires an authenticated session.
    pub async fn declare_referent(
        &mut self,
        software_id: i64,
        is_expert: bool,
    ) -> Result<(), CatalogError> {
        self.referent_mutation(software_id, is_expert, true).await
    }

    /// Withdraw the current user's referent declaration.
    pub async fn revoke_referent(&mut self, software_id: i64) -> Result<(), CatalogError> {
        self.referent_mutation(software_id, false, false).await
    }

    async fn referent_mutation(
        &mut self,
        software_id: i64,
        is_expert: bool,
        declaring: bool,
    ) -> Result<(), CatalogError> {
        self.absorb_events();
        if !self.auth.is_user_logged_in() {
            return Err(CatalogError::NotLoggedIn);
        }
        // Fail on an unknown id before going remote.
        self.state.item_patched(software_id, |_| {})?;

        self.state.processing_started()?;
        let call = if declaring {
            self.api.declare_user_referent(software_id, is_expert).await
        } else {
            self.api.user_no_longer_referent(software_id).await
        };
        if let Err(error) = call {
            self.state.processing_finished();
            return Err(CatalogError::Api(error));
        }

        self.state.item_patched(software_id, |software| {
            if declaring {
                software.referent_count += 1;
            } else {
                software.referent_count = software.referent_count.saturating_sub(1);
            }
        })?;
        self.state.processing_finished();
        Ok(())
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    pub fn query_string(&self) -> &str {
        self.state.query_string()
    }

    pub fn is_fetching(&self) -> bool {
        self.state.is_fetching()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing()
    }

    /// The raw fetched list, insertion order. `None` until `Ready`.
    pub fn softwares(&mut self) -> Option<&[Software]> {
        self.absorb_events();
        self.items()
    }

    /// Non-draining accessor for sibling use cases joining against this
    /// catalog.
    pub(crate) fn items(&self) -> Option<&[Software]> {
        self.state.ready().map(|view| view.items)
    }

    /// The visible, ordered, filtered subset for the current query.
    pub fn visible_softwares(&mut self) -> Result<Option<Vec<Software>>, CatalogError> {
        self.absorb_events();
        let Some(view) = self.state.ready() else {
            return Ok(None);
        };
        let query = SoftwareQuery::parse(view.query_string)?;
        let filtered = self.filtered_memo.get_or_compute(
            &(view.items, view.query_string, view.display_count),
            || select::filtered_softwares(view.items, &query, view.display_count, self.relevance.as_ref()),
        );
        Ok(Some(filtered))
    }

    /// Query-sensitive match count: matches when a query is active, total
    /// catalog size otherwise (never the page size).
    pub fn search_result_count(&mut self) -> Result<Option<usize>, CatalogError> {
        self.absorb_events();
        let total = match self.state.ready() {
            Some(view) => view.items.len(),
            None => return Ok(None),
        };
        if self.state.query_string().is_empty() {
            return Ok(Some(total));
        }
        Ok(self.visible_softwares()?.map(|filtered| filtered.len()))
    }

    /// Distinct tags across the catalog, most used first.
    pub fn tag_labels(&mut self) -> Option<Vec<String>> {
        self.absorb_events();
        let view = self.state.ready()?;
        Some(
            self.tags_memo
                .get_or_compute(&view.items, || select::tag_labels(view.items)),
        )
    }

    /// Comparable softwares of `software_id` that are themselves in the
    /// catalog.
    pub fn alike_softwares(&mut self, software_id: i64) -> Option<Vec<Software>> {
        self.absorb_events();
        let items = self.items()?;
        let software = items.iter().find(|software| software.id == software_id)?;
        Some(
            software
                .alike_software_ids
                .iter()
                .filter_map(|alike_id| items.iter().find(|s| s.id == *alike_id))
                .cloned()
                .collect(),
        )
    }
}
