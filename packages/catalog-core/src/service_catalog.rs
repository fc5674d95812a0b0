//! Service catalog use case.
//!
//! Owns the `CatalogState<Service>` machine for the public-service
//! directory. Services are thin records pointing at the software they
//! deploy, so every derived view joins against the sibling
//! [`SoftwareCatalog`]: fetching this catalog drives the sibling's fetch
//! first, and the annotated selectors take the sibling by reference.
//!
//! Same concurrency model as the sibling: single writer, and every
//! operation and item-reading selector drains the service event
//! subscription first; the flag selectors read without draining.

use std::mem;
use std::sync::Arc;

use tracing::debug;

use crate::config::CatalogConfig;
use crate::debounce::QueryContext;
use crate::error::CatalogError;
use crate::events::{ServiceEvent, Subscription};
use crate::memo::Memo;
use crate::ports::{BaseApiClient, BaseAuthClient};
use crate::query::ServiceQuery;
use crate::select::{self, Relevance, SerializedSize};
use crate::software_catalog::SoftwareCatalog;
use crate::state::CatalogState;
use crate::types::{Service, ServiceWithSoftware};

pub struct ServiceCatalog {
    api: Arc<dyn BaseApiClient>,
    auth: Arc<dyn BaseAuthClient>,
    config: CatalogConfig,
    state: CatalogState<Service>,
    ctx: QueryContext,
    updates: Subscription<ServiceEvent>,
    relevance: Box<dyn Relevance<ServiceWithSoftware>>,
    annotated_memo: Memo<Vec<ServiceWithSoftware>>,
    filtered_memo: Memo<Vec<ServiceWithSoftware>>,
    names_memo: Memo<Vec<String>>,
}

impl ServiceCatalog {
    pub fn new(
        api: Arc<dyn BaseApiClient>,
        auth: Arc<dyn BaseAuthClient>,
        updates: Subscription<ServiceEvent>,
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
            annotated_memo: Memo::default(),
            filtered_memo: Memo::default(),
            names_memo: Memo::default(),
        }
    }

    /// Swap the result-ordering strategy.
    pub fn with_relevance(
        mut self,
        relevance: impl Relevance<ServiceWithSoftware> + 'static,
    ) -> Self {
        self.relevance = Box::new(relevance);
        self
    }

    fn absorb_events(&mut self) {
        for event in self.updates.drain() {
            match event {
                ServiceEvent::AddedOrUpdated(service) => self.state.upserted(service),
            }
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Run the initial fetch, driving the software catalog's fetch first so
    /// the join target is ready by the time anything is derived. A no-op once
    /// `Ready` or while a fetch is already in flight.
    pub async fn fetch(
        &mut self,
        software_catalog: &mut SoftwareCatalog,
    ) -> Result<(), CatalogError> {
        self.absorb_events();
        if self.state.is_ready() || self.state.is_fetching() {
            return Ok(());
        }
        self.state.fetch_started()?;
        if let Err(error) = software_catalog.fetch().await {
            self.state.fetch_aborted();
            return Err(error);
        }
        match self.api.get_compiled_data().await {
            Ok(data) => self.state.fetched(data.services, self.config.page_size),
            Err(error) => {
                self.state.fetch_aborted();
                Err(CatalogError::Api(error))
            }
        }
    }

    /// Apply a new raw query string from the URL.
    ///
    /// Same rules as the sibling catalog: a facet change (here, the deployed
    /// software's name) applies immediately, typed free text is debounced,
    /// pasted or restored text applies immediately, and free text below
    /// three characters is ignored.
    pub async fn set_query_string(&mut self, query_string: &str) -> Result<(), CatalogError> {
        self.absorb_events();

        let prev_raw = mem::replace(&mut self.ctx.prev_query_string, query_string.to_owned());
        let prev = ServiceQuery::parse(&prev_raw)?;
        let next = ServiceQuery::parse(query_string)?;

        if prev.software_name != next.software_name {
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

        debug!(query_string, "service query applied");
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

    /// Delete a service the current user administers, with a free-text
    /// reason forwarded to the API. Requires an authenticated session and a
    /// service known to the catalog.
    pub async fn delete_service(
        &mut self,
        service_id: i64,
        reason: &str,
    ) -> Result<(), CatalogError> {
        self.absorb_events();
        if !self.auth.is_user_logged_in() {
            return Err(CatalogError::NotLoggedIn);
        }
        // Fail on an unknown id before going remote.
        self.state.item_patched(service_id, |_| {})?;

        self.state.processing_started()?;
        if let Err(error) = self.api.delete_service(service_id, reason).await {
            self.state.processing_finished();
            return Err(CatalogError::Api(error));
        }
        self.state.removed(service_id)
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
    pub fn services(&mut self) -> Option<&[Service]> {
        self.absorb_events();
        self.state.ready().map(|view| view.items)
    }

    /// Every service joined with its deployed software. `None` until both
    /// catalogs are `Ready`; a dangling software reference is an error.
    pub fn services_with_software(
        &mut self,
        software_catalog: &SoftwareCatalog,
    ) -> Result<Option<Vec<ServiceWithSoftware>>, CatalogError> {
        self.absorb_events();
        let Some(view) = self.state.ready() else {
            return Ok(None);
        };
        let Some(softwares) = software_catalog.items() else {
            return Ok(None);
        };
        let annotated = self
            .annotated_memo
            .try_get_or_compute(&(view.items, softwares), || {
                select::services_with_software(view.items, softwares)
            })?;
        Ok(Some(annotated))
    }

    /// The visible, ordered, filtered subset for the current query.
    pub fn visible_services(
        &mut self,
        software_catalog: &SoftwareCatalog,
    ) -> Result<Option<Vec<ServiceWithSoftware>>, CatalogError> {
        let Some(annotated) = self.services_with_software(software_catalog)? else {
            return Ok(None);
        };
        let view = match self.state.ready() {
            Some(view) => view,
            None => return Ok(None),
        };
        let query = ServiceQuery::parse(view.query_string)?;
        // Keyed on the annotated list so software-side changes invalidate too.
        let filtered = self.filtered_memo.get_or_compute(
            &(&annotated, view.query_string, view.display_count),
            || select::filtered_services(&annotated, &query, view.display_count, self.relevance.as_ref()),
        );
        Ok(Some(filtered))
    }

    /// Query-sensitive match count: matches when a query is active, total
    /// catalog size otherwise (never the page size).
    pub fn search_result_count(
        &mut self,
        software_catalog: &SoftwareCatalog,
    ) -> Result<Option<usize>, CatalogError> {
        self.absorb_events();
        let total = match self.state.ready() {
            Some(view) => view.items.len(),
            None => return Ok(None),
        };
        if self.state.query_string().is_empty() {
            return Ok(Some(total));
        }
        Ok(self
            .visible_services(software_catalog)?
            .map(|filtered| filtered.len()))
    }

    /// Distinct deployed-software names across the catalog, most deployed
    /// first. Feeds the facet-filter picker.
    pub fn software_names(
        &mut self,
        software_catalog: &SoftwareCatalog,
    ) -> Result<Option<Vec<String>>, CatalogError> {
        let Some(annotated) = self.services_with_software(software_catalog)? else {
            return Ok(None);
        };
        Ok(Some(
            self.names_memo
                .get_or_compute(&annotated, || select::software_names(&annotated)),
        ))
    }

    /// Services of a given catalog software, insertion order.
    pub fn services_of_software(&mut self, software_id: i64) -> Option<Vec<Service>> {
        self.absorb_events();
        let view = self.state.ready()?;
        Some(
            select::services_by_software_id(view.items)
                .remove(&software_id)
                .unwrap_or_default(),
        )
    }

    /// Number of catalog services deployed per software id.
    pub fn service_count_by_software_id(
        &mut self,
    ) -> Option<std::collections::HashMap<i64, usize>> {
        self.absorb_events();
        let view = self.state.ready()?;
        Some(select::service_count_by_software_id(view.items))
    }
}
