//! # catalog-core
//!
//! Client-side engine for a public software and service directory: fetch a
//! compiled catalog once, then search, filter, and paginate it locally.
//!
//! The crate is organized around two use cases, [`SoftwareCatalog`] and
//! [`ServiceCatalog`], each owning a [`CatalogState`] machine. Everything
//! else supports them:
//!
//! - [`ports`] — the API and auth boundaries the shell implements
//! - [`query`] — the URL query-string codec
//! - [`select`] — pure derivations: annotate, order, paginate, filter
//! - [`events`] — typed channels feeding entity updates into the catalogs
//! - [`debounce`] — the supersede-based debouncer behind typed search
//!
//! The use cases are plain owned values: construct them with the ports and
//! a [`CatalogConfig`], hold them mutably in the shell, and call operations
//! on them. There is no global registry and no background task; cross-slice
//! updates arrive through a [`Channel`] subscription drained at every
//! operation.

pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
mod memo;
pub mod ports;
pub mod query;
pub mod select;
pub mod service_catalog;
pub mod software_catalog;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::CatalogConfig;
pub use error::CatalogError;
pub use events::{Channel, ServiceEvent, SoftwareEvent, Subscription};
pub use ports::{BaseApiClient, BaseAuthClient, LogoutRedirect};
pub use query::{QueryError, ServiceQuery, SoftwareQuery};
pub use select::{Relevance, SerializedSize};
pub use service_catalog::ServiceCatalog;
pub use software_catalog::SoftwareCatalog;
pub use state::CatalogState;
pub use types::{
    CompiledData, DeployedSoftware, Entity, Service, ServiceWithSoftware, Software,
};
