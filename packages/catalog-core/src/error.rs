//! Error taxonomy for the catalog core.
//!
//! Two kinds of failure flow out of this crate:
//!
//! - **Invariant violations** (`InvalidTransition`, `UnknownEntity`,
//!   `MissingSoftware`, `NotLoggedIn`): programming errors in the calling
//!   shell. They are never recovered here, only surfaced.
//! - **Remote failures** (`Api`): whatever the API client port returned,
//!   wrapped unchanged. `anyhow` is the transport for port errors; it never
//!   leaks further than this variant.

use thiserror::Error;

use crate::query::QueryError;

/// Errors surfaced by the catalog use cases and the state machine.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested transition is not legal from the current state.
    #[error("cannot {intent} while the catalog is {from}")]
    InvalidTransition {
        /// Human-readable description of the current state.
        from: &'static str,
        /// What the caller tried to do.
        intent: &'static str,
    },

    /// The operation referenced an id that is not in the catalog.
    #[error("no entity with id {id} in the catalog")]
    UnknownEntity { id: i64 },

    /// A service points at a software id that the software catalog does not
    /// hold. Compiled data guarantees referential integrity, so this is a
    /// programming error, not user input.
    #[error("service {service_id} references software {software_id} which is not in the catalog")]
    MissingSoftware { software_id: i64, service_id: i64 },

    /// A mutation was attempted without an authenticated session.
    #[error("operation requires an authenticated user")]
    NotLoggedIn,

    /// The query string could not be decoded.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The remote API rejected the call. The underlying error is propagated
    /// unchanged for the shell to handle; no retry happens here.
    #[error("api call failed: {0}")]
    Api(#[from] anyhow::Error),
}

impl CatalogError {
    pub(crate) fn invalid_transition(from: &'static str, intent: &'static str) -> Self {
        CatalogError::InvalidTransition { from, intent }
    }
}
