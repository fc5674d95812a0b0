//! Collaborator ports consumed by the catalog use cases.
//!
//! These are infrastructure traits only — no business logic. The HTTP/RPC
//! transport, the identity-provider flow and the routing layer live behind
//! them; the core never sees a wire format. Port failures travel as
//! `anyhow::Error` and are wrapped unchanged into
//! [`crate::error::CatalogError::Api`].

use anyhow::Result;
use async_trait::async_trait;

use crate::types::CompiledData;

// =============================================================================
// API client port
// =============================================================================

#[async_trait]
pub trait BaseApiClient: Send + Sync {
    /// Fetch the full compiled catalog data (softwares and services).
    async fn get_compiled_data(&self) -> Result<CompiledData>;

    /// Delete a service, with the reason the agent gave.
    async fn delete_service(&self, service_id: i64, reason: &str) -> Result<()>;

    /// Declare the current user referent for a software.
    async fn declare_user_referent(&self, software_id: i64, is_expert: bool) -> Result<()>;

    /// Withdraw the current user's referent declaration for a software.
    async fn user_no_longer_referent(&self, software_id: i64) -> Result<()>;
}

// =============================================================================
// Auth/session port
// =============================================================================

/// Where the user should land after logging out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutRedirect {
    Home,
    CurrentPage,
}

#[async_trait]
pub trait BaseAuthClient: Send + Sync {
    /// Synchronous session check. Mutation use cases consult this as a
    /// precondition before calling the API — a local assertion, not a
    /// round-trip to the identity provider.
    fn is_user_logged_in(&self) -> bool;

    /// Redirect to the identity provider. Resolves only if the redirect
    /// fails to happen.
    async fn login(&self, current_href_requires_auth: bool) -> Result<()>;

    async fn logout(&self, redirect: LogoutRedirect) -> Result<()>;
}
