//! Query string codec for the catalog URL contract.
//!
//! Both catalogs carry their whole query (free text plus facet filter) as a
//! single string in the application URL. The encoding optimizes the common
//! case: an empty query is `""`, a plain search is the text verbatim, and
//! only a query with an active facet filter becomes a structured JSON
//! record (which always starts with `{`, the structured marker).
//!
//! Structured strings are only ever produced by `stringify`, so a malformed
//! structured string means a hand-crafted or corrupted URL; decoding fails
//! with [`QueryError`] rather than guessing.
//!
//! Round-trip law: `parse(stringify(q)) == q` for every `q`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decode failure for a structured query string.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("malformed structured query: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parsed query for the software catalog: free text plus a tag filter.
/// The filter is active when `tags` is non-empty; every selected tag must
/// be present on a software for it to match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SoftwareQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if !raw.starts_with('{') {
            return Ok(Self {
                search: raw.to_owned(),
                tags: Vec::new(),
            });
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn stringify(&self) -> String {
        stringify(&self.search, self.tags.is_empty(), self)
    }

    /// True when neither free text nor a tag filter is active.
    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.tags.is_empty()
    }
}

/// Parsed query for the service catalog: free text plus an exact-match
/// filter on the deployed software's name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_name: Option<String>,
}

impl ServiceQuery {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if !raw.starts_with('{') {
            return Ok(Self {
                search: raw.to_owned(),
                software_name: None,
            });
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn stringify(&self) -> String {
        stringify(&self.search, self.software_name.is_none(), self)
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.software_name.is_none()
    }
}

/// Shared encoding rule. A search that itself starts with the structured
/// marker must be encoded structurally even with no filter, otherwise
/// parsing it back would mistake it for JSON.
fn stringify<Q: Serialize>(search: &str, filter_is_empty: bool, query: &Q) -> String {
    if filter_is_empty && !search.starts_with('{') {
        return search.to_owned();
    }
    serde_json::to_string(query).expect("query serialization is infallible")
}
