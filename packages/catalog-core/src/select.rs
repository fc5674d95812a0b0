//! Pure derivation layer: annotate, order, paginate, filter, aggregate.
//!
//! Every function here is a pure read over `Ready` state plus a parsed
//! query — no mutation, no IO. The use cases wrap these in memo cells so
//! recomputation only happens when the inputs actually change.
//!
//! Pipeline for the visible list:
//! 1. annotate services with their deployed-software facet
//! 2. stable-sort by descending relevance weight
//! 3. paginate (empty query) or evaluate the full list (active query)
//! 4. facet filter, then accent/case-insensitive free-text filter

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::CatalogError;
use crate::query::{ServiceQuery, SoftwareQuery};
use crate::types::{DeployedSoftware, Service, ServiceWithSoftware, Software};

/// Fold a string for matching: NFD-decompose, drop combining marks,
/// lowercase. `"Café"` and `"cafe"` fold to the same text.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when the folded `haystack` contains the folded `needle`.
fn fold_contains(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(needle)
}

/// Ordering strategy for search results.
///
/// The default ranks by serialized size — a proxy for information richness,
/// not semantic relevance. It is deliberately pluggable; swap it out rather
/// than reading business intent into it.
pub trait Relevance<T>: Send + Sync {
    fn weight(&self, item: &T) -> usize;
}

/// Weight = length of the JSON encoding. Deterministic, and stable sorting
/// keeps pagination deterministic for equal weights.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerializedSize;

impl<T: Serialize> Relevance<T> for SerializedSize {
    fn weight(&self, item: &T) -> usize {
        serde_json::to_string(item).map(|json| json.len()).unwrap_or(0)
    }
}

fn sort_by_relevance<T>(items: &mut [T], relevance: &dyn Relevance<T>) {
    // sort_by_cached_key is stable; ties keep insertion order.
    items.sort_by_cached_key(|item| Reverse(relevance.weight(item)));
}

/// Derive the display name of a service from its URL: scheme and `www.`
/// stripped, first path segment only.
fn service_name_from_url(service_url: &str) -> String {
    let host = service_url
        .strip_prefix("https://")
        .or_else(|| service_url.strip_prefix("http://"))
        .unwrap_or(service_url);
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.split('/').next().unwrap_or("").to_owned()
}

/// Join each service with its deployed software, resolved by exact id in
/// the software catalog. A dangling `software_sill_id` violates the
/// compiled-data integrity assumption and is surfaced as an error.
pub fn services_with_software(
    services: &[Service],
    softwares: &[Software],
) -> Result<Vec<ServiceWithSoftware>, CatalogError> {
    services
        .iter()
        .map(|service| {
            let deployed_software = match service.software_sill_id {
                None => DeployedSoftware::NotInSill {
                    software_name: service.software_name.clone(),
                    comptoir_du_libre_id: service.comptoir_du_libre_id,
                },
                Some(software_id) => {
                    let software = softwares
                        .iter()
                        .find(|software| software.id == software_id)
                        .ok_or(CatalogError::MissingSoftware {
                            software_id,
                            service_id: service.id,
                        })?;
                    DeployedSoftware::InSill {
                        software_name: software.name.clone(),
                        logo_url: software.logo_url.clone(),
                    }
                }
            };
            Ok(ServiceWithSoftware {
                service_name: service_name_from_url(&service.service_url),
                deployed_software,
                service: service.clone(),
            })
        })
        .collect()
}

/// The searchable text fields of an annotated service.
fn service_search_fields(service: &ServiceWithSoftware) -> [&str; 13] {
    let s = &service.service;
    [
        &s.agency_name,
        &s.agency_url,
        &s.content_moderation_method,
        &s.description,
        &s.last_update_date,
        &s.public_sector,
        &s.publication_date,
        &service.service_name,
        &s.service_url,
        &s.signup_scope,
        &s.signup_validation_method,
        &s.usage_scope,
        service.deployed_software.software_name(),
    ]
}

/// The searchable text fields of a software.
fn software_search_fields(software: &Software) -> Vec<&str> {
    let mut fields = vec![
        software.name.as_str(),
        software.function.as_str(),
        software.license.as_str(),
    ];
    fields.extend(software.tags.iter().map(String::as_str));
    fields
}

/// The visible subset of the service catalog for the current query.
///
/// With an empty query the first `display_count` items are shown
/// (pagination mode); any active query evaluates the full list — filtering
/// supersedes pagination.
pub fn filtered_services(
    annotated: &[ServiceWithSoftware],
    query: &ServiceQuery,
    display_count: usize,
    relevance: &dyn Relevance<ServiceWithSoftware>,
) -> Vec<ServiceWithSoftware> {
    let mut sorted = annotated.to_vec();
    sort_by_relevance(&mut sorted, relevance);

    let visible = if query.is_empty() {
        display_count.min(sorted.len())
    } else {
        sorted.len()
    };
    sorted.truncate(visible);

    let needle = fold(&query.search);
    sorted
        .into_iter()
        .filter(|service| match &query.software_name {
            None => true,
            Some(name) => service.deployed_software.software_name() == name,
        })
        .filter(|service| {
            needle.is_empty()
                || service_search_fields(service)
                    .iter()
                    .any(|field| fold_contains(field, &needle))
        })
        .collect()
}

/// The visible subset of the software catalog for the current query.
/// Same pagination-vs-filter rule as [`filtered_services`]; the facet
/// filter requires every selected tag to be present.
pub fn filtered_softwares(
    softwares: &[Software],
    query: &SoftwareQuery,
    display_count: usize,
    relevance: &dyn Relevance<Software>,
) -> Vec<Software> {
    let mut sorted = softwares.to_vec();
    sort_by_relevance(&mut sorted, relevance);

    let visible = if query.is_empty() {
        display_count.min(sorted.len())
    } else {
        sorted.len()
    };
    sorted.truncate(visible);

    let needle = fold(&query.search);
    sorted
        .into_iter()
        .filter(|software| query.tags.iter().all(|tag| software.tags.contains(tag)))
        .filter(|software| {
            needle.is_empty()
                || software_search_fields(software)
                    .iter()
                    .any(|field| fold_contains(field, &needle))
        })
        .collect()
}

/// Distinct labels ranked by descending frequency, ties broken by
/// first-seen order (stable sort over insertion order).
fn ranked_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    counts.sort_by_key(|(_, count)| Reverse(*count));
    counts.into_iter().map(|(label, _)| label.to_owned()).collect()
}

/// Deployed-software names across all services, most frequent first.
pub fn software_names(annotated: &[ServiceWithSoftware]) -> Vec<String> {
    ranked_labels(
        annotated
            .iter()
            .map(|service| service.deployed_software.software_name()),
    )
}

/// Tag labels across all softwares, most frequent first.
pub fn tag_labels(softwares: &[Software]) -> Vec<String> {
    ranked_labels(
        softwares
            .iter()
            .flat_map(|software| software.tags.iter().map(String::as_str)),
    )
}

/// Services grouped by their deployed software's catalog id. Services whose
/// software is not in the catalog are not represented.
pub fn services_by_software_id(services: &[Service]) -> HashMap<i64, Vec<Service>> {
    let mut by_id: HashMap<i64, Vec<Service>> = HashMap::new();
    for service in services {
        if let Some(software_id) = service.software_sill_id {
            by_id.entry(software_id).or_default().push(service.clone());
        }
    }
    by_id
}

/// Number of catalog services deployed per software id.
pub fn service_count_by_software_id(services: &[Service]) -> HashMap<i64, usize> {
    services_by_software_id(services)
        .into_iter()
        .map(|(software_id, services)| (software_id, services.len()))
        .collect()
}
