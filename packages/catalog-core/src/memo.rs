//! One-slot selector cache.
//!
//! The derivation layer is pure, so a selector only needs to recompute when
//! its inputs change. [`Memo`] keys one cached value by a fingerprint of the
//! inputs (structural hash); each use case owns its memo cells, nothing is
//! shared or global. The data sets are small — this is a render-path
//! nicety, not a correctness requirement.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug)]
pub(crate) struct Memo<T> {
    entry: Option<(u64, T)>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

fn fingerprint<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl<T: Clone> Memo<T> {
    /// Return the cached value when the inputs are unchanged, otherwise
    /// recompute and cache.
    pub(crate) fn get_or_compute<K: Hash>(&mut self, key: &K, compute: impl FnOnce() -> T) -> T {
        let fingerprint = fingerprint(key);
        if let Some((cached_key, cached)) = &self.entry {
            if *cached_key == fingerprint {
                return cached.clone();
            }
        }
        let value = compute();
        self.entry = Some((fingerprint, value.clone()));
        value
    }

    /// Fallible variant. Errors are not cached: a failed derivation is an
    /// invariant trip and must resurface on every call.
    pub(crate) fn try_get_or_compute<K: Hash, E>(
        &mut self,
        key: &K,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let fingerprint = fingerprint(key);
        if let Some((cached_key, cached)) = &self.entry {
            if *cached_key == fingerprint {
                return Ok(cached.clone());
            }
        }
        let value = compute()?;
        self.entry = Some((fingerprint, value.clone()));
        Ok(value)
    }
}
