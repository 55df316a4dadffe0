use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::registry::Labels;

/// Per-tag image labels, fetched on first use and kept for the lifetime of
/// the cache.
///
/// An image without labels is stored as an empty map so the tag is never
/// fetched again. A failed fetch stores nothing.
#[derive(Debug, Default)]
pub struct LabelCache {
    entries: HashMap<String, Labels>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached labels for `tag`, calling `fetch` only when the tag
    /// has not been seen before.
    pub fn get_or_fetch<F, E>(&mut self, tag: &str, fetch: F) -> Result<&Labels, E>
    where
        F: FnOnce() -> Result<Labels, E>,
    {
        match self.entries.entry(tag.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let labels = fetch()?;
                Ok(entry.insert(labels))
            }
        }
    }

    /// Number of tags fetched so far.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn get(&self, tag: &str) -> Option<&Labels> {
        self.entries.get(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fetches_once_per_tag() {
        let mut cache = LabelCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let got = cache
                .get_or_fetch("v1", || -> Result<Labels, ()> {
                    calls += 1;
                    Ok(labels(&[("revision", "abc")]))
                })
                .unwrap();
            assert_eq!(got.get("revision").map(String::as_str), Some("abc"));
        }

        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_labels_are_cached() {
        let mut cache = LabelCache::new();
        let mut calls = 0;

        for _ in 0..2 {
            let got = cache
                .get_or_fetch("bare", || -> Result<Labels, ()> {
                    calls += 1;
                    Ok(Labels::new())
                })
                .unwrap();
            assert!(got.is_empty());
        }

        assert_eq!(calls, 1);
        assert!(cache.get("bare").is_some());
    }

    #[test]
    fn test_failed_fetch_is_not_cached() {
        let mut cache = LabelCache::new();

        let result = cache.get_or_fetch("v1", || Err("registry unavailable"));
        assert_eq!(result, Err("registry unavailable"));
        assert_eq!(cache.len(), 0);

        let got = cache
            .get_or_fetch("v1", || -> Result<Labels, &str> {
                Ok(labels(&[("revision", "abc")]))
            })
            .unwrap();
        assert_eq!(got.len(), 1);
        assert!(cache.get("v1").is_some());
    }
}
