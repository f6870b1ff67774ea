//! Per-cycle registry of citation keys
//!
//! Maps raw source locations to short synthetic keys (`uri_1`, `uri_2`, ...)
//! so the formatting pass never sees a raw URI. Keys are allocated in
//! first-seen order and are never reused or removed; the registry is dropped
//! with the cycle that owns it.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::GroundingReference;

/// Default citation key prefix
pub const DEFAULT_KEY_PREFIX: &str = "uri";

/// Bidirectional source URI <-> citation key mapping for one cycle
#[derive(Debug, Clone)]
pub struct UriRegistry {
    prefix: String,
    /// Allocation order: index `i` holds key number `i + 1`
    entries: Vec<(String, String)>,
    forward: HashMap<String, usize>,
    reverse: HashMap<String, usize>,
}

impl Default for UriRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UriRegistry {
    /// Empty registry with the default `uri` prefix
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    /// Empty registry allocating `<prefix>_<n>` keys
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Vec::new(),
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Return the key for `source_uri`, allocating the next one if unseen
    pub fn register(&mut self, source_uri: &str) -> String {
        if let Some(&idx) = self.forward.get(source_uri) {
            return self.entries[idx].0.clone();
        }

        let idx = self.entries.len();
        let key = format!("{}_{}", self.prefix, idx + 1);
        self.entries.push((key.clone(), source_uri.to_string()));
        self.forward.insert(source_uri.to_string(), idx);
        self.reverse.insert(key.clone(), idx);

        tracing::debug!("Registered {} -> {}", key, source_uri);
        key
    }

    /// Register every reference in order, returning keys parallel to the input
    pub fn register_all(&mut self, references: &[GroundingReference]) -> Vec<String> {
        references
            .iter()
            .map(|r| self.register(r.source_uri()))
            .collect()
    }

    /// Source URI for a key allocated in this cycle
    pub fn resolve(&self, key: &str) -> Result<&str> {
        self.reverse
            .get(key)
            .map(|&idx| self.entries[idx].1.as_str())
            .ok_or_else(|| Error::UnknownCitationKey(key.to_string()))
    }

    /// Key previously allocated for `source_uri`, if any
    pub fn lookup(&self, source_uri: &str) -> Option<&str> {
        self.forward
            .get(source_uri)
            .map(|&idx| self.entries[idx].0.as_str())
    }

    /// `(key, source_uri)` pairs in allocation order
    pub fn export_mapping(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }

    /// Allocated keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every registered source location in `text` with its key
    ///
    /// Longer locations are replaced first so a URI that is a prefix of
    /// another one cannot split it.
    pub fn mask_locations(&self, text: &str) -> String {
        let mut by_length: Vec<&(String, String)> = self.entries.iter().collect();
        by_length.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        by_length
            .into_iter()
            .filter(|(_, uri)| !uri.is_empty())
            .fold(text.to_string(), |masked, (key, uri)| masked.replace(uri.as_str(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_allocates_in_first_seen_order() {
        let mut registry = UriRegistry::new();
        assert_eq!(registry.register("gs://bucket/a.pdf"), "uri_1");
        assert_eq!(registry.register("gs://bucket/b.pdf"), "uri_2");
        assert_eq!(registry.register("gs://bucket/a.pdf"), "uri_1");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_mask_locations_longest_first() {
        let mut registry = UriRegistry::with_prefix("src");
        registry.register("gs://b/doc");
        registry.register("gs://b/doc.pdf");

        let masked = registry.mask_locations("See gs://b/doc.pdf and gs://b/doc, not gs://c/x.");
        assert_eq!(masked, "See src_2 and src_1, not gs://c/x.");
    }

    #[test]
    fn test_resolve_unknown_key() {
        let mut registry = UriRegistry::new();
        registry.register("gs://bucket/a.pdf");

        assert_eq!(registry.resolve("uri_1").unwrap(), "gs://bucket/a.pdf");
        let err = registry.resolve("uri_2").unwrap_err();
        assert!(matches!(err, Error::UnknownCitationKey(ref k) if k == "uri_2"));
    }

    #[test]
    fn test_export_mapping_keeps_allocation_order() {
        let mut registry = UriRegistry::new();
        registry.register("docA");
        registry.register("docB");

        // Lookups in a different order must not affect the export
        registry.resolve("uri_2").unwrap();
        registry.lookup("docA");
        registry.register("docB");

        assert_eq!(
            registry.export_mapping(),
            vec![
                ("uri_1".to_string(), "docA".to_string()),
                ("uri_2".to_string(), "docB".to_string()),
            ]
        );
    }

    #[test]
    fn test_register_all_collapses_duplicates() {
        let references = vec![
            GroundingReference::new("gs://bucket/manual.pdf", 0),
            GroundingReference::new("gs://bucket/guide.pdf", 1),
            GroundingReference::new("gs://bucket/manual.pdf", 2),
        ];
        let mut registry = UriRegistry::new();
        let keys = registry.register_all(&references);

        assert_eq!(keys, vec!["uri_1", "uri_2", "uri_1"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_custom_prefix() {
        let mut registry = UriRegistry::with_prefix("src");
        assert_eq!(registry.register("a"), "src_1");
        assert_eq!(registry.lookup("a"), Some("src_1"));
        assert_eq!(registry.lookup("b"), None);
    }

    proptest! {
        #[test]
        fn prop_register_is_idempotent(uri in ".{1,40}") {
            let mut registry = UriRegistry::new();
            let first = registry.register(&uri);
            let second = registry.register(&uri);
            prop_assert_eq!(first, second);
            prop_assert_eq!(registry.len(), 1);
        }

        #[test]
        fn prop_distinct_uris_get_distinct_keys(
            uris in proptest::collection::hash_set("[a-z:/._0-9]{1,24}", 1..32)
        ) {
            let mut registry = UriRegistry::new();
            let keys: std::collections::HashSet<String> =
                uris.iter().map(|u| registry.register(u)).collect();
            prop_assert_eq!(keys.len(), uris.len());
            for uri in &uris {
                let key = registry.lookup(uri).unwrap().to_string();
                prop_assert_eq!(registry.resolve(&key).unwrap(), uri.as_str());
            }
        }
    }
}
