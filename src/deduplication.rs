//! # Product Deduplication Module
//!
//! The scraper records one row per (product, category) observation, so a product
//! listed under "Toners" and "Serums" appears twice. This module keeps the first
//! observation of every key as the canonical product, remembers which categories
//! each key was seen in, and flags observations whose per-product fields disagree
//! with the first one.

use crate::audit::DataIssue;
use crate::records::{CanonicalProduct, RawProductRecord};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A key observed more than once, for manual review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    /// Product name from the first observation
    pub name: String,
    pub key: String,
    /// Category of every observation, in input order
    pub categories: Vec<String>,
}

/// Tracks the observations of one key
#[derive(Debug, Clone)]
struct KeyEntry {
    /// Position of the canonical product in first-occurrence order
    position: usize,
    /// Number of times this key has been seen
    count: u32,
    categories: Vec<String>,
}

/// Collapses repeated observations of a product key into one canonical product
#[derive(Debug, Default)]
pub struct ProductDeduplicator {
    entries: HashMap<String, KeyEntry>,
    first_records: Vec<RawProductRecord>,
    inconsistencies: Vec<DataIssue>,
}

impl ProductDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key has already been observed
    pub fn is_duplicate(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Record an observation.
    ///
    /// Returns true if this is the first observation of its key. Later
    /// observations only contribute their category; their ingredient text is
    /// never read again, except to check it agrees with the first one.
    pub fn observe(&mut self, record: &RawProductRecord) -> bool {
        if let Some(entry) = self.entries.get_mut(&record.key) {
            entry.count += 1;
            entry.categories.push(record.category.clone());

            let first = &self.first_records[entry.position];
            let fields = first.divergent_fields(record);
            if !fields.is_empty() {
                warn!(
                    key = %record.key,
                    first_category = %first.category,
                    category = %record.category,
                    fields = ?fields,
                    "Duplicate product key disagrees with its first observation"
                );
                self.inconsistencies.push(DataIssue::InconsistentDuplicate {
                    key: record.key.clone(),
                    first_category: first.category.clone(),
                    category: record.category.clone(),
                    fields,
                });
            }
            debug!(key = %record.key, count = entry.count, "Skipping repeated product observation");
            return false;
        }

        self.entries.insert(
            record.key.clone(),
            KeyEntry {
                position: self.first_records.len(),
                count: 1,
                categories: vec![record.category.clone()],
            },
        );
        self.first_records.push(record.clone());
        true
    }

    /// Get statistics about the deduplicator
    pub fn stats(&self) -> DeduplicationStats {
        let total_observations = self.entries.values().map(|e| e.count as usize).sum();
        let duplicated_keys = self.entries.values().filter(|e| e.count > 1).count();
        DeduplicationStats {
            total_observations,
            canonical_products: self.first_records.len(),
            duplicated_keys,
            inconsistent_observations: self.inconsistencies.len(),
        }
    }

    /// Consume the deduplicator, producing canonical products in first-occurrence order
    pub fn finish(self) -> DeduplicatedProducts {
        let stats = self.stats();
        let mut duplicates: Vec<(usize, DuplicateEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.count > 1)
            .map(|(key, entry)| {
                (
                    entry.position,
                    DuplicateEntry {
                        name: self.first_records[entry.position].name.clone(),
                        key: key.clone(),
                        categories: entry.categories.clone(),
                    },
                )
            })
            .collect();
        duplicates.sort_by_key(|(position, _)| *position);

        let index = self
            .entries
            .into_iter()
            .map(|(key, entry)| (key, entry.position))
            .collect();
        let products = self.first_records.iter().map(CanonicalProduct::from).collect();

        DeduplicatedProducts {
            products,
            index,
            duplicates: duplicates.into_iter().map(|(_, entry)| entry).collect(),
            inconsistencies: self.inconsistencies,
            stats,
        }
    }
}

/// Statistics about a deduplication pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduplicationStats {
    /// Number of records observed
    pub total_observations: usize,
    /// Number of distinct keys
    pub canonical_products: usize,
    /// Keys observed more than once
    pub duplicated_keys: usize,
    /// Repeated observations that disagreed with the first one
    pub inconsistent_observations: usize,
}

/// Result of deduplicating the scraped table
#[derive(Debug, Clone, Default)]
pub struct DeduplicatedProducts {
    /// One product per key, in first-occurrence order
    pub products: Vec<CanonicalProduct>,
    index: HashMap<String, usize>,
    /// Keys seen more than once, ordered by first occurrence
    pub duplicates: Vec<DuplicateEntry>,
    /// Repeated observations that disagree with the canonical product
    pub inconsistencies: Vec<DataIssue>,
    pub stats: DeduplicationStats,
}

impl DeduplicatedProducts {
    /// Canonical product for a key
    pub fn get(&self, key: &str) -> Option<&CanonicalProduct> {
        self.index.get(key).map(|&position| &self.products[position])
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Deduplicate records in input order
pub fn deduplicate(records: &[RawProductRecord]) -> DeduplicatedProducts {
    let mut deduplicator = ProductDeduplicator::new();
    for record in records {
        deduplicator.observe(record);
    }
    let products = deduplicator.finish();
    let stats = &products.stats;
    info!(
        observations = stats.total_observations,
        canonical_products = stats.canonical_products,
        duplicated_keys = stats.duplicated_keys,
        inconsistent_observations = stats.inconsistent_observations,
        "Deduplicated product observations"
    );
    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::record;

    #[test]
    fn test_deduplication_basic() {
        let mut deduplicator = ProductDeduplicator::new();
        let toner = record("ABC-123", "Toners", Some("Water"));

        // First observation is canonical
        assert!(!deduplicator.is_duplicate("ABC-123"));
        assert!(deduplicator.observe(&toner));

        // Same key again is a duplicate
        assert!(deduplicator.is_duplicate("ABC-123"));
        assert!(!deduplicator.observe(&record("ABC-123", "Serums", Some("Water"))));

        // Different key is new
        assert!(deduplicator.observe(&record("XYZ-9", "Serums", None)));
    }

    #[test]
    fn test_one_canonical_product_per_key_with_report() {
        let records = vec![
            record("ABC-123", "Toners", Some("Water, Glycerin")),
            record("ABC-123", "Serums", Some("Water, Glycerin")),
        ];
        let result = deduplicate(&records);

        assert_eq!(result.len(), 1);
        assert_eq!(result.products[0].category, "Toners");
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].key, "ABC-123");
        assert_eq!(result.duplicates[0].categories, vec!["Toners", "Serums"]);
        assert!(result.inconsistencies.is_empty());
        assert_eq!(result.stats.total_observations, 2);
        assert_eq!(result.stats.duplicated_keys, 1);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let records = vec![
            record("B", "Toners", Some("b-first")),
            record("A", "Toners", Some("a-first")),
            record("B", "Serums", Some("b-second")),
        ];
        let result = deduplicate(&records);

        let keys: Vec<&str> = result.products.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(
            result.get("B").unwrap().raw_ingredients.as_deref(),
            Some("b-first")
        );
    }

    #[test]
    fn test_inconsistent_duplicate_is_flagged() {
        let mut other = record("ABC-123", "Serums", Some("Water"));
        other.name = "Renamed".to_string();
        let records = vec![record("ABC-123", "Toners", Some("Water")), other];
        let result = deduplicate(&records);

        assert_eq!(result.len(), 1);
        assert_eq!(
            result.inconsistencies,
            vec![DataIssue::InconsistentDuplicate {
                key: "ABC-123".to_string(),
                first_category: "Toners".to_string(),
                category: "Serums".to_string(),
                fields: vec!["name"],
            }]
        );
    }

    #[test]
    fn test_statistics() {
        let mut deduplicator = ProductDeduplicator::new();
        let stats = deduplicator.stats();
        assert_eq!(stats.total_observations, 0);
        assert_eq!(stats.canonical_products, 0);

        deduplicator.observe(&record("A", "Toners", None));
        deduplicator.observe(&record("A", "Serums", None));
        deduplicator.observe(&record("B", "Serums", None));

        let stats = deduplicator.stats();
        assert_eq!(stats.total_observations, 3);
        assert_eq!(stats.canonical_products, 2);
        assert_eq!(stats.duplicated_keys, 1);
    }

    #[test]
    fn test_duplicates_ordered_by_first_occurrence() {
        let records = vec![
            record("Z", "Toners", None),
            record("A", "Toners", None),
            record("A", "Serums", None),
            record("Z", "Masks", None),
        ];
        let result = deduplicate(&records);
        let keys: Vec<&str> = result.duplicates.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["Z", "A"]);
    }
}
