use std::collections::HashMap;

use crate::domain::{IdentityKey, ProductRecord};

/// Insertion-ordered map from identity key to record.
///
/// Inserts are first-write-wins: a later round may re-extract a card whose
/// fields have not finished rendering, so the earliest successful extraction
/// is kept and any later record under the same key is ignored.
#[derive(Debug, Default)]
pub struct DedupStore {
    index: HashMap<IdentityKey, usize>,
    records: Vec<ProductRecord>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless its identity key is already present.
    ///
    /// Returns `true` if the record was stored.
    pub fn insert(&mut self, record: ProductRecord) -> bool {
        let key = record.identity_key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&ProductRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in the order their keys were first seen.
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, price: &str) -> ProductRecord {
        let mut r = ProductRecord::new(name).unwrap();
        r.current_price = Some(price.to_string());
        r
    }

    #[test]
    fn test_insert_new_key() {
        let mut store = DedupStore::new();
        assert!(store.insert(record("Pepe Jeans Brief", "199")));
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_second_insert_is_noop_first_write_wins() {
        let mut store = DedupStore::new();
        assert!(store.insert(record("Pepe Jeans Brief", "199")));
        assert!(!store.insert(record("Pepe Jeans Brief", "149")));

        assert_eq!(store.len(), 1);
        let key = IdentityKey::Name("pepe jeans brief".into());
        assert_eq!(
            store.get(&key).unwrap().current_price.as_deref(),
            Some("199")
        );
    }

    #[test]
    fn test_blank_rerender_does_not_overwrite() {
        let mut store = DedupStore::new();
        store.insert(record("Pepe Jeans Vest", "349"));

        let blank = ProductRecord::new("Pepe Jeans Vest").unwrap();
        assert!(!store.insert(blank));
        assert_eq!(store.records()[0].current_price.as_deref(), Some("349"));
    }

    #[test]
    fn test_name_key_ignores_case_and_spacing() {
        let mut store = DedupStore::new();
        store.insert(record("Pepe Jeans Vest", "349"));
        assert!(!store.insert(record("pepe  jeans VEST", "300")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_url_key_keeps_same_name_distinct() {
        let mut store = DedupStore::new();
        let mut a = record("Pepe Jeans Trunk", "299");
        a.product_url = Some("https://example.com/prn/1".into());
        let mut b = record("Pepe Jeans Trunk", "299");
        b.product_url = Some("https://example.com/prn/2".into());

        assert!(store.insert(a));
        assert!(store.insert(b));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = DedupStore::new();
        for name in ["Pepe C", "Pepe A", "Pepe B", "Pepe A"] {
            store.insert(record(name, "1"));
        }
        let names: Vec<_> = store.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pepe C", "Pepe A", "Pepe B"]);
    }
}
