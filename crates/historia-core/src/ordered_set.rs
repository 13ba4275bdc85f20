//! Read-only keyed result set in caller-requested order
//!
//! The store returns rows in no particular order. `OrderedSet` puts the keys
//! the caller asked for first, in the order asked, followed by any other
//! entries in their original order. Requested keys with no entry are left
//! out entirely.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Index;

use crate::storage::error::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct OrderedSet<K, V> {
    entries: Vec<(K, V)>,
    positions: HashMap<K, usize>,
}

impl<K, V> OrderedSet<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Materialize `entries` and reorder them by `order`
    ///
    /// With an empty `order` the original order is kept. Later duplicates of
    /// a key replace earlier ones.
    pub fn new<I, Q>(entries: I, order: &[&Q]) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut pending: Vec<Option<(K, V)>> = Vec::new();
        let mut index: HashMap<K, usize> = HashMap::new();
        for (key, value) in entries {
            let existing = index.get::<K>(&key).copied();
            match existing {
                Some(slot) => pending[slot] = Some((key, value)),
                None => {
                    index.insert(key.clone(), pending.len());
                    pending.push(Some((key, value)));
                }
            }
        }

        let mut ordered = Vec::with_capacity(pending.len());
        for &wanted in order {
            if let Some(&slot) = index.get(wanted) {
                if let Some(entry) = pending[slot].take() {
                    ordered.push(entry);
                }
            }
        }
        // Unrequested entries go at the end
        ordered.extend(pending.into_iter().flatten());

        let positions = ordered
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();

        Self {
            entries: ordered,
            positions,
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.positions.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.positions.contains_key(key)
    }

    /// Always fails: the set is read-only
    pub fn insert(&mut self, _key: K, _value: V) -> StorageResult<()> {
        Err(StorageError::ReadOnly { operation: "set" })
    }

    /// Always fails: the set is read-only
    pub fn remove<Q>(&mut self, _key: &Q) -> StorageResult<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        Err(StorageError::ReadOnly { operation: "unset" })
    }
}

impl<K, V> OrderedSet<K, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K, V> Default for OrderedSet<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<K, V, Q> Index<&Q> for OrderedSet<K, V>
where
    K: Eq + Hash + Clone + Borrow<Q>,
    Q: Eq + Hash + ?Sized,
{
    type Output = V;

    /// Panics if the key is not present, like `HashMap`
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in ordered set")
    }
}

impl<K, V> IntoIterator for OrderedSet<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedSet<K, V> {
    type Item = &'a (K, V);
    type IntoIter = std::slice::Iter<'a, (K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Vec<(String, String)> {
        [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn keys(set: &OrderedSet<String, String>) -> Vec<&str> {
        set.keys().map(String::as_str).collect()
    }

    const NO_ORDER: &[&str] = &[];

    #[test]
    fn test_can_read_elements() {
        let set = OrderedSet::new(sample_data(), NO_ORDER);

        assert_eq!(set["a"], "A");
        assert_eq!(set.get("c").map(String::as_str), Some("C"));
        assert!(set.get("e").is_none());
    }

    #[test]
    fn test_can_check_for_elements() {
        let set = OrderedSet::new(sample_data(), NO_ORDER);

        assert!(set.contains_key("a"));
        assert!(!set.contains_key("e"));
    }

    #[test]
    fn test_count() {
        let set = OrderedSet::new(sample_data(), NO_ORDER);
        assert_eq!(set.len(), 4);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_cannot_set_values() {
        let mut set = OrderedSet::new(sample_data(), NO_ORDER);

        let err = set.insert("e".to_string(), "E".to_string()).unwrap_err();
        assert!(err.is_usage_error());
        assert!(!set.contains_key("e"));
    }

    #[test]
    fn test_cannot_unset_values() {
        let mut set = OrderedSet::new(sample_data(), NO_ORDER);

        let err = set.remove("a").unwrap_err();
        assert!(matches!(err, StorageError::ReadOnly { .. }));
        assert!(set.contains_key("a"));
    }

    #[test]
    fn test_unordered_keeps_original_order() {
        let set = OrderedSet::new(sample_data(), NO_ORDER);
        assert_eq!(keys(&set), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ordered_set() {
        let set = OrderedSet::new(sample_data(), &["b", "c", "a", "d"]);
        assert_eq!(keys(&set), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_incomplete_ordered_set() {
        let set = OrderedSet::new(sample_data(), &["b", "d"]);
        assert_eq!(keys(&set), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_oversized_ordered_set() {
        let set = OrderedSet::new(sample_data(), &["b", "d", "q"]);
        assert_eq!(keys(&set), vec!["b", "d", "a", "c"]);
        assert!(!set.contains_key("q"));
    }

    #[test]
    fn test_repeated_request_is_listed_once() {
        let set = OrderedSet::new(sample_data(), &["c", "c", "a"]);
        assert_eq!(keys(&set), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_into_iter_yields_pairs_in_order() {
        let set = OrderedSet::new(sample_data(), &["d"]);
        let values: Vec<String> = set.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec!["D", "A", "B", "C"]);
    }

    #[test]
    fn test_empty_set() {
        let set: OrderedSet<String, String> = OrderedSet::new(Vec::new(), &["a"]);
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
