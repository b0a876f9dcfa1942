//! An insertion-ordered multi-valued map.
//!
//! Query parameters, cookies and form fields can all repeat. [`MultiMap::get`] returns the
//! latest value for a key, [`MultiMap::get_all`] every value in arrival order.

use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct MultiMap<V = String> {
    entries: Vec<(String, V)>,
}

impl<V> MultiMap<V> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a value, keeping any earlier values for the same key.
    pub fn append(&mut self, key: impl Into<String>, value: V) {
        self.entries.push((key.into(), value));
    }

    /// Replaces every value for `key` with `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, value));
    }

    /// Removes every value for `key`, returning how many were dropped.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before - self.entries.len()
    }

    /// The latest value appended for `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Every value for `key`, oldest first. The values borrow from the map, not from `key`.
    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a V> + use<'a, V> {
        let key = key.to_owned();
        self.entries.iter().filter(move |(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Distinct keys in order of first appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().enumerate().filter_map(|(i, (k, _))| {
            if self.entries[..i].iter().any(|(prev, _)| prev == k) { None } else { Some(k.as_str()) }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for MultiMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for MultiMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for MultiMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for MultiMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries.extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}
