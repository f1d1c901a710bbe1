use indexmap::IndexMap;
use indexmap::map::Entry;

use super::Value;

/// An insertion-ordered mapping whose keys are unique regardless of case.
///
/// Inserting a key that matches an existing one case-insensitively is a no-op: the first
/// occurrence wins and keeps its original spelling.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    // folded key -> (key as first inserted, value)
    entries: IndexMap<String, (String, Value)>,
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `value` under `key` unless an equivalent key is already present.
    ///
    /// Returns whether the entry was inserted.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        match self.entries.entry(fold(&key)) {
            Entry::Occupied(existing) => {
                tracing::trace!(
                    key = %key,
                    kept = %existing.get().0,
                    "dropping mapping key that collides case-insensitively with an earlier key"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert((key, value));
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&fold(key)).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold(key))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter(self.entries.values())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

// Order is part of a mapping's identity, and `IndexMap` equality ignores it.
impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

pub struct Iter<'a>(indexmap::map::Values<'a, String, (String, Value)>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, value)| (key.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a Mapping {
    type Item = (&'a str, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoValues<String, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_key_wins_case_insensitively() {
        let mut mapping = Mapping::new();
        assert!(mapping.insert("Name", Value::from("first")));
        assert!(!mapping.insert("NAME", Value::from("second")));
        assert!(!mapping.insert("name", Value::Null));

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("nAmE"), Some(&Value::from("first")));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["Name"]);
    }

    #[test]
    fn preserves_insertion_order() {
        let mapping: Mapping = [("b", Value::from(1)), ("a", Value::from(2)), ("c", Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!(mapping.contains_key("C"));
    }

    #[test]
    fn equality_depends_on_order_and_spelling() {
        let ab = Mapping::from_iter([("a", Value::from(1)), ("b", Value::from(2))]);
        let ba = Mapping::from_iter([("b", Value::from(2)), ("a", Value::from(1))]);
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());

        let upper = Mapping::from_iter([("A", Value::from(1)), ("b", Value::from(2))]);
        assert_ne!(ab, upper);
    }
}
