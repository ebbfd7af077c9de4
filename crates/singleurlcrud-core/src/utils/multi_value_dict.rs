//! A dictionary that can hold multiple values per key.
//!
//! Query strings and form bodies may repeat a key, and the order in which
//! keys first appear matters when a URL is rebuilt, so [`MultiValueDict`]
//! keeps keys in first-insertion order.

/// An insertion-ordered map from keys to lists of values.
///
/// [`get`](MultiValueDict::get) returns the **last** value for a key,
/// [`get_first`](MultiValueDict::get_first) the first, and
/// [`get_list`](MultiValueDict::get_list) all of them.
///
/// # Examples
///
/// ```
/// use singleurlcrud_core::utils::MultiValueDict;
///
/// let mut d = MultiValueDict::new();
/// d.append("ids", "1,2");
/// d.append("page", "2");
/// d.append("ids", "3");
///
/// assert_eq!(d.get(&"ids"), Some(&"3"));
/// assert_eq!(d.get_first(&"ids"), Some(&"1,2"));
/// assert_eq!(d.keys().copied().collect::<Vec<_>>(), vec!["ids", "page"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiValueDict<K, V> {
    entries: Vec<(K, Vec<V>)>,
}

impl<K: PartialEq, V> Default for MultiValueDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, V> MultiValueDict<K, V> {
    /// Creates an empty `MultiValueDict`.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Returns the **last** value associated with the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_list(key).and_then(|v| v.last())
    }

    /// Returns the **first** value associated with the key.
    pub fn get_first(&self, key: &K) -> Option<&V> {
        self.get_list(key).and_then(|v| v.first())
    }

    /// Returns all values associated with the key.
    pub fn get_list(&self, key: &K) -> Option<&Vec<V>> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Sets the value for a key, replacing any existing values but keeping
    /// the key's position.
    pub fn set(&mut self, key: K, value: V) {
        match self.position(&key) {
            Some(i) => self.entries[i].1 = vec![value],
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: K, value: V) {
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Removes a key, returning its values.
    pub fn remove(&mut self, key: &K) -> Option<Vec<V>> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the dictionary contains no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the dictionary contains the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Returns an iterator over (key, value-list) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Vec<V>)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K, V> IntoIterator for MultiValueDict<K, V> {
    type Item = (K, Vec<V>);
    type IntoIter = std::vec::IntoIter<(K, Vec<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for MultiValueDict<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut d = Self::new();
        for (k, v) in iter {
            d.append(k, v);
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let d: MultiValueDict<String, String> = MultiValueDict::new();
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn test_append_and_get_returns_last() {
        let mut d = MultiValueDict::new();
        d.append("color", "red");
        d.append("color", "blue");
        assert_eq!(d.get(&"color"), Some(&"blue"));
        assert_eq!(d.get_first(&"color"), Some(&"red"));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_set_keeps_position() {
        let mut d = MultiValueDict::new();
        d.append("a", 1);
        d.append("b", 2);
        d.set("a", 3);
        assert_eq!(d.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(d.get_list(&"a"), Some(&vec![3]));
    }

    #[test]
    fn test_remove() {
        let mut d: MultiValueDict<_, _> = [("o", "edit"), ("page", "2")].into_iter().collect();
        assert_eq!(d.remove(&"o"), Some(vec!["edit"]));
        assert!(!d.contains_key(&"o"));
        assert_eq!(d.remove(&"o"), None);
    }

    #[test]
    fn test_get_missing_key() {
        let d: MultiValueDict<&str, &str> = MultiValueDict::new();
        assert_eq!(d.get(&"nope"), None);
        assert_eq!(d.get_list(&"nope"), None);
    }
}
