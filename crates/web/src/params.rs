use std::ops::Range;
use std::sync::Arc;

/// A single path parameter matched by a route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Param<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// The ordered path parameters of a request.
///
/// Values are stored in one reusable buffer, so a `Params` that lives across requests stops
/// allocating once it has grown to the largest request it has seen. Keys are shared with the
/// tree that produced them.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(Arc<str>, Range<usize>)>,
    values: String,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), values: String::with_capacity(capacity * 16) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value of the first param named `key`.
    ///
    /// Duplicate names are allowed in a route, only the leftmost one is reachable by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, range)| &self.values[range.clone()])
    }

    /// Like [`get`](Params::get), but a missing param reads as the empty string.
    pub fn by_name(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn by_index(&self, index: usize) -> Option<Param<'_>> {
        self.entries.get(index).map(|(key, range)| Param { key, value: &self.values[range.clone()] })
    }

    pub fn iter(&self) -> impl Iterator<Item = Param<'_>> {
        self.entries.iter().map(|(key, range)| Param { key, value: &self.values[range.clone()] })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.values.clear();
    }

    pub(crate) fn push(&mut self, key: &Arc<str>, value: &str) {
        let start = self.values.len();
        self.values.push_str(value);
        self.entries.push((Arc::clone(key), start..self.values.len()));
    }

    /// Drops every param after the first `len`, used when lookup backtracks.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        self.entries.truncate(len);
        let end = self.entries.last().map_or(0, |(_, range)| range.end);
        self.values.truncate(end);
    }

    /// Grows the backing storage so `capacity` params fit without reallocating.
    pub(crate) fn reserve(&mut self, capacity: usize) {
        self.entries.reserve(capacity.saturating_sub(self.entries.len()));
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = Param<'a>;
    type IntoIter = Box<dyn Iterator<Item = Param<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::{Param, Params};
    use std::sync::Arc;

    fn key(name: &str) -> Arc<str> {
        Arc::from(name)
    }

    #[test]
    fn test_first_match_wins() {
        let mut params = Params::new();
        params.push(&key("id"), "1");
        params.push(&key("name"), "gopher");
        params.push(&key("id"), "2");

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.by_name("name"), "gopher");
        assert_eq!(params.by_name("missing"), "");
        assert_eq!(params.by_index(2), Some(Param { key: "id", value: "2" }));
        assert_eq!(params.by_index(3), None);
    }

    #[test]
    fn test_truncate_drops_values() {
        let mut params = Params::new();
        params.push(&key("a"), "alpha");
        params.push(&key("b"), "beta");
        params.truncate(1);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("b"), None);

        params.push(&key("c"), "gamma");
        assert_eq!(params.iter().map(|p| p.value).collect::<Vec<_>>(), vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut params = Params::new();
        params.push(&key("id"), "42");
        let copy = params.clone();

        params.clear();
        params.push(&key("id"), "7");

        assert_eq!(copy.by_name("id"), "42");
        assert_eq!(params.by_name("id"), "7");
    }

    #[test]
    fn test_buffer_is_reused() {
        let mut params = Params::with_capacity(4);
        params.push(&key("id"), "0123456789");
        let capacity = params.values.capacity();

        params.clear();
        params.push(&key("id"), "9876543210");
        assert_eq!(params.values.capacity(), capacity);
    }
}
