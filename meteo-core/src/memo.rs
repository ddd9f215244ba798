use std::{collections::HashMap, hash::Hash};

use parking_lot::Mutex;

/// Keyed cache of lazily built values. Each key is built at most once until
/// [`clear`](Memo::clear); callers get clones of the cached value.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, building it with `init` on first access.
    ///
    /// `init` runs with the cache locked, so concurrent callers for the same key
    /// never build twice. It must not call back into this cache.
    pub fn get_or_insert_with(&self, key: K, init: impl FnOnce() -> V) -> V {
        let mut entries = self.entries.lock();
        entries.entry(key).or_insert_with(init).clone()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Empty the cache and hand back what it held.
    pub fn clear(&self) -> Vec<V> {
        self.entries.lock().drain().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn builds_once_per_key() {
        let memo: Memo<(i32, i32), Arc<String>> = Memo::new();
        let builds = AtomicUsize::new(0);

        let build = |label: &str| {
            builds.fetch_add(1, Ordering::SeqCst);
            Arc::new(label.to_string())
        };

        let a = memo.get_or_insert_with((1, 2), || build("a"));
        let again = memo.get_or_insert_with((1, 2), || build("again"));
        let b = memo.get_or_insert_with((2, 1), || build("b"));

        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(*b, "b");
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn clear_forgets_entries() {
        let memo: Memo<&str, u32> = Memo::new();
        memo.get_or_insert_with("x", || 1);

        assert_eq!(memo.clear(), vec![1]);
        assert!(memo.is_empty());
        assert_eq!(memo.get_or_insert_with("x", || 2), 2);
    }

    #[test]
    fn get_does_not_build() {
        let memo: Memo<&str, u32> = Memo::new();

        assert_eq!(memo.get(&"missing"), None);
        assert!(memo.is_empty());
    }
}
