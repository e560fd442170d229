//! In-memory caching utilities.

use std::{
    collections::{hash_map::Entry, HashMap},
    convert::Infallible,
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Mutex},
};

use once_cell::sync::OnceCell;

type Slot<V> = Arc<OnceCell<V>>;

/// An abstraction for generating values and caching them in memory
/// based on hashable keys.
///
/// Cheaply clonable; clones share the same underlying entries.
pub struct MemCache<K, V> {
    /// A map from key to the slot holding its generated value.
    ///
    /// The map lock is held only while looking up or inserting a slot. Generation
    /// happens inside the slot's [`OnceCell`], which serializes generators for
    /// one key without blocking other keys.
    cells: Arc<Mutex<HashMap<Arc<K>, Slot<V>>>>,
}

impl<K, V> Default for MemCache<K, V> {
    fn default() -> Self {
        Self {
            cells: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> Clone for MemCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.clone(),
        }
    }
}

impl<K, V> Debug for MemCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCache").finish_non_exhaustive()
    }
}

impl<K: Hash + Eq, V: Clone> MemCache<K, V> {
    /// Creates a new cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: K) -> (Arc<K>, Slot<V>) {
        let mut cells = self.cells.lock().unwrap();
        match cells.entry(Arc::new(key)) {
            Entry::Occupied(o) => (o.key().clone(), o.get().clone()),
            Entry::Vacant(v) => {
                let key = v.key().clone();
                let slot = v.insert(Arc::new(OnceCell::new())).clone();
                (key, slot)
            }
        }
    }

    /// Ensures that a value corresponding to `key` is generated, using `generate_fn`
    /// to generate it if it has not already been generated.
    ///
    /// If another thread is generating the same key, blocks until it finishes. If
    /// `generate_fn` fails, the error is returned and nothing is stored; a later
    /// call with the same key runs its generator again.
    ///
    /// A failed key leaves no entry behind unless another request is waiting on it.
    ///
    /// `generate_fn` must not request the same key again, directly or indirectly.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache::mem::MemCache;
    ///
    /// let cache = MemCache::new();
    ///
    /// let value: Result<u64, String> = cache.try_generate((5, 6), |(a, b)| Ok(a + b));
    /// assert_eq!(value, Ok(11));
    ///
    /// // Does not call the generator again as the result has been cached.
    /// let value: Result<u64, String> = cache.try_generate((5, 6), |_| Err("not called".into()));
    /// assert_eq!(value, Ok(11));
    /// ```
    pub fn try_generate<E>(
        &self,
        key: K,
        generate_fn: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<V, E> {
        let (key, slot) = self.slot(key);
        if let Some(value) = slot.get() {
            tracing::trace!("cache hit");
            return Ok(value.clone());
        }
        let result = slot.get_or_try_init(|| generate_fn(key.as_ref())).cloned();
        if result.is_err() {
            self.discard_failed(key.as_ref(), slot);
        }
        result
    }

    /// Removes `slot` from the map if it is still the entry for `key`, is empty,
    /// and no other request holds it.
    fn discard_failed(&self, key: &K, slot: Slot<V>) {
        let mut cells = self.cells.lock().unwrap();
        let unused = cells.get(key).is_some_and(|current| {
            // Clones are only handed out under the map lock, so the count is stable here.
            Arc::ptr_eq(current, &slot)
                && current.get().is_none()
                && Arc::strong_count(&slot) == 2
        });
        if unused {
            cells.remove(key);
            tracing::trace!("discarded failed entry");
        }
    }

    /// Ensures that a value corresponding to `key` is generated, using `generate_fn`
    /// to generate it if it has not already been generated.
    ///
    /// The infallible counterpart of [`MemCache::try_generate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cache::mem::MemCache;
    ///
    /// let cache = MemCache::new();
    ///
    /// fn generate_fn(tuple: &(u64, u64)) -> u64 {
    ///     tuple.0 + tuple.1
    /// }
    ///
    /// assert_eq!(cache.generate((5, 6), generate_fn), 11);
    /// assert_eq!(cache.generate((5, 6), |_| 0), 11);
    /// ```
    pub fn generate(&self, key: K, generate_fn: impl FnOnce(&K) -> V) -> V {
        match self.try_generate::<Infallible>(key, |key| Ok(generate_fn(key))) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Returns the value stored for `key`, if it has finished generating.
    pub fn peek(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().unwrap();
        cells.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Returns `true` if a value for `key` has finished generating.
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Removes the entry for `key`, returning its value if one had been generated.
    ///
    /// The next request for `key` runs its generator again. A generation already
    /// in progress completes, but its result is not visible to later requests.
    pub fn evict(&self, key: &K) -> Option<V> {
        let mut cells = self.cells.lock().unwrap();
        cells.remove(key).and_then(|slot| slot.get().cloned())
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.cells.lock().unwrap().clear();
    }

    /// The number of entries that have finished generating.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap();
        cells.values().filter(|slot| slot.get().is_some()).count()
    }

    /// Returns `true` if no entries have finished generating.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of slots in the map, including ones still generating.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.cells.lock().unwrap().len()
    }
}
