//! In-memory identity cache.

use eavdb_core::{IdentityCache, ObjectRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    objects: RwLock<HashMap<(i64, String), ObjectRef>>,
    lookups: AtomicUsize,
    hits: AtomicUsize,
}

/// Identity cache backed by a shared map.
///
/// Clones share the same map, so a test can keep one clone and hand
/// another to [`Database::with_cache`](eavdb_core::Database::with_cache).
#[derive(Clone, Default)]
pub struct MemoryIdentityCache {
    inner: Arc<Inner>,
}

impl MemoryIdentityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object under its header's `(id, type name)`.
    pub fn insert(&self, object: ObjectRef) {
        let key = (object.header().id, object.header().type_name.clone());
        self.inner.objects.write().insert(key, object);
    }

    /// Removes an object.
    pub fn remove(&self, id: i64, type_name: &str) -> Option<ObjectRef> {
        self.inner.objects.write().remove(&(id, type_name.to_string()))
    }

    /// Returns the number of cached objects.
    pub fn len(&self) -> usize {
        self.inner.objects.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.objects.read().is_empty()
    }

    /// Returns how many lookups were made.
    pub fn lookups(&self) -> usize {
        self.inner.lookups.load(Ordering::SeqCst)
    }

    /// Returns how many lookups found an object.
    pub fn hits(&self) -> usize {
        self.inner.hits.load(Ordering::SeqCst)
    }
}

impl IdentityCache for MemoryIdentityCache {
    fn lookup(&self, id: i64, type_name: &str) -> Option<ObjectRef> {
        self.inner.lookups.fetch_add(1, Ordering::SeqCst);
        let found = self
            .inner
            .objects
            .read()
            .get(&(id, type_name.to_string()))
            .cloned();
        if found.is_some() {
            self.inner.hits.fetch_add(1, Ordering::SeqCst);
        }
        found
    }
}

impl std::fmt::Debug for MemoryIdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIdentityCache")
            .field("len", &self.len())
            .field("lookups", &self.lookups())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_core::{ObjectHeader, Stamp, StoredObject};

    #[test]
    fn lookup_is_keyed_by_id_and_type() {
        let cache = MemoryIdentityCache::new();
        let header = ObjectHeader::stored(4, "Part", "bolt", Stamp::new(1));
        cache.insert(Arc::new(StoredObject::new(header)));

        assert!(cache.lookup(4, "Part").is_some());
        assert!(cache.lookup(4, "Order").is_none());
        assert_eq!(cache.lookups(), 2);
        assert_eq!(cache.hits(), 1);

        let shared = cache.clone();
        shared.remove(4, "Part");
        assert!(cache.is_empty());
    }
}
