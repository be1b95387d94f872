//! Session-scoped cache of fetched API bodies.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::redirect::SessionCache;
use crate::sync::RwLockExt;

/// Cached GET bodies keyed by path and query. Wiped when the session ends.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read_or_recover().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.write_or_recover().insert(key.into(), value);
    }

    /// Drop every entry whose key starts with `prefix`, e.g. a resource base
    /// path after a mutation.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write_or_recover();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write_or_recover().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for QueryCache {
    fn clear(&self) {
        QueryCache::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalidate_prefix_keeps_other_resources() {
        let cache = QueryCache::new();
        cache.insert("/api/landlord?page=1", json!({ "items": [] }));
        cache.insert("/api/landlord/42", json!({ "id": "42" }));
        cache.insert("/api/properties", json!({ "items": [] }));

        assert_eq!(cache.invalidate_prefix("/api/landlord"), 2);
        assert!(cache.get("/api/landlord/42").is_none());
        assert!(cache.get("/api/properties").is_some());
    }

    #[test]
    fn test_session_cache_clear_empties() {
        let cache = QueryCache::new();
        cache.insert("/api/user", json!({ "email": "a@b.c" }));

        SessionCache::clear(&cache);
        assert!(cache.is_empty());
    }
}
