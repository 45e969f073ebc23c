//! In-memory backend (C4b, spec.md §4.4b): an ordered map, used by tests and
//! as the backend of choice for anything that doesn't need durability.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::storage::Backend;

/// Backs entries with a `BTreeMap` so `iter`/`keys` walk in ascending
/// lexicographic order for free, matching spec.md §4.4b. No locking beyond
/// the `RwLock` needed to satisfy `&self` methods on a shared reference —
/// this is not a file-level lock and provides no cross-process guarantee.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for InMemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().expect("lock poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    fn iter(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        let matches = entries.range(prefix.to_string()..).take_while(|(k, _)| k.starts_with(prefix));
        let keys: Vec<String> = if limit == 0 {
            matches.map(|(k, _)| k.clone()).collect()
        } else {
            matches.take(limit).map(|(k, _)| k.clone()).collect()
        };
        Ok(keys)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        self.entries.write().expect("lock poisoned").clear();
        Ok(())
    }
}
