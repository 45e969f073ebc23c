//! Contract driver facade (C6, spec.md §4.6): contract-schema-aware
//! operations layered on top of [`crate::cache::TransactionalCache`].

use std::collections::BTreeMap;

use crate::cache::TransactionalCache;
use crate::consts::{CODE_KEY, COMPILED_KEY, DEVELOPER_KEY, OWNER_KEY, TIME_KEY};
use crate::error::Result;
use crate::key::FlatKey;
use crate::storage::Backend;
use crate::value::{Timestamp, Value};

/// Contract-aware operations: compose flat keys via [`crate::key`], delegate
/// to the cache, and own the reserved-metadata-slot conventions
/// (`original_source/contracting/db/driver.py`'s `ContractDriver`).
pub struct ContractDriver<B: Backend> {
    cache: TransactionalCache<B>,
}

impl<B: Backend> ContractDriver<B> {
    /// Wraps a cache with the contract-schema surface.
    pub fn new(cache: TransactionalCache<B>) -> Self {
        Self { cache }
    }

    /// Direct access to the underlying cache, for callers that need
    /// soft/hard-apply or rollback directly.
    pub fn cache(&mut self) -> &mut TransactionalCache<B> {
        &mut self.cache
    }

    /// Reads `contract.variable:subkeys...`.
    pub fn get_var(&mut self, contract: &str, variable: &str, subkeys: &[String], mark: bool) -> Result<Option<Value>> {
        let key = FlatKey::make_default(contract, variable, subkeys)?;
        self.cache.get(key.as_str(), mark)
    }

    /// Writes `contract.variable:subkeys...`.
    pub fn set_var(
        &mut self,
        contract: &str,
        variable: &str,
        subkeys: &[String],
        value: Option<Value>,
        mark: bool,
    ) -> Result<()> {
        let key = FlatKey::make_default(contract, variable, subkeys)?;
        self.cache.set(key.as_str(), value, mark);
        Ok(())
    }

    /// All `(key, value)` pairs visible under `prefix`: cache entries that
    /// are not tombstones, merged with the backend's own `iter(prefix)`
    /// (backend-only keys are fetched through `get`, populating the cache).
    pub fn items(&mut self, prefix: &str) -> Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for k in self.keys(prefix)? {
            if let Some(v) = self.cache.get(&k, false)? {
                out.insert(k, v);
            }
        }
        Ok(out)
    }

    /// The union of every key visible under `prefix`, from the backend and
    /// from cached/pending writes, ascending order. A key only yields a
    /// result if it currently resolves to a present (non-tombstone) value.
    pub fn keys(&mut self, prefix: &str) -> Result<Vec<String>> {
        let mut candidates = self.cache.known_keys_with_prefix(prefix);
        candidates.extend(self.cache.backend().iter(prefix, 0)?);

        let mut out = Vec::new();
        for k in candidates {
            if self.cache.get(&k, false)?.is_some() {
                out.push(k);
            }
        }
        Ok(out)
    }

    /// Projection of [`items`](Self::items) onto just the values, in key order.
    pub fn values(&mut self, prefix: &str) -> Result<Vec<Value>> {
        Ok(self.items(prefix)?.into_values().collect())
    }

    /// Installs a new contract's five reserved slots. Silently no-ops
    /// (returns `Ok(false)`) if the contract already has source code
    /// installed; returns `Ok(true)` on a fresh install.
    pub fn set_contract(
        &mut self,
        name: &str,
        code: &str,
        compiled: Vec<u8>,
        owner: Option<&str>,
        submitted: Timestamp,
        developer: Option<&str>,
    ) -> Result<bool> {
        if self.get_contract(name)?.is_some() {
            return Ok(false);
        }
        self.set_var(name, CODE_KEY, &[], Some(Value::text(code)), true)?;
        self.set_var(name, COMPILED_KEY, &[], Some(Value::Bytes(compiled)), true)?;
        self.set_var(name, OWNER_KEY, &[], owner.map(Value::text), true)?;
        self.set_var(name, TIME_KEY, &[], Some(Value::Timestamp(submitted)), true)?;
        self.set_var(name, DEVELOPER_KEY, &[], developer.map(Value::text), true)?;
        Ok(true)
    }

    /// The contract's source code, or `None` if it has never been installed.
    pub fn get_contract(&mut self, name: &str) -> Result<Option<String>> {
        match self.get_var(name, CODE_KEY, &[], false)? {
            Some(Value::Text(code)) => Ok(Some(code)),
            _ => Ok(None),
        }
    }

    /// The contract's owner, normalizing an empty-string owner to `None`
    /// (`original_source/contracting/db/driver.py`'s `get_owner`).
    pub fn get_owner(&mut self, name: &str) -> Result<Option<String>> {
        match self.get_var(name, OWNER_KEY, &[], false)? {
            Some(Value::Text(owner)) if !owner.is_empty() => Ok(Some(owner)),
            _ => Ok(None),
        }
    }

    /// The contract's submission timestamp, if installed.
    pub fn get_time_submitted(&mut self, name: &str) -> Result<Option<Timestamp>> {
        match self.get_var(name, TIME_KEY, &[], false)? {
            Some(Value::Timestamp(ts)) => Ok(Some(ts)),
            _ => Ok(None),
        }
    }

    /// The contract's compiled bytecode blob, if installed.
    pub fn get_compiled(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.get_var(name, COMPILED_KEY, &[], false)? {
            Some(Value::Bytes(b)) => Ok(Some(b)),
            _ => Ok(None),
        }
    }

    /// Removes every entry with prefix `name + "."` from `cache`,
    /// `pending_writes`, and the backend. Only the enumerated keys are
    /// touched — unlike `delete` + `commit`, this does not flush unrelated
    /// writes staged elsewhere and not yet committed (spec.md §4.6).
    pub fn delete_contract(&mut self, name: &str) -> Result<()> {
        let prefix = format!("{name}.");
        for k in self.keys(&prefix)? {
            self.cache.purge(&k)?;
        }
        Ok(())
    }

    /// `backend.flush()` then `clear_pending_state()`.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.backend().flush()?;
        self.cache.clear_pending_state();
        Ok(())
    }
}
