//! Hierarchical file backend (C4a, spec.md §4.4a).
//!
//! One file per contract, named after the contract, living under the
//! configured root directory. Inside a contract's file, the `variable` name
//! is the top-level group and each subkey nests one group deeper; the `:`
//! subkey separator becomes `/` on disk and back on read. Each terminal
//! group carries a `value` attribute (the encoded text, as bytes) and a
//! `block` attribute (an opaque caller-supplied tag, default
//! [`crate::consts::BLOCK_NUM_DEFAULT`]).
//!
//! Grounded directly in `original_source/contracting/storage/hdf5.py`'s
//! `defaultdict(Lock)` per-file locking and `write_attr`/`_write_attr_to_file`
//! group-creation pattern; the `hdf5` crate is the Rust analogue of that
//! module's `h5py` dependency.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use hdf5::{File as H5File, Group};
use itertools::Itertools;
use parking_lot::Mutex;

use crate::consts::{BLOCK_NUM_DEFAULT, HDF5_GROUP_SEPARATOR, INDEX_SEPARATOR};
use crate::error::{Result, StateError};
use crate::key::FlatKey;
use crate::storage::Backend;

const VALUE_ATTR: &str = "value";
const BLOCK_ATTR: &str = "block";

/// One hierarchical file per contract under `root`, each writer-serialized
/// by its own timeout-bounded mutex.
pub struct FileBackend {
    root: PathBuf,
    lock_timeout: Duration,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileBackend {
    /// Opens (without creating) a backend rooted at `root`, with the given
    /// per-file lock acquisition timeout.
    pub fn new(root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn file_path(&self, contract: &str) -> PathBuf {
        self.root.join(contract)
    }

    fn lock_for(&self, contract: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .expect("lock registry poisoned")
            .entry(contract.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn group_path(variable: &str, subkeys: &[String]) -> String {
        let mut segments = vec![variable.to_string()];
        segments.extend(subkeys.iter().cloned());
        segments.join(&HDF5_GROUP_SEPARATOR.to_string())
    }

    fn open_or_create_group(file: &H5File, path: &str) -> Result<Group> {
        let mut group = file.group("/").map_err(io_err)?;
        for segment in path.split(HDF5_GROUP_SEPARATOR) {
            group = match group.group(segment) {
                Ok(g) => g,
                Err(_) => group.create_group(segment).map_err(io_err)?,
            };
        }
        Ok(group)
    }

    fn open_group(file: &H5File, path: &str) -> Option<Group> {
        let mut group = file.group("/").ok()?;
        for segment in path.split(HDF5_GROUP_SEPARATOR) {
            group = group.group(segment).ok()?;
        }
        Some(group)
    }

    fn read_value_attr(group: &Group) -> Option<String> {
        let attr = group.attr(VALUE_ATTR).ok()?;
        let bytes: Vec<u8> = attr.read_raw::<u8>().ok()?;
        String::from_utf8(bytes).ok()
    }

    fn write_value_attr(group: &Group, value: &str, block: i64) -> Result<()> {
        if group.attr(VALUE_ATTR).is_ok() {
            group.delete_attr(VALUE_ATTR).map_err(io_err)?;
        }
        if group.attr(BLOCK_ATTR).is_ok() {
            group.delete_attr(BLOCK_ATTR).map_err(io_err)?;
        }
        let bytes = value.as_bytes();
        group
            .new_attr::<u8>()
            .shape(bytes.len())
            .create(VALUE_ATTR)
            .map_err(io_err)?
            .write_raw(bytes)
            .map_err(io_err)?;
        group
            .new_attr::<i64>()
            .create(BLOCK_ATTR)
            .map_err(io_err)?
            .write_scalar(&block)
            .map_err(io_err)?;
        Ok(())
    }

    /// Recursively collects every flat key bearing a `value` attribute under
    /// `group`, whose path so far is `prefix_parts`, into `out`.
    fn collect_terminal_keys(group: &Group, contract: &str, path_parts: &[String], out: &mut Vec<String>) {
        if group.attr(VALUE_ATTR).is_ok() {
            if let Some((variable, subkeys)) = path_parts.split_first() {
                if let Ok(key) = FlatKey::make_default(contract, variable, &subkeys.to_vec()) {
                    out.push(key.into_string());
                }
            }
        }
        let Ok(children) = group.member_names() else {
            return;
        };
        for child in children {
            if let Ok(child_group) = group.group(&child) {
                let mut next_path = path_parts.to_vec();
                next_path.push(child);
                Self::collect_terminal_keys(&child_group, contract, &next_path, out);
            }
        }
    }

    fn contract_names(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn io_err(e: hdf5::Error) -> StateError {
    StateError::BackendIo(std::io::Error::other(e.to_string()))
}

impl Backend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let (contract, variable, subkeys) = FlatKey::parse_default(key)?;
        let path = self.file_path(&contract);
        if !path.exists() {
            return Ok(None);
        }
        let Ok(file) = H5File::open(&path) else {
            return Ok(None);
        };
        let group_path = Self::group_path(&variable, &subkeys);
        let Some(group) = Self::open_group(&file, &group_path) else {
            return Ok(None);
        };
        Ok(Self::read_value_attr(&group))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let (contract, variable, subkeys) = FlatKey::parse_default(key)?;
        let lock = self.lock_for(&contract);
        let _guard = lock
            .try_lock_for(self.lock_timeout)
            .ok_or(StateError::BackendTimeout(self.lock_timeout))?;

        std::fs::create_dir_all(&self.root)?;
        let path = self.file_path(&contract);
        let file = H5File::append(&path).map_err(io_err)?;
        let group_path = Self::group_path(&variable, &subkeys);
        let group = Self::open_or_create_group(&file, &group_path)?;
        Self::write_value_attr(&group, value, BLOCK_NUM_DEFAULT)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let (contract, variable, subkeys) = FlatKey::parse_default(key)?;
        let lock = self.lock_for(&contract);
        let _guard = lock
            .try_lock_for(self.lock_timeout)
            .ok_or(StateError::BackendTimeout(self.lock_timeout))?;

        let path = self.file_path(&contract);
        if !path.exists() {
            return Ok(());
        }
        let file = H5File::append(&path).map_err(io_err)?;
        let group_path = Self::group_path(&variable, &subkeys);
        let Some(group) = Self::open_group(&file, &group_path) else {
            return Ok(());
        };
        if group.attr(VALUE_ATTR).is_ok() {
            group.delete_attr(VALUE_ATTR).map_err(io_err)?;
        }
        if group.attr(BLOCK_ATTR).is_ok() {
            group.delete_attr(BLOCK_ATTR).map_err(io_err)?;
        }
        Ok(())
    }

    fn iter(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let contract_prefix = prefix.split(INDEX_SEPARATOR).next().unwrap_or(prefix);
        let mut found = Vec::new();
        for contract in self.contract_names()? {
            if !contract.starts_with(contract_prefix) {
                continue;
            }
            let path = self.file_path(&contract);
            let Ok(file) = H5File::open(&path) else {
                continue;
            };
            let Ok(root_group) = file.group("/") else {
                continue;
            };
            let mut keys = Vec::new();
            Self::collect_terminal_keys(&root_group, &contract, &[], &mut keys);
            found.extend(keys.into_iter().filter(|k| k.starts_with(prefix)));
        }
        let mut found: Vec<String> = found.into_iter().sorted().collect();
        if limit > 0 {
            found.truncate(limit);
        }
        Ok(found)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.iter("", 0)
    }

    fn flush(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

fn path_is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::FlatKey;
    use tempfile::tempdir;

    fn backend() -> (tempfile::TempDir, FileBackend) {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path(), Duration::from_secs(5));
        (dir, backend)
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, backend) = backend();
        let key = FlatKey::make_default("con_a", "balances", &["stu".to_string()]).unwrap();
        backend.set(key.as_str(), "100").unwrap();
        assert_eq!(backend.get(key.as_str()).unwrap(), Some("100".to_string()));
    }

    #[test]
    fn get_on_missing_file_returns_none() {
        let (_dir, backend) = backend();
        let key = FlatKey::make_default("con_a", "balances", &[]).unwrap();
        assert_eq!(backend.get(key.as_str()).unwrap(), None);
    }

    #[test]
    fn delete_leaves_group_but_removes_attribute() {
        let (_dir, backend) = backend();
        let key = FlatKey::make_default("con_a", "balances", &["stu".to_string()]).unwrap();
        backend.set(key.as_str(), "100").unwrap();
        backend.delete(key.as_str()).unwrap();
        assert_eq!(backend.get(key.as_str()).unwrap(), None);
    }

    #[test]
    fn iter_reassembles_flat_keys_ascending() {
        let (_dir, backend) = backend();
        let k1 = FlatKey::make_default("con_a", "balances", &["bob".to_string()]).unwrap();
        let k2 = FlatKey::make_default("con_a", "balances", &["alice".to_string()]).unwrap();
        backend.set(k1.as_str(), "1").unwrap();
        backend.set(k2.as_str(), "2").unwrap();
        let found = backend.iter("con_a.", 0).unwrap();
        assert_eq!(found, vec![k2.into_string(), k1.into_string()]);
    }

    #[test]
    fn flush_removes_root_directory() {
        let (dir, backend) = backend();
        let key = FlatKey::make_default("con_a", "balances", &[]).unwrap();
        backend.set(key.as_str(), "1").unwrap();
        backend.flush().unwrap();
        assert!(!dir.path().join("con_a").exists());
    }

    #[test]
    fn file_path_stays_within_root() {
        let (_dir, backend) = backend();
        assert!(path_is_within(&backend.root, &backend.file_path("con_a")));
    }
}
