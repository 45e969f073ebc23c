//! Backend store implementations (C3, spec.md §4.3).

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::InMemoryBackend;

use crate::error::Result;

/// Uniform get/set/delete/prefix-scan/flush interface over a byte-keyed,
/// byte-valued store. Both [`InMemoryBackend`] and [`FileBackend`] implement
/// it; [`crate::cache::TransactionalCache`] is written against the trait, not
/// a concrete backend.
///
/// All operations are synchronous. Values passed in and returned are
/// already-encoded text (see [`crate::encoding`]); the backend never
/// interprets them. `set(k, None)` is equivalent to `delete(k)`.
pub trait Backend {
    /// Reads the value stored at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` at `key`, overwriting any existing entry.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Idempotent: deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists keys starting with `prefix`, ascending lexicographic order.
    /// `limit = 0` means unbounded.
    fn iter(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Lists every key, ascending lexicographic order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Removes every entry.
    fn flush(&self) -> Result<()>;
}
