//! Configuration surface for the storage and caching core (spec.md §6).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_LOCK_TIMEOUT_SECONDS, DEFAULT_STORAGE_DIRNAME, MAX_HASH_DIMENSIONS, MAX_KEY_SIZE, READ_COST_PER_BYTE,
    WRITE_COST_PER_BYTE,
};

/// Configuration record consumed by the core. The core reads only this
/// struct; no environment variables are consulted implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for the hierarchical file backend.
    pub root_path: PathBuf,
    /// Size hint for backing stores that want one (in-memory or
    /// memory-mapped); advisory only, the core does not enforce it.
    pub map_size: Option<u64>,
    /// File-lock acquisition timeout.
    pub lock_timeout_seconds: u64,
    /// Cost-hook unit rate for reads, in abstract units per byte.
    pub read_cost_per_byte: u64,
    /// Cost-hook unit rate for writes, in abstract units per byte.
    pub write_cost_per_byte: u64,
    /// Maximum subkeys ("hash dimensions") a flat key may carry.
    pub max_hash_dimensions: usize,
    /// Maximum encoded flat key length, in bytes.
    pub max_key_size: usize,
}

impl Config {
    /// The configured lock timeout as a [`Duration`].
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            map_size: None,
            lock_timeout_seconds: DEFAULT_LOCK_TIMEOUT_SECONDS,
            read_cost_per_byte: READ_COST_PER_BYTE,
            write_cost_per_byte: WRITE_COST_PER_BYTE,
            max_hash_dimensions: MAX_HASH_DIMENSIONS,
            max_key_size: MAX_KEY_SIZE,
        }
    }
}

fn default_root_path() -> PathBuf {
    dirs_home().join(".lamden").join(DEFAULT_STORAGE_DIRNAME)
}

/// Resolves the caller's home directory, falling back to the current
/// directory if it cannot be determined (headless/CI environments).
fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.lock_timeout_seconds, 20);
        assert_eq!(cfg.read_cost_per_byte, 1);
        assert_eq!(cfg.write_cost_per_byte, 25);
        assert_eq!(cfg.max_hash_dimensions, 16);
        assert_eq!(cfg.max_key_size, 1024);
    }
}
