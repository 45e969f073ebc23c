//! Error taxonomy for the storage and caching core.

use std::time::Duration;
use thiserror::Error;

/// A flat key violated one of the shape rules in [`crate::key`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyShapeError {
    /// `contract` or `variable` was empty.
    #[error("contract and variable must be non-empty")]
    EmptyComponent,
    /// `contract` or `variable` contained a reserved separator character.
    #[error("component {0:?} contains a reserved separator")]
    ReservedCharacter(String),
    /// The encoded key exceeded [`crate::consts::MAX_KEY_SIZE`] bytes.
    #[error("encoded key length {0} exceeds the maximum of {1} bytes")]
    KeyTooLong(usize, usize),
    /// More subkeys were supplied than [`crate::consts::MAX_HASH_DIMENSIONS`] allows.
    #[error("key has {0} subkeys, exceeding the maximum of {1}")]
    TooManyDimensions(usize, usize),
    /// The input string had no `.` separator to split `contract` from `variable`.
    #[error("key {0:?} has no contract/variable separator")]
    Malformed(String),
}

/// A [`crate::value::Value`] could not be encoded or decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value's structure fell outside the closed type set describable by
    /// the canonical wire form (practically unreachable for the `Value` enum
    /// itself, but reachable when encoding malformed tagged objects produced
    /// by hand-constructed JSON).
    #[error("value uses a type outside the closed encodable set: {0}")]
    UnsupportedType(String),
    /// The underlying JSON substrate rejected the input.
    #[error("malformed canonical value: {0}")]
    Malformed(String),
    /// A `__fixed__` tagged object did not carry a valid decimal digit string.
    #[error("invalid fixed-point literal: {0:?}")]
    InvalidDecimal(String),
    /// A `__time__`/`__delta__` tagged array had the wrong shape.
    #[error("invalid {0} tuple shape")]
    InvalidTupleShape(&'static str),
    /// A `__bytes__` tagged object did not carry valid hex.
    #[error("invalid hex in byte string: {0}")]
    InvalidHex(String),
}

/// Top-level error type surfaced by the cache, backends, and driver facade.
#[derive(Debug, Error)]
pub enum StateError {
    /// See [`KeyShapeError`].
    #[error("key shape violation: {0}")]
    KeyShape(#[from] KeyShapeError),
    /// See [`EncodeError`].
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// A backend failed to acquire its write lock within the configured timeout.
    #[error("backend lock acquisition timed out after {0:?}")]
    BackendTimeout(Duration),
    /// The underlying store reported an I/O fault.
    #[error("backend I/O error: {0}")]
    BackendIo(#[from] std::io::Error),
    /// `soft_apply` was called with a sequencer tag already present in
    /// `pending_deltas`.
    #[error("duplicate sequencer tag: {0}")]
    DuplicateTag(String),
    /// An indexed-access helper found no value for a key.
    #[error("missing key: {0}")]
    MissingKey(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StateError>;
