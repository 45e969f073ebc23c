//! State storage and transactional caching core for a smart-contract
//! execution engine.
//!
//! Three layers, leaf-first:
//!
//! - [`storage`] — a backend abstraction ([`storage::Backend`]) over a
//!   flat, byte-keyed store, with a hierarchical-file implementation
//!   ([`storage::FileBackend`]) and an in-memory one
//!   ([`storage::InMemoryBackend`]).
//! - [`cache`] — [`cache::TransactionalCache`], the read-through,
//!   delta-tracking staging layer in front of any backend.
//! - [`driver`] — [`driver::ContractDriver`], the contract-schema-aware
//!   facade contract code actually calls.
//!
//! [`value`] and [`encoding`] define the closed value type set and its
//! canonical textual wire form; [`key`] composes and parses the flat keys
//! the backend sees; [`cost`] is the injected cost-accounting capability.

pub mod cache;
pub mod config;
pub mod consts;
pub mod cost;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod key;
pub mod storage;
pub mod value;

pub mod prelude {
    pub use crate::cache::TransactionalCache;
    pub use crate::config::Config;
    pub use crate::cost::{CostSink, MeteredCostSink, NullCostSink, RecordingCostSink};
    pub use crate::driver::ContractDriver;
    pub use crate::encoding::{decode, encode};
    pub use crate::error::{EncodeError, KeyShapeError, Result, StateError};
    pub use crate::key::FlatKey;
    pub use crate::storage::{Backend, FileBackend, InMemoryBackend};
    pub use crate::value::{FixedPoint, TimeDelta, Timestamp, Value};
}
