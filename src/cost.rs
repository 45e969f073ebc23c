//! Cost accounting hooks (C7, spec.md §4.7 and §9).
//!
//! The original driver reached into a module-level global to bump a running
//! total on every read and write. Spec.md's design note calls that out as a
//! re-architecture target: here the hook is an explicit dependency, injected
//! at construction into [`crate::cache::TransactionalCache`], rather than a
//! singleton the cache reaches out and mutates behind the caller's back.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives byte counts for every read and write the cache performs,
/// including cache hits that never touch the backend — spec.md §4.7 charges
/// for the logical operation, not the I/O.
pub trait CostSink: Send + Sync {
    /// A read returned a key of `key_bytes` and a value of `value_bytes`
    /// (0 if the key was absent).
    fn deduct_read(&self, key_bytes: usize, value_bytes: usize);

    /// A write staged a key of `key_bytes` and a value of `value_bytes`
    /// (0 for a delete).
    fn deduct_write(&self, key_bytes: usize, value_bytes: usize);
}

/// Charges nothing. The default for backends and tests that don't care about
/// cost accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCostSink;

impl CostSink for NullCostSink {
    fn deduct_read(&self, _key_bytes: usize, _value_bytes: usize) {}
    fn deduct_write(&self, _key_bytes: usize, _value_bytes: usize) {}
}

/// Applies the spec's fixed per-byte rates and accumulates a running total,
/// for callers (a transaction executor, typically) that need an actual
/// number to charge against a gas/stamp budget.
#[derive(Debug, Default)]
pub struct MeteredCostSink {
    read_cost_per_byte: u64,
    write_cost_per_byte: u64,
    total: AtomicU64,
}

impl MeteredCostSink {
    /// Builds a sink using the given per-byte rates.
    pub fn new(read_cost_per_byte: u64, write_cost_per_byte: u64) -> Self {
        Self {
            read_cost_per_byte,
            write_cost_per_byte,
            total: AtomicU64::new(0),
        }
    }

    /// The running total charged so far, in abstract cost units.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Resets the running total to zero, e.g. between transactions.
    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
    }
}

impl CostSink for MeteredCostSink {
    fn deduct_read(&self, key_bytes: usize, value_bytes: usize) {
        let charge = (key_bytes as u64 + value_bytes as u64) * self.read_cost_per_byte;
        self.total.fetch_add(charge, Ordering::Relaxed);
    }

    fn deduct_write(&self, key_bytes: usize, value_bytes: usize) {
        let charge = (key_bytes as u64 + value_bytes as u64) * self.write_cost_per_byte;
        self.total.fetch_add(charge, Ordering::Relaxed);
    }
}

/// Records every call it receives, in order. Used by tests that assert on
/// exactly which operations were charged, not just the final total.
#[derive(Debug, Default)]
pub struct RecordingCostSink {
    events: parking_lot::Mutex<Vec<CostEvent>>,
}

/// One recorded call to a [`CostSink`] method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostEvent {
    /// A `deduct_read(key_bytes, value_bytes)` call.
    Read(usize, usize),
    /// A `deduct_write(key_bytes, value_bytes)` call.
    Write(usize, usize),
}

impl RecordingCostSink {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded so far, in call order.
    pub fn events(&self) -> Vec<CostEvent> {
        self.events.lock().clone()
    }
}

impl CostSink for RecordingCostSink {
    fn deduct_read(&self, key_bytes: usize, value_bytes: usize) {
        self.events.lock().push(CostEvent::Read(key_bytes, value_bytes));
    }

    fn deduct_write(&self, key_bytes: usize, value_bytes: usize) {
        self.events.lock().push(CostEvent::Write(key_bytes, value_bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metered_sink_applies_configured_rates() {
        let sink = MeteredCostSink::new(1, 25);
        sink.deduct_read(10, 20);
        assert_eq!(sink.total(), 30);
        sink.deduct_write(10, 20);
        assert_eq!(sink.total(), 30 + 30 * 25);
    }

    #[test]
    fn metered_sink_resets() {
        let sink = MeteredCostSink::new(1, 1);
        sink.deduct_read(5, 5);
        sink.reset();
        assert_eq!(sink.total(), 0);
    }

    #[test]
    fn recording_sink_preserves_call_order() {
        let sink = RecordingCostSink::new();
        sink.deduct_read(1, 2);
        sink.deduct_write(3, 4);
        assert_eq!(sink.events(), vec![CostEvent::Read(1, 2), CostEvent::Write(3, 4)]);
    }

    #[test]
    fn null_sink_does_nothing() {
        let sink = NullCostSink;
        sink.deduct_read(100, 100);
        sink.deduct_write(100, 100);
    }
}
