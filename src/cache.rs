//! Transactional cache (C5, spec.md §4.5) — the core of the core.
//!
//! Owns four pieces of state: `cache` (read-through, tombstone-aware),
//! `reads` (keys touched since the last clear), `pending_writes` (queued for
//! `commit`), and `pending_deltas` (ordered by sequencer tag, each entry a
//! delta set of `key -> (pre, post)` recorded by one `soft_apply`).
//! `pending_writes` and `pending_deltas` are orthogonal logs serving
//! different callers (plain transaction commit vs. soft/hard-apply staging)
//! and must never be conflated — see spec.md §4.5's key design decision.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::cost::CostSink;
use crate::encoding::{decode, encode};
use crate::error::{Result, StateError};
use crate::storage::Backend;
use crate::value::Value;

/// A cache slot: either a known `Value`, or a tombstone meaning
/// "known-absent" (distinct from `Value::Null`, which is a stored value).
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Value(Value),
    Tombstone,
}

impl Slot {
    fn to_visible(&self) -> Option<Value> {
        match self {
            Slot::Value(v) => Some(v.clone()),
            Slot::Tombstone => None,
        }
    }

    fn from_option(v: Option<Value>) -> Self {
        match v {
            Some(v) => Slot::Value(v),
            None => Slot::Tombstone,
        }
    }
}

/// One delta set: the keys touched by a single `soft_apply`, each mapped to
/// its pre/post value (`None` standing in for "absent").
type DeltaSet = BTreeMap<String, (Option<Value>, Option<Value>)>;

/// The read-through cache and staging layer in front of any [`Backend`].
///
/// Not `Sync`: a cache is owned by one execution context at a time (spec.md
/// §5's single-threaded-per-instance scheduling model). Multiple caches may
/// share one backend if the backend itself is thread-safe.
pub struct TransactionalCache<B: Backend> {
    backend: B,
    cost: Box<dyn CostSink>,
    cache: BTreeMap<String, Slot>,
    reads: HashSet<String>,
    pending_writes: BTreeMap<String, Slot>,
    pending_deltas: BTreeMap<String, DeltaSet>,
}

impl<B: Backend> TransactionalCache<B> {
    /// Builds an empty cache over `backend`, charging reads and writes to `cost`.
    pub fn new(backend: B, cost: Box<dyn CostSink>) -> Self {
        Self {
            backend,
            cost,
            cache: BTreeMap::new(),
            reads: HashSet::new(),
            pending_writes: BTreeMap::new(),
            pending_deltas: BTreeMap::new(),
        }
    }

    /// Shared access to the underlying backend, e.g. for a driver facade
    /// that needs to call `iter`/`flush` directly.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The visible value for `k` per I1: newest delta across `pending_deltas`
    /// in tag order, else `pending_writes`, else `cache`, else the backend,
    /// else `None`. Invokes the cost hook unconditionally, cache hit or not
    /// (spec.md §4.7, §9's original-driver grounding).
    pub fn get(&mut self, k: &str, mark: bool) -> Result<Option<Value>> {
        let visible = self.visible_uncosted(k)?;
        let value_bytes = visible.as_ref().map(|v| encode(v).len()).unwrap_or(0);
        self.cost.deduct_read(k.len(), value_bytes);
        if mark {
            self.reads.insert(k.to_string());
        }
        Ok(visible)
    }

    /// `get` without the cost hook and `reads` bookkeeping, used internally
    /// by `soft_apply` to snapshot the pre-value and by `get` itself.
    fn visible_uncosted(&mut self, k: &str) -> Result<Option<Value>> {
        if let Some((_, post)) = self.latest_delta_for(k) {
            return Ok(post.clone());
        }
        if let Some(slot) = self.pending_writes.get(k) {
            return Ok(slot.to_visible());
        }
        if let Some(slot) = self.cache.get(k) {
            return Ok(slot.to_visible());
        }

        let backend_value = match self.backend.get(k)? {
            Some(text) => Some(decode(&text)),
            None => None,
        };
        self.cache.insert(k.to_string(), Slot::from_option(backend_value.clone()));
        Ok(backend_value)
    }

    /// The `(tag, post)` pair of the newest delta set (by ascending tag
    /// order) that touches `k`, if any.
    fn latest_delta_for(&self, k: &str) -> Option<(&String, &Option<Value>)> {
        self.pending_deltas
            .iter()
            .filter_map(|(tag, deltas)| deltas.get(k).map(|(_, post)| (tag, post)))
            .last()
    }

    /// Writes `v` (coercing binary floats / decimals to canonical fixed-point
    /// first — see [`crate::value::FixedPoint`]) to `cache`, and to
    /// `pending_writes` if `mark`. Invokes the cost hook unconditionally.
    pub fn set(&mut self, k: &str, v: Option<Value>, mark: bool) {
        let value_bytes = v.as_ref().map(|v| encode(v).len()).unwrap_or(0);
        self.cost.deduct_write(k.len(), value_bytes);
        self.cache.insert(k.to_string(), Slot::from_option(v.clone()));
        if mark {
            self.pending_writes.insert(k.to_string(), Slot::from_option(v));
        }
    }

    /// `set(k, None, mark)`.
    pub fn delete(&mut self, k: &str, mark: bool) {
        self.set(k, None, mark);
    }

    /// Records a delta set under `tag`, snapshotting the pre-value of each
    /// touched key before applying its post-value. Fails with
    /// [`StateError::DuplicateTag`] if `tag` is already present.
    pub fn soft_apply(&mut self, tag: &str, changes: BTreeMap<String, Value>) -> Result<()> {
        if self.pending_deltas.contains_key(tag) {
            return Err(StateError::DuplicateTag(tag.to_string()));
        }

        let mut delta_set = DeltaSet::new();
        for (k, new_value) in changes {
            let pre = self.visible_uncosted(&k)?;
            self.set(&k, Some(new_value.clone()), false);
            delta_set.insert(k, (pre, Some(new_value)));
        }
        self.pending_deltas.insert(tag.to_string(), delta_set);
        Ok(())
    }

    /// Durably applies every delta set with tag ≤ `tag`, in strictly
    /// ascending tag order (I4), evicting applied keys from `cache` and
    /// removing the applied delta set. Silently no-ops if `tag` is unknown.
    ///
    /// Best-effort per delta set: if a backend write fails partway, delta
    /// sets already applied stay removed and the failing one (and every
    /// later one) is retained, so a retry resumes at the failure point
    /// (spec.md §7).
    pub fn hard_apply(&mut self, tag: &str) -> Result<()> {
        if !self.pending_deltas.contains_key(tag) {
            return Ok(());
        }

        let ordered_tags: Vec<String> = self.pending_deltas.keys().cloned().collect();
        for t in ordered_tags {
            let delta_set = self.pending_deltas.get(&t).expect("tag came from this map").clone();
            for (k, (_pre, post)) in &delta_set {
                match post {
                    Some(v) => self.backend.set(k, &encode(v))?,
                    None => self.backend.delete(k)?,
                }
                self.cache.remove(k);
            }
            self.pending_deltas.remove(&t);
            debug!(tag = %t, "hard-applied delta set");
            if t == tag {
                break;
            }
        }
        Ok(())
    }

    /// Restores cache entries to the pre-value of the oldest delta touching
    /// each key, walking `pending_deltas` in descending tag order, then
    /// clears `pending_deltas` entirely. `pending_writes` and `reads` are
    /// untouched. Infallible: only in-memory state is involved.
    pub fn rollback(&mut self) {
        for (tag, delta_set) in self.pending_deltas.iter().rev() {
            for (k, (pre, _post)) in delta_set {
                self.cache.insert(k.clone(), Slot::from_option(pre.clone()));
            }
            warn!(tag = %tag, "rolled back delta set");
        }
        self.pending_deltas.clear();
    }

    /// Flushes every entry in `pending_writes` to the backend (tombstones
    /// become deletes). Does not touch `pending_deltas`.
    pub fn commit(&mut self) -> Result<()> {
        for (k, slot) in self.pending_writes.iter() {
            match slot {
                Slot::Value(v) => self.backend.set(k, &encode(v))?,
                Slot::Tombstone => self.backend.delete(k)?,
            }
        }
        self.pending_writes.clear();
        Ok(())
    }

    /// Deletes `k` from the backend directly and evicts it from `cache` and
    /// `pending_writes`, without touching any other staged key. Unlike
    /// `delete` + `commit`, this never flushes unrelated pending writes — it
    /// is the primitive [`crate::driver::ContractDriver::delete_contract`]
    /// uses to remove exactly the keys it enumerated (spec.md §4.6).
    /// `pending_deltas` is untouched.
    pub fn purge(&mut self, k: &str) -> Result<()> {
        self.backend.delete(k)?;
        self.cache.remove(k);
        self.pending_writes.remove(k);
        Ok(())
    }

    /// Empties `cache`, `reads`, and `pending_writes`. Does not touch
    /// `pending_deltas`.
    pub fn clear_pending_state(&mut self) {
        self.cache.clear();
        self.reads.clear();
        self.pending_writes.clear();
    }

    /// The keys read since the last [`clear_pending_state`](Self::clear_pending_state) call.
    pub fn reads(&self) -> &HashSet<String> {
        &self.reads
    }

    /// The sequencer tags currently staged, ascending order.
    pub fn pending_tags(&self) -> Vec<String> {
        self.pending_deltas.keys().cloned().collect()
    }

    /// Every key starting with `prefix` that the cache currently knows
    /// about — from `cache`, `pending_writes`, and `pending_deltas` —
    /// regardless of whether its current slot is a tombstone. Used by
    /// [`crate::driver::ContractDriver`] to merge with the backend's own
    /// prefix scan before resolving each key's visible value.
    pub fn known_keys_with_prefix(&self, prefix: &str) -> std::collections::BTreeSet<String> {
        let mut out = std::collections::BTreeSet::new();
        out.extend(self.cache.keys().filter(|k| k.starts_with(prefix)).cloned());
        out.extend(self.pending_writes.keys().filter(|k| k.starts_with(prefix)).cloned());
        for deltas in self.pending_deltas.values() {
            out.extend(deltas.keys().filter(|k| k.starts_with(prefix)).cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::NullCostSink;
    use crate::storage::InMemoryBackend;

    fn cache() -> TransactionalCache<InMemoryBackend> {
        TransactionalCache::new(InMemoryBackend::new(), Box::new(NullCostSink))
    }

    #[test]
    fn read_through_populates_cache() {
        let mut c = cache();
        c.backend.set("con_a.x", &encode(&Value::int(42))).unwrap();
        assert_eq!(c.get("con_a.x", true).unwrap(), Some(Value::int(42)));
        assert!(c.reads.contains("con_a.x"));
    }

    #[test]
    fn write_is_invisible_without_commit() {
        let mut c = cache();
        c.set("con_a.x", Some(Value::int(1)), true);
        assert_eq!(c.backend.get("con_a.x").unwrap(), None);
    }

    #[test]
    fn commit_makes_write_durable() {
        let mut c = cache();
        c.set("con_a.x", Some(Value::int(1)), true);
        c.commit().unwrap();
        assert_eq!(c.backend.get("con_a.x").unwrap(), Some(encode(&Value::int(1))));
    }

    #[test]
    fn soft_apply_is_visible_immediately() {
        let mut c = cache();
        let mut changes = BTreeMap::new();
        changes.insert("con_a.x".to_string(), Value::int(20));
        c.soft_apply("T1", changes).unwrap();
        assert_eq!(c.get("con_a.x", false).unwrap(), Some(Value::int(20)));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut c = cache();
        let mut changes = BTreeMap::new();
        changes.insert("con_a.x".to_string(), Value::int(1));
        c.soft_apply("T1", changes.clone()).unwrap();
        assert!(matches!(c.soft_apply("T1", changes), Err(StateError::DuplicateTag(_))));
    }

    #[test]
    fn rollback_restores_oldest_pre_value() {
        let mut c = cache();
        c.backend.set("k", &encode(&Value::int(10))).unwrap();

        let mut t1 = BTreeMap::new();
        t1.insert("k".to_string(), Value::int(20));
        c.soft_apply("T1", t1).unwrap();
        assert_eq!(c.get("k", false).unwrap(), Some(Value::int(20)));

        let mut t2 = BTreeMap::new();
        t2.insert("k".to_string(), Value::int(30));
        c.soft_apply("T2", t2).unwrap();
        assert_eq!(c.get("k", false).unwrap(), Some(Value::int(30)));

        c.rollback();
        assert_eq!(c.get("k", false).unwrap(), Some(Value::int(10)));
        assert!(c.pending_tags().is_empty());
    }

    #[test]
    fn hard_apply_stops_inclusive_at_requested_tag() {
        let mut c = cache();
        let mut a = BTreeMap::new();
        a.insert("a".to_string(), Value::int(1));
        c.soft_apply("T1", a).unwrap();
        let mut b = BTreeMap::new();
        b.insert("b".to_string(), Value::int(2));
        c.soft_apply("T2", b).unwrap();
        let mut cc = BTreeMap::new();
        cc.insert("c".to_string(), Value::int(3));
        c.soft_apply("T3", cc).unwrap();

        c.hard_apply("T2").unwrap();

        assert_eq!(c.backend.get("a").unwrap(), Some(encode(&Value::int(1))));
        assert_eq!(c.backend.get("b").unwrap(), Some(encode(&Value::int(2))));
        assert_eq!(c.backend.get("c").unwrap(), None);
        assert_eq!(c.pending_tags(), vec!["T3".to_string()]);
    }

    #[test]
    fn hard_apply_on_unknown_tag_is_a_no_op() {
        let mut c = cache();
        c.hard_apply("missing").unwrap();
        assert!(c.pending_tags().is_empty());
    }

    #[test]
    fn delete_as_null_commits_as_a_delete() {
        let mut c = cache();
        c.backend.set("k", &encode(&Value::int(1))).unwrap();
        c.delete("k", true);
        c.commit().unwrap();
        assert_eq!(c.backend.get("k").unwrap(), None);
    }

    #[test]
    fn second_get_does_not_touch_backend_again() {
        let mut c = cache();
        c.backend.set("k", &encode(&Value::int(1))).unwrap();
        assert_eq!(c.get("k", true).unwrap(), Some(Value::int(1)));
        c.backend.set("k", &encode(&Value::int(999))).unwrap();
        assert_eq!(c.get("k", true).unwrap(), Some(Value::int(1)));
    }

    #[test]
    fn clear_pending_state_preserves_deltas() {
        let mut c = cache();
        let mut t1 = BTreeMap::new();
        t1.insert("k".to_string(), Value::int(1));
        c.soft_apply("T1", t1).unwrap();
        c.clear_pending_state();
        assert_eq!(c.pending_tags(), vec!["T1".to_string()]);
    }
}
