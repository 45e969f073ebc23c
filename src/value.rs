//! The closed set of value types contract state can hold (spec.md §3).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::error::EncodeError;

/// A value that can be stored in contract state.
///
/// Deliberately a closed set: [`crate::encoding`] only knows how to encode
/// and decode these ten shapes. Binary floating point is never a member —
/// see [`FixedPoint`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unbounded-precision integer.
    Int(BigInt),
    /// Exact fixed-point decimal; never a lossy `f64` approximation.
    Decimal(FixedPoint),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
    /// Arbitrary byte string.
    Bytes(Vec<u8>),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Mapping from text to value. A `BTreeMap` so that canonical encoding's
    /// "keys in lexicographic order" requirement (spec.md §4.1) falls out of
    /// the type rather than needing a sort step at encode time.
    Map(BTreeMap<String, Value>),
    /// UTC timestamp, microsecond precision.
    Timestamp(Timestamp),
    /// Signed day/second/microsecond delta.
    TimeDelta(TimeDelta),
    /// Explicit absence of a value. Distinct from a tombstone (see
    /// [`crate::cache`]): a `Null` *is* stored; a tombstone means *absent*.
    Null,
}

impl Value {
    /// Shorthand for constructing an [`Value::Int`] from any integer type.
    pub fn int(v: impl Into<BigInt>) -> Self {
        Value::Int(v.into())
    }

    /// Shorthand for constructing a [`Value::Text`].
    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into())
    }

    /// `true` if this value is [`Value::Null`]. Note a tombstone is not a
    /// `Value` at all, so this is unrelated to presence/absence in the cache.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(BigInt::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// An exact fixed-point decimal, stored as its canonical digit string
/// (optional leading `-`, digits, optional single `.`, digits).
///
/// The digit string is preserved verbatim so that `"1.0"` and `"1.00"` remain
/// distinct, exactly-round-tripping literals (spec.md §4.1) — a `Decimal` is
/// only used transiently to *coerce* a binary float or an external decimal
/// type into this canonical form (spec.md §4.5), never as the storage
/// representation itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint(String);

impl FixedPoint {
    /// Builds a `FixedPoint` from an already-canonical digit string,
    /// validating its shape.
    pub fn from_canonical(digits: impl Into<String>) -> Result<Self, EncodeError> {
        let digits = digits.into();
        if !is_valid_fixed_point_literal(&digits) {
            return Err(EncodeError::InvalidDecimal(digits));
        }
        Ok(FixedPoint(digits))
    }

    /// Coerces an `f64` into canonical fixed-point form via `rust_decimal`,
    /// which bans NaN/infinity and preserves significant digits.
    pub fn from_f64(v: f64) -> Result<Self, EncodeError> {
        let dec = Decimal::from_str(&format!("{v}")).map_err(|e| EncodeError::InvalidDecimal(e.to_string()))?;
        Ok(FixedPoint(dec.to_string()))
    }

    /// Coerces an arbitrary-precision `rust_decimal::Decimal` into canonical form.
    pub fn from_decimal(v: Decimal) -> Self {
        FixedPoint(v.to_string())
    }

    /// The canonical digit string, e.g. `"0.0044997618965276"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_fixed_point_literal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    if s.is_empty() {
        return false;
    }
    let mut parts = s.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    true
}

/// A UTC timestamp with microsecond precision, stored as its explicit
/// calendar components so the canonical `[Y, M, D, h, m, s, us]` tuple
/// round-trips without depending on a particular formatting of `chrono`
/// types (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
    /// Second, 0-59.
    pub second: u32,
    /// Microseconds, 0-999_999.
    pub micros: u32,
}

impl Timestamp {
    /// The current UTC time.
    pub fn now() -> Self {
        use chrono::{Datelike, Timelike};
        let now = chrono::Utc::now();
        Timestamp {
            year: now.year(),
            month: now.month(),
            day: now.day(),
            hour: now.hour(),
            minute: now.minute(),
            second: now.second(),
            micros: now.timestamp_subsec_micros(),
        }
    }

    /// The seven-element tuple form used by the canonical wire encoding.
    pub fn as_tuple(&self) -> [i64; 7] {
        [
            self.year as i64,
            self.month as i64,
            self.day as i64,
            self.hour as i64,
            self.minute as i64,
            self.second as i64,
            self.micros as i64,
        ]
    }

    /// Reconstructs a `Timestamp` from the seven-element tuple form.
    pub fn from_tuple(t: [i64; 7]) -> Result<Self, EncodeError> {
        Ok(Timestamp {
            year: t[0] as i32,
            month: t[1] as u32,
            day: t[2] as u32,
            hour: t[3] as u32,
            minute: t[4] as u32,
            second: t[5] as u32,
            micros: t[6] as u32,
        })
    }
}

/// A signed day/second/microsecond delta, mirroring Python's `timedelta`
/// shape (spec.md §4.1's `[days, seconds, microseconds]` tuple).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeDelta {
    /// Whole days.
    pub days: i64,
    /// Whole seconds, in addition to `days`.
    pub seconds: i64,
    /// Microseconds, in addition to `seconds`.
    pub microseconds: i64,
}

impl TimeDelta {
    /// The three-element tuple form used by the canonical wire encoding.
    pub fn as_tuple(&self) -> [i64; 3] {
        [self.days, self.seconds, self.microseconds]
    }

    /// Reconstructs a `TimeDelta` from the three-element tuple form.
    pub fn from_tuple(t: [i64; 3]) -> Self {
        TimeDelta {
            days: t[0],
            seconds: t[1],
            microseconds: t[2],
        }
    }
}
