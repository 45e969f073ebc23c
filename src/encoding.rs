//! Canonical Value <-> text encoding (C1, spec.md §4.1).
//!
//! The wire form is a superset of JSON: base values (text, bool, null, list,
//! map, integer) use plain JSON syntax; the types JSON cannot represent
//! exactly are written as a tagged singleton object whose sole key is
//! wrapped in double underscores (`__fixed__`, `__time__`, `__delta__`,
//! `__bytes__`). `serde_json`'s `arbitrary_precision` feature is what makes
//! unbounded integers representable as bare JSON numbers without going
//! through a lossy `i64`/`f64`.

use std::collections::BTreeMap;
use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::{Map, Number, Value as Json};

use crate::error::EncodeError;
use crate::value::{FixedPoint, TimeDelta, Timestamp, Value};

const TAG_FIXED: &str = "__fixed__";
const TAG_TIME: &str = "__time__";
const TAG_DELTA: &str = "__delta__";
const TAG_BYTES: &str = "__bytes__";

/// Encodes a [`Value`] to its canonical textual form.
///
/// Infallible: `Value`'s own type is already the closed set the wire form
/// can represent, so there is nothing left to reject at this stage (unlike
/// [`decode`], which must defend against arbitrary external text).
pub fn encode(value: &Value) -> String {
    let json = to_json(value);
    // `serde_json::Map` (no `preserve_order` feature) is a `BTreeMap`, and we
    // build it from a `BTreeMap` or directly from already-sorted iteration,
    // so object keys come out in lexicographic order with no extra sort
    // step. The default compact writer emits no superfluous whitespace.
    serde_json::to_string(&json).expect("closed Value set always serializes")
}

/// Decodes a canonical textual form back into a [`Value`].
///
/// Per spec.md §4.1, an empty or malformed input yields [`Value::Null`]
/// rather than an error — callers that need to distinguish "absent" from
/// "garbage" should check the input before calling this.
pub fn decode(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Json>(text) {
        Ok(json) => from_json(&json).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}

/// Like [`decode`], but surfaces the reason decoding failed instead of
/// collapsing it to `Null`. Used internally by round-trip tests and by
/// callers that want strict diagnostics.
pub fn try_decode(text: &str) -> Result<Value, EncodeError> {
    if text.is_empty() {
        return Err(EncodeError::Malformed("empty input".to_string()));
    }
    let json: Json = serde_json::from_str(text).map_err(|e| EncodeError::Malformed(e.to_string()))?;
    from_json(&json)
}

/// Returns the encoded byte length of a key plus the encoded byte length of
/// an optional value, for cost-hook accounting (spec.md §4.7).
pub fn encode_kv(key: &str, value: Option<&Value>) -> (usize, usize) {
    let value_bytes = value.map(|v| encode(v).len()).unwrap_or(0);
    (key.len(), value_bytes)
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Int(n) => Json::Number(number_from_digits(&n.to_string())),
        Value::Decimal(fp) => tagged(TAG_FIXED, Json::String(fp.as_str().to_string())),
        Value::Bool(b) => Json::Bool(*b),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => tagged(TAG_BYTES, Json::String(hex::encode(b))),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), to_json(v));
            }
            Json::Object(obj)
        }
        Value::Timestamp(ts) => tagged(TAG_TIME, tuple_json(&ts.as_tuple())),
        Value::TimeDelta(td) => tagged(TAG_DELTA, tuple_json(&td.as_tuple())),
        Value::Null => Json::Null,
    }
}

fn tagged(tag: &str, inner: Json) -> Json {
    let mut obj = Map::new();
    obj.insert(tag.to_string(), inner);
    Json::Object(obj)
}

fn tuple_json(values: &[i64]) -> Json {
    Json::Array(
        values
            .iter()
            .map(|v| Json::Number(number_from_digits(&v.to_string())))
            .collect(),
    )
}

/// Builds a `serde_json::Number` from an arbitrary (possibly huge) decimal
/// digit string without going through a lossy `i64`/`f64`. With the
/// `arbitrary_precision` feature, `Number`'s `Deserialize` impl preserves the
/// raw digit string exactly, so round-tripping through `from_str` is the
/// public, non-lossy way to build one — there is no public constructor that
/// takes a digit string directly.
fn number_from_digits(digits: &str) -> Number {
    serde_json::from_str(digits).expect("a BigInt's decimal string is always a valid JSON number")
}

fn from_json(json: &Json) -> Result<Value, EncodeError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => {
            let digits = n.to_string();
            BigInt::from_str(&digits)
                .map(Value::Int)
                .map_err(|_| EncodeError::Malformed(format!("non-integer bare number {digits:?}")))
        }
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Array(items) => {
            let values = items.iter().map(from_json).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Json::Object(map) => from_object(map),
    }
}

/// Any map whose sole key begins and ends with `__` is a tagged scalar
/// (spec.md §9's design note); everything else is an ordinary `Value::Map`.
fn from_object(map: &Map<String, Json>) -> Result<Value, EncodeError> {
    if map.len() == 1 {
        let (key, inner) = map.iter().next().expect("len checked above");
        if is_type_tag(key) {
            return decode_tagged(key, inner);
        }
    }

    let mut out = BTreeMap::new();
    for (k, v) in map {
        out.insert(k.clone(), from_json(v)?);
    }
    Ok(Value::Map(out))
}

fn is_type_tag(key: &str) -> bool {
    key.starts_with("__") && key.ends_with("__") && key.len() > 4
}

fn decode_tagged(tag: &str, inner: &Json) -> Result<Value, EncodeError> {
    match tag {
        TAG_FIXED => {
            let digits = inner
                .as_str()
                .ok_or_else(|| EncodeError::InvalidDecimal(inner.to_string()))?;
            Ok(Value::Decimal(
                FixedPoint::from_canonical(digits).map_err(|_| EncodeError::InvalidDecimal(digits.to_string()))?,
            ))
        }
        TAG_BYTES => {
            let hex_str = inner.as_str().ok_or_else(|| EncodeError::InvalidHex(inner.to_string()))?;
            let bytes = hex::decode(hex_str).map_err(|e| EncodeError::InvalidHex(e.to_string()))?;
            Ok(Value::Bytes(bytes))
        }
        TAG_TIME => {
            let tuple = read_i64_tuple::<7>(inner, "timestamp")?;
            Ok(Value::Timestamp(
                Timestamp::from_tuple(tuple).map_err(|_| EncodeError::InvalidTupleShape("timestamp"))?,
            ))
        }
        TAG_DELTA => {
            let tuple = read_i64_tuple::<3>(inner, "time-delta")?;
            Ok(Value::TimeDelta(TimeDelta::from_tuple(tuple)))
        }
        // Unknown `__..__` keys are not a recognized tag; treat the object as
        // an ordinary one-entry map rather than failing the whole decode.
        _ => {
            let mut out = BTreeMap::new();
            out.insert(tag.to_string(), from_json(inner)?);
            Ok(Value::Map(out))
        }
    }
}

fn read_i64_tuple<const N: usize>(json: &Json, what: &'static str) -> Result<[i64; N], EncodeError> {
    let arr = json.as_array().ok_or(EncodeError::InvalidTupleShape(what))?;
    if arr.len() != N {
        return Err(EncodeError::InvalidTupleShape(what));
    }
    let mut out = [0i64; N];
    for (slot, item) in out.iter_mut().zip(arr.iter()) {
        *slot = item.as_i64().ok_or(EncodeError::InvalidTupleShape(what))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use num_bigint::BigInt;

    #[test]
    fn integer_round_trips_exactly() {
        let v = Value::Int(BigInt::from(123456789012345678_i128 as i64));
        let encoded = encode(&v);
        assert_eq!(decode(&encoded), v);
    }

    #[test]
    fn decimal_preserves_trailing_zeros() {
        let a = Value::Decimal(FixedPoint::from_canonical("1.0").unwrap());
        let b = Value::Decimal(FixedPoint::from_canonical("1.00").unwrap());
        assert_ne!(encode(&a), encode(&b));
        assert_eq!(decode(&encode(&a)), a);
        assert_eq!(decode(&encode(&b)), b);
    }

    #[test]
    fn map_keys_are_sorted_on_encode() {
        let mut m = BTreeMap::new();
        m.insert("z".to_string(), Value::Int(BigInt::from(1)));
        m.insert("a".to_string(), Value::Int(BigInt::from(2)));
        let encoded = encode(&Value::Map(m));
        assert_eq!(encoded, r#"{"a":2,"z":1}"#);
    }

    #[test]
    fn malformed_input_decodes_to_null() {
        assert_eq!(decode(""), Value::Null);
        assert_eq!(decode("{not json"), Value::Null);
    }

    #[test]
    fn bytes_round_trip_as_hex() {
        let v = Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let encoded = encode(&v);
        assert_eq!(encoded, r#"{"__bytes__":"deadbeef"}"#);
        assert_eq!(decode(&encoded), v);
    }

    #[test]
    fn timestamp_round_trips() {
        let ts = Timestamp {
            year: 2026,
            month: 7,
            day: 26,
            hour: 1,
            minute: 2,
            second: 3,
            micros: 4,
        };
        let v = Value::Timestamp(ts);
        let encoded = encode(&v);
        assert_eq!(decode(&encoded), v);
    }

    #[test]
    fn re_encoding_a_decoded_value_is_byte_identical() {
        let originals = vec![
            Value::Int(BigInt::from(-42)),
            Value::Decimal(FixedPoint::from_canonical("0.0044997618965276").unwrap()),
            Value::List(vec![Value::Bool(true), Value::Null, Value::text("hi")]),
        ];
        for v in originals {
            let e1 = encode(&v);
            let d = decode(&e1);
            let e2 = encode(&d);
            assert_eq!(e1, e2);
        }
    }
}
