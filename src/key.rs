//! Key codec (C2, spec.md §4.2): compose/parse logical
//! `(contract, variable, subkeys...)` tuples to/from flat keys.

use crate::consts::{DELIMITER, INDEX_SEPARATOR, MAX_HASH_DIMENSIONS, MAX_KEY_SIZE};
use crate::error::KeyShapeError;

/// A validated flat key, of the form `contract.variable(:subkey)*`.
///
/// Constructing one always goes through [`FlatKey::make`]/[`FlatKey::parse`],
/// so any `FlatKey` in hand already satisfies spec.md §3's shape invariants
/// (I5: round-trips through this codec to the same logical tuple).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlatKey(String);

impl FlatKey {
    /// Composes a flat key from its logical parts, validating shape
    /// against the given limits.
    pub fn make(
        contract: &str,
        variable: &str,
        subkeys: &[String],
        max_hash_dimensions: usize,
        max_key_size: usize,
    ) -> Result<Self, KeyShapeError> {
        validate_component(contract)?;
        validate_component(variable)?;
        if variable.contains(DELIMITER) {
            return Err(KeyShapeError::ReservedCharacter(variable.to_string()));
        }
        if subkeys.len() > max_hash_dimensions {
            return Err(KeyShapeError::TooManyDimensions(subkeys.len(), max_hash_dimensions));
        }

        let mut flat = format!("{contract}{INDEX_SEPARATOR}{variable}");
        for subkey in subkeys {
            flat.push(DELIMITER);
            flat.push_str(subkey);
        }

        if flat.len() > max_key_size {
            return Err(KeyShapeError::KeyTooLong(flat.len(), max_key_size));
        }

        Ok(FlatKey(flat))
    }

    /// Composes a flat key using the spec's default limits
    /// ([`MAX_HASH_DIMENSIONS`], [`MAX_KEY_SIZE`]).
    pub fn make_default(contract: &str, variable: &str, subkeys: &[String]) -> Result<Self, KeyShapeError> {
        Self::make(contract, variable, subkeys, MAX_HASH_DIMENSIONS, MAX_KEY_SIZE)
    }

    /// Parses a flat key's text form back into its logical tuple,
    /// validating it against the given limits.
    pub fn parse(
        flat: &str,
        max_hash_dimensions: usize,
        max_key_size: usize,
    ) -> Result<(String, String, Vec<String>), KeyShapeError> {
        if flat.len() > max_key_size {
            return Err(KeyShapeError::KeyTooLong(flat.len(), max_key_size));
        }

        let (contract, rest) = flat
            .split_once(INDEX_SEPARATOR)
            .ok_or_else(|| KeyShapeError::Malformed(flat.to_string()))?;
        validate_component(contract)?;

        let mut parts = rest.split(DELIMITER);
        let variable = parts.next().unwrap_or_default();
        validate_component(variable)?;

        let subkeys: Vec<String> = parts.map(str::to_string).collect();
        if subkeys.len() > max_hash_dimensions {
            return Err(KeyShapeError::TooManyDimensions(subkeys.len(), max_hash_dimensions));
        }

        Ok((contract.to_string(), variable.to_string(), subkeys))
    }

    /// Parses using the spec's default limits.
    pub fn parse_default(flat: &str) -> Result<(String, String, Vec<String>), KeyShapeError> {
        Self::parse(flat, MAX_HASH_DIMENSIONS, MAX_KEY_SIZE)
    }

    /// Wraps an already-flat string without re-validating it. Callers that
    /// received the string from a trusted source (e.g. a backend's own
    /// `iter`/`keys` output) can use this to avoid redundant parsing.
    pub fn from_trusted(flat: impl Into<String>) -> Self {
        FlatKey(flat.into())
    }

    /// The flat key's text form, as seen by the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning its text form.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for FlatKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FlatKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_component(s: &str) -> Result<(), KeyShapeError> {
    if s.is_empty() {
        return Err(KeyShapeError::EmptyComponent);
    }
    if s.contains(INDEX_SEPARATOR) {
        return Err(KeyShapeError::ReservedCharacter(s.to_string()));
    }
    Ok(())
}

/// Coerces a non-text subkey argument to its canonical textual
/// representation, as spec.md §3 requires for callers that pass e.g.
/// integers as subkeys.
pub fn subkey_to_text(v: impl std::fmt::Display) -> String {
    v.to_string()
}
