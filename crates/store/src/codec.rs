//! Helpers composed by the backend adapters.
//!
//! Metadata is stored as a flat string in engines that only offer scalar
//! columns. The encoding is a sequence of length-prefixed entries:
//!
//! ```text
//! <key-bytes>:<key><value-bytes>:<value-as-json>
//! ```
//!
//! e.g. `{"lang":"en"}` becomes `4:lang4:"en"`. Parsing is strict; nothing
//! in a stored string is ever interpreted beyond JSON values.

use crate::record::Metadata;
use std::fmt;
use vecgate_core::{AppError, AppResult};

/// Current time in whole seconds since the Unix epoch.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Fail with `DimensionMismatch` unless `actual == expected`.
pub fn check_dimension(expected: usize, actual: usize) -> AppResult<()> {
    if expected != actual {
        return Err(AppError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Why a stored metadata string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A length prefix was missing, not a number, or not followed by `:`
    BadLength(usize),
    /// A length ran past the end of the input or split a UTF-8 character
    Truncated(usize),
    /// A value was not valid JSON
    BadValue(String),
    /// The same key appeared twice
    DuplicateKey(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadLength(pos) => write!(f, "invalid length prefix at byte {}", pos),
            DecodeError::Truncated(pos) => write!(f, "truncated entry at byte {}", pos),
            DecodeError::BadValue(key) => write!(f, "invalid JSON value for key '{}'", key),
            DecodeError::DuplicateKey(key) => write!(f, "duplicate key '{}'", key),
        }
    }
}

/// Encode metadata for storage. An empty map encodes to `""`.
pub fn encode_metadata(metadata: &Metadata) -> String {
    let mut out = String::new();
    for (key, value) in metadata {
        let value = value.to_string();
        out.push_str(&key.len().to_string());
        out.push(':');
        out.push_str(key);
        out.push_str(&value.len().to_string());
        out.push(':');
        out.push_str(&value);
    }
    out
}

/// Strictly decode a stored metadata string.
pub fn try_decode_metadata(input: &str) -> Result<Metadata, DecodeError> {
    let mut metadata = Metadata::new();
    let mut pos = 0;

    while pos < input.len() {
        let (key, next) = read_field(input, pos)?;
        let (raw_value, next) = read_field(input, next)?;

        let value = serde_json::from_str(raw_value)
            .map_err(|_| DecodeError::BadValue(key.to_string()))?;

        if metadata.insert(key.to_string(), value).is_some() {
            return Err(DecodeError::DuplicateKey(key.to_string()));
        }
        pos = next;
    }

    Ok(metadata)
}

/// Decode a stored metadata string, falling back to an empty map.
///
/// Malformed input is logged and dropped rather than failing the read.
pub fn decode_metadata(input: &str) -> Metadata {
    try_decode_metadata(input).unwrap_or_else(|e| {
        tracing::warn!("Discarding undecodable metadata: {}", e);
        Metadata::new()
    })
}

fn read_field(input: &str, start: usize) -> Result<(&str, usize), DecodeError> {
    let rest = &input[start..];
    let colon = rest.find(':').ok_or(DecodeError::BadLength(start))?;
    let digits = &rest[..colon];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::BadLength(start));
    }
    let len: usize = digits.parse().map_err(|_| DecodeError::BadLength(start))?;

    let body_start = start + colon + 1;
    let body_end = body_start
        .checked_add(len)
        .ok_or(DecodeError::Truncated(body_start))?;
    let body = input
        .get(body_start..body_end)
        .ok_or(DecodeError::Truncated(body_start))?;

    Ok((body, body_end))
}
