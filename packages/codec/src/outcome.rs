//! Result string encoding.
//!
//! `!` is reserved as the first character of every non-plain encoding:
//!
//! | wire form               | meaning                                   |
//! |-------------------------|-------------------------------------------|
//! | `!err:<Kind>`           | lifecycle error                           |
//! | `!err:<Kind>:<detail>`  | any other error, detail verbatim          |
//! | `!json:<json>`          | structured success (anything but a string)|
//! | `!!<rest>`              | success string starting with `!`          |
//! | anything else           | success string, verbatim                  |
//!
//! Success encoding never emits `!err:`, so errors are recognisable from the
//! prefix alone.

use pathbridge_core::{BridgeError, ErrorKind, Value};

use crate::convert::{json_to_value, to_json_string};

/// The reserved first character.
pub const SIGIL: char = '!';
/// Prefix of every encoded error.
pub const ERROR_PREFIX: &str = "!err:";
/// Prefix of every encoded structured value.
pub const JSON_PREFIX: &str = "!json:";

/// What a dispatch produced.
pub type Outcome = Result<Value, BridgeError>;

/// A string that is not a valid result encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed result encoding: {0}")]
pub struct MalformedResult(String);

/// Encode a dispatch outcome. Total over [`Outcome`].
pub fn encode_outcome(outcome: &Outcome) -> String {
    match outcome {
        Ok(value) => encode_value(value),
        Err(error) => encode_error(error),
    }
}

/// Encode a success value.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.starts_with(SIGIL) => format!("{}{}", SIGIL, s),
        Value::String(s) => s.clone(),
        other => format!("{}{}", JSON_PREFIX, to_json_string(other)),
    }
}

/// Encode an error.
pub fn encode_error(error: &BridgeError) -> String {
    match error.detail() {
        Some(detail) => format!("{}{}:{}", ERROR_PREFIX, error.kind(), detail),
        None => format!("{}{}", ERROR_PREFIX, error.kind()),
    }
}

/// Whether an encoded result is an error.
pub fn is_error(encoded: &str) -> bool {
    encoded.starts_with(ERROR_PREFIX)
}

/// Parse an encoded result back into an outcome.
pub fn decode_outcome(encoded: &str) -> Result<Outcome, MalformedResult> {
    if let Some(rest) = encoded.strip_prefix(ERROR_PREFIX) {
        let (name, detail) = match rest.split_once(':') {
            Some((name, detail)) => (name, Some(detail.to_string())),
            None => (rest, None),
        };
        let kind = ErrorKind::from_name(name)
            .ok_or_else(|| MalformedResult(format!("unknown error kind '{}'", name)))?;
        if detail.is_some() && !kind.has_detail() {
            return Err(MalformedResult(format!("{} carries no detail", kind)));
        }
        return Ok(Err(BridgeError::from_parts(kind, detail)));
    }

    if let Some(json) = encoded.strip_prefix(JSON_PREFIX) {
        let parsed: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| MalformedResult(format!("invalid JSON value: {}", e)))?;
        return Ok(Ok(json_to_value(parsed)));
    }

    let mut chars = encoded.chars();
    match (chars.next(), chars.next()) {
        (Some(SIGIL), Some(SIGIL)) => Ok(Ok(Value::String(encoded[1..].to_string()))),
        (Some(SIGIL), _) => Err(MalformedResult(format!(
            "unknown reserved form '{}'",
            encoded
        ))),
        _ => Ok(Ok(Value::String(encoded.to_string()))),
    }
}
