//! Command string grammar.
//!
//! ```text
//! command := verb [ ":" body ]
//! verb    := [a-z]+
//! body    := arg ( "," arg )*      read, write, delete, query
//!          | json-object           put
//! pair    := key "=" value         write, query
//! ```
//!
//! Inside arguments `\,`, `\=` and `\\` stand for the literal characters.
//! Any other escape, a trailing `\`, an empty argument, or a `:` with nothing
//! after it is malformed. A well-formed verb outside the vocabulary is
//! reported as unsupported rather than malformed.

use pathbridge_core::{BridgeError, Command, Record, Value, Verb};

use crate::convert::{json_to_value, value_to_json};

/// Separates the verb from its body.
pub const VERB_SEPARATOR: char = ':';
/// Separates arguments.
pub const ARG_SEPARATOR: char = ',';
/// Separates a key from its value.
pub const PAIR_SEPARATOR: char = '=';
/// Escapes the next separator or itself.
pub const ESCAPE: char = '\\';

fn malformed(message: impl Into<String>) -> BridgeError {
    BridgeError::MalformedCommand(message.into())
}

/// Parse a command string.
///
/// Pure and deterministic; never has side effects.
///
/// # Example
///
/// ```rust
/// use pathbridge_codec::decode_command;
/// use pathbridge_core::Command;
///
/// let command = decode_command("write:name=alice").unwrap();
/// assert_eq!(
///     command,
///     Command::Write { assignments: vec![("name".into(), "alice".into())] }
/// );
/// ```
pub fn decode_command(input: &str) -> Result<Command, BridgeError> {
    if input.is_empty() {
        return Err(malformed("empty command"));
    }

    let (token, body) = match input.split_once(VERB_SEPARATOR) {
        Some((token, body)) => (token, Some(body)),
        None => (input, None),
    };

    if token.is_empty() || !token.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(malformed(format!("invalid verb token '{}'", token)));
    }
    let verb = Verb::from_token(token)
        .ok_or_else(|| BridgeError::UnsupportedCommand(format!("unknown verb '{}'", token)))?;

    if body == Some("") {
        return Err(malformed(format!(
            "'{}' must be followed by arguments",
            VERB_SEPARATOR
        )));
    }

    match verb {
        Verb::Read => Ok(Command::Read {
            fields: decode_keys(body)?,
        }),
        Verb::Delete => Ok(Command::Delete {
            fields: decode_keys(body)?,
        }),
        Verb::Write => {
            let assignments = decode_pairs(body)?;
            if assignments.is_empty() {
                return Err(malformed("write needs at least one key=value pair"));
            }
            Ok(Command::Write { assignments })
        }
        Verb::Query => Ok(Command::Query {
            filter: decode_pairs(body)?,
        }),
        Verb::Put => {
            let body = body.ok_or_else(|| malformed("put needs a JSON object payload"))?;
            Ok(Command::Put {
                record: decode_record(body)?,
            })
        }
        Verb::Count => {
            no_body(verb, body)?;
            Ok(Command::Count)
        }
        Verb::List => {
            no_body(verb, body)?;
            Ok(Command::List)
        }
    }
}

/// Render a command in wire form.
///
/// Every command `decode_command` produces encodes back to a string that
/// decodes to the same command.
pub fn encode_command(command: &Command) -> String {
    let verb = command.verb().as_str();
    let body = match command {
        Command::Read { fields } | Command::Delete { fields } => {
            encode_args(fields.iter().map(|field| escape(field)))
        }
        Command::Write { assignments: pairs } | Command::Query { filter: pairs } => {
            encode_args(
                pairs
                    .iter()
                    .map(|(key, value)| format!("{}{}{}", escape(key), PAIR_SEPARATOR, escape(value))),
            )
        }
        Command::Put { record } => Some(value_to_json(&Value::Map(record.clone())).to_string()),
        Command::Count | Command::List => None,
    };

    match body {
        Some(body) => format!("{}{}{}", verb, VERB_SEPARATOR, body),
        None => verb.to_string(),
    }
}

fn encode_args(args: impl Iterator<Item = String>) -> Option<String> {
    let args: Vec<String> = args.collect();
    if args.is_empty() {
        None
    } else {
        Some(args.join(&ARG_SEPARATOR.to_string()))
    }
}

fn no_body(verb: Verb, body: Option<&str>) -> Result<(), BridgeError> {
    match body {
        None => Ok(()),
        Some(_) => Err(malformed(format!("{} takes no arguments", verb))),
    }
}

fn decode_keys(body: Option<&str>) -> Result<Vec<String>, BridgeError> {
    let Some(body) = body else {
        return Ok(Vec::new());
    };
    split_unescaped(body, ARG_SEPARATOR)
        .into_iter()
        .map(|arg| {
            if arg.is_empty() {
                return Err(malformed("empty argument"));
            }
            if find_unescaped(arg, PAIR_SEPARATOR).is_some() {
                return Err(malformed(format!("unexpected '=' in field name '{}'", arg)));
            }
            unescape(arg)
        })
        .collect()
}

fn decode_pairs(body: Option<&str>) -> Result<Vec<(String, String)>, BridgeError> {
    let Some(body) = body else {
        return Ok(Vec::new());
    };
    split_unescaped(body, ARG_SEPARATOR)
        .into_iter()
        .map(|arg| {
            let at = find_unescaped(arg, PAIR_SEPARATOR)
                .ok_or_else(|| malformed(format!("expected key=value, got '{}'", arg)))?;
            let (key, value) = (&arg[..at], &arg[at + PAIR_SEPARATOR.len_utf8()..]);
            if key.is_empty() {
                return Err(malformed(format!("empty key in '{}'", arg)));
            }
            Ok((unescape(key)?, unescape(value)?))
        })
        .collect()
}

fn decode_record(body: &str) -> Result<Record, BridgeError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| malformed(format!("invalid JSON payload: {}", e)))?;
    match json_to_value(json) {
        Value::Map(record) => Ok(record),
        _ => Err(malformed("put payload must be a JSON object")),
    }
}

/// Split on every delimiter not preceded by an escape.
fn split_unescaped(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == delimiter {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

fn find_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
}

fn unescape(input: &str) -> Result<String, BridgeError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ (ARG_SEPARATOR | PAIR_SEPARATOR | ESCAPE)) => out.push(next),
            Some(other) => return Err(malformed(format!("invalid escape '\\{}'", other))),
            None => return Err(malformed("trailing escape character")),
        }
    }
    Ok(out)
}

/// Escape separators and the escape character itself.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, ARG_SEPARATOR | PAIR_SEPARATOR | ESCAPE) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}
