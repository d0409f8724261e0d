//! Command semantics on a single record, shared by every engine.

use pathbridge_codec::convert::to_json_string;
use pathbridge_core::{Record, Value};

/// Returned by commands that only acknowledge.
pub const ACK: &str = "ok";

pub fn ack() -> Value {
    Value::from(ACK)
}

/// No fields: the whole record. One field: its value, `Null` if absent.
/// Several fields: a map of those present.
pub fn read(record: &Record, fields: &[String]) -> Value {
    match fields {
        [] => Value::Map(record.clone()),
        [field] => record.get(field).cloned().unwrap_or_default(),
        fields => Value::Map(
            fields
                .iter()
                .filter_map(|field| {
                    record
                        .get(field)
                        .map(|value| (field.clone(), value.clone()))
                })
                .collect(),
        ),
    }
}

pub fn write(record: &mut Record, assignments: &[(String, String)]) -> Value {
    for (key, value) in assignments {
        record.insert(key.clone(), Value::from(value.as_str()));
    }
    ack()
}

pub fn put(record: &mut Record, fields: &Record) -> Value {
    for (key, value) in fields {
        record.insert(key.clone(), value.clone());
    }
    ack()
}

/// Remove fields, returning how many existed.
pub fn remove_fields(record: &mut Record, fields: &[String]) -> Value {
    let removed = fields
        .iter()
        .filter(|field| record.remove(field.as_str()).is_some())
        .count();
    Value::from(removed)
}

/// Text a field is compared by in a query filter.
///
/// Strings compare verbatim; anything else by its JSON text, so `age=30`
/// matches the integer `30`.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => to_json_string(other),
    }
}

/// Whether a record satisfies every `key=value` pair.
pub fn matches(record: &Record, filter: &[(String, String)]) -> bool {
    filter.iter().all(|(key, expected)| {
        record
            .get(key)
            .is_some_and(|value| field_text(value) == *expected)
    })
}
