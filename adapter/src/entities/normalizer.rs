//! Response-shape normalization.
//!
//! Data APIs wrap payloads differently: bare objects and arrays, pagination
//! envelopes (`{items, total}`), API wrappers (`{data: ...}`,
//! `{success, result}`). These helpers reduce all of them to records.

use crate::model::Record;
use serde_json::Value;

const ARRAY_ENVELOPE_KEYS: &[&str] = &["data", "items", "results", "records", "rows"];
const SINGLE_ENVELOPE_KEYS: &[&str] = &["data", "result", "record", "item"];

/// Extracts a single record from a response body.
pub fn normalize_single_response(raw: &Value) -> Option<Record> {
    match raw {
        Value::Object(map) => {
            for key in SINGLE_ENVELOPE_KEYS {
                match map.get(*key) {
                    Some(inner @ Value::Object(_)) => return normalize_single_response(inner),
                    Some(Value::Array(items)) => {
                        return items.first().and_then(normalize_single_response);
                    }
                    _ => {}
                }
            }
            Some(map.clone())
        }
        Value::Array(items) => items.first().and_then(normalize_single_response),
        _ => None,
    }
}

/// Extracts a list of records from a response body.
///
/// Non-object entries are dropped. A single object without a recognizable
/// envelope is treated as a one-element list.
pub fn normalize_array_response(raw: &Value) -> Vec<Record> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        Value::Object(map) => {
            for key in ARRAY_ENVELOPE_KEYS {
                match map.get(*key) {
                    Some(inner @ Value::Array(_)) => return normalize_array_response(inner),
                    Some(inner @ Value::Object(nested))
                        if ARRAY_ENVELOPE_KEYS.iter().any(|k| nested.contains_key(*k)) =>
                    {
                        return normalize_array_response(inner);
                    }
                    Some(Value::Object(nested)) if *key == "data" => {
                        return vec![nested.clone()];
                    }
                    _ => {}
                }
            }
            if map.is_empty() {
                Vec::new()
            } else {
                vec![map.clone()]
            }
        }
        _ => Vec::new(),
    }
}
