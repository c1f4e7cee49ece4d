//! List response normalization.
//!
//! List endpoints answer either with a bare array or with an object that wraps
//! the array under a resource-specific key (`{"products": [...]}`,
//! `{"pending_orders": [...]}`, `{"unpaidBills": [...], ...}`).

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts the row array from a list response.
///
/// 1. bare array: used as-is, order preserved;
/// 2. object: the first array-valued property, in document order;
/// 3. anything else: empty.
pub fn normalize_list_response(json: Value) -> Vec<Value> {
    match json {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, value)| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Normalizes a list response and decodes every row into `T`.
pub fn decode_list<T: DeserializeOwned>(json: Value) -> Result<Vec<T>, serde_json::Error> {
    normalize_list_response(json)
        .into_iter()
        .map(serde_json::from_value)
        .collect()
}
