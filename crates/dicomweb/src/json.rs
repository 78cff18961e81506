//! Readers for datasets in the DICOM JSON model.

use serde_json::Value;

fn first_value<'a>(dataset: &'a Value, tag: &str) -> Option<&'a Value> {
    dataset.get(tag)?.get("Value")?.as_array()?.first()
}

/// First value of an attribute as text; `""` when the attribute is absent or empty.
///
/// Person names (`PN`) are objects in DICOM JSON; their `Alphabetic` representation is
/// returned.
pub fn string_value(dataset: &Value, tag: &str) -> String {
    match first_value(dataset, tag) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(pn)) => pn
            .get("Alphabetic")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// First value of an integer attribute (`IS`, `US`, ...), which servers encode either as a
/// JSON number or as a numeric string.
pub fn integer_value(dataset: &Value, tag: &str) -> Option<i64> {
    match first_value(dataset, tag)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
