//! Decoding of the per-record `count` payload into category counts.
//!
//! The payload shows up in three shapes: a native document, the text of a
//! dictionary literal, or something else entirely (missing, null, a bare
//! number). [`CountPayload::classify`] settles the shape once and
//! [`CountPayload::decode`] turns it into [`VehicleCounts`], degrading to
//! zero on anything it cannot read.

use serde_json::{Map, Value};
use tracing::warn;

use crate::parser::parse_literal;
use crate::record::{Category, VehicleCounts};

/// The payload after shape classification.
#[derive(Debug, Clone, PartialEq)]
pub enum CountPayload<'a> {
    Structured(&'a Map<String, Value>),
    Encoded(&'a str),
    Other,
}

/// How a payload was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadStatus {
    /// A mapping was found (it may still lack some or all categories).
    Parsed,
    /// Nothing resembling a mapping was present.
    Empty,
    /// The payload looked like a mapping but could not be decoded.
    Malformed(String),
}

/// Result of decoding one payload. Never an error: malformed input yields
/// zero counts with a [`PayloadStatus::Malformed`] status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCounts {
    pub counts: VehicleCounts,
    pub status: PayloadStatus,
}

impl<'a> CountPayload<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::Object(map)) => CountPayload::Structured(map),
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                if trimmed.starts_with('{') && trimmed.ends_with('}') {
                    CountPayload::Encoded(trimmed)
                } else {
                    CountPayload::Other
                }
            }
            _ => CountPayload::Other,
        }
    }

    pub fn decode(&self) -> DecodedCounts {
        match self {
            CountPayload::Structured(map) => DecodedCounts {
                counts: counts_from_map(map),
                status: PayloadStatus::Parsed,
            },
            CountPayload::Encoded(text) => match decode_literal(text) {
                Ok(Value::Object(map)) => DecodedCounts {
                    counts: counts_from_map(&map),
                    status: PayloadStatus::Parsed,
                },
                Ok(other) => malformed(text, format!("decoded to a non-mapping value {}", other)),
                Err(e) => malformed(text, e.to_string()),
            },
            CountPayload::Other => DecodedCounts {
                counts: VehicleCounts::default(),
                status: PayloadStatus::Empty,
            },
        }
    }
}

/// Parses the literal as written, falling back to a copy with `\"` unescaped
/// for payloads that were stored with every quote escaped.
fn decode_literal(text: &str) -> anyhow::Result<Value> {
    parse_literal(text).or_else(|err| {
        if text.contains("\\\"") {
            parse_literal(&text.replace("\\\"", "\""))
        } else {
            Err(err)
        }
    })
}

fn malformed(text: &str, reason: String) -> DecodedCounts {
    warn!(payload = %text, error = %reason, "Malformed count payload, using zero counts");
    DecodedCounts {
        counts: VehicleCounts::default(),
        status: PayloadStatus::Malformed(reason),
    }
}

/// Decodes a raw `count` field value in one step.
pub fn parse_counts(value: Option<&Value>) -> VehicleCounts {
    CountPayload::classify(value).decode().counts
}

/// Reads the four categories from a mapping. Missing keys count as zero.
pub fn counts_from_map(map: &Map<String, Value>) -> VehicleCounts {
    let mut counts = VehicleCounts::default();
    for category in Category::ALL {
        counts.set(category, map.get(category.as_str()).map_or(0, count_value));
    }
    counts
}

/// Converts a single count value to a non-negative integer.
///
/// Integers are taken as-is, non-negative floats are truncated, booleans
/// count as 0/1 and numeric strings are parsed. Negative numbers and any
/// other value read as zero.
pub fn count_value(value: &Value) -> u64 {
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::Bool(b) => Some(u64::from(*b)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    if count.is_none() && !value.is_null() {
        warn!(value = %value, "Unreadable category count, using zero");
    }
    count.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encoded_garbage_falls_back_to_zero() {
        let value = json!("{not valid python}");
        assert_eq!(parse_counts(Some(&value)), VehicleCounts::default());

        let decoded = CountPayload::classify(Some(&value)).decode();
        assert!(matches!(decoded.status, PayloadStatus::Malformed(_)));
    }

    #[test]
    fn test_structured_partial_mapping() {
        let value = json!({"car": 2, "bus": 1});
        assert_eq!(parse_counts(Some(&value)), VehicleCounts::new(2, 0, 0, 1));
    }

    #[test]
    fn test_absent_and_null_payloads_are_empty() {
        assert_eq!(parse_counts(None), VehicleCounts::default());
        assert_eq!(parse_counts(Some(&Value::Null)), VehicleCounts::default());
        assert_eq!(
            CountPayload::classify(None).decode().status,
            PayloadStatus::Empty
        );
    }

    #[test]
    fn test_empty_mapping_is_parsed_not_malformed() {
        let value = json!({});
        let decoded = CountPayload::classify(Some(&value)).decode();
        assert_eq!(decoded.counts, VehicleCounts::default());
        assert_eq!(decoded.status, PayloadStatus::Parsed);
    }

    #[test]
    fn test_mapping_without_categories_is_zero() {
        let value = json!({"person": 7});
        assert_eq!(parse_counts(Some(&value)), VehicleCounts::default());
    }

    #[test]
    fn test_encoded_literal_is_decoded() {
        let value = json!("{'car': 3, 'truck': 1, 'motorcycle': 4, 'bus': 2}");
        assert_eq!(parse_counts(Some(&value)), VehicleCounts::new(3, 1, 4, 2));
    }

    #[test]
    fn test_encoded_literal_with_escaped_quotes() {
        let value = json!(r#" {\"car\": 1, \"motorcycle\": 5} "#);
        assert_eq!(parse_counts(Some(&value)), VehicleCounts::new(1, 0, 5, 0));
    }

    #[test]
    fn test_escaped_quote_inside_string_is_kept() {
        let value = json!(r#"{"car": 1, "note": "a\"b"}"#);
        let decoded = CountPayload::classify(Some(&value)).decode();
        assert_eq!(decoded.counts, VehicleCounts::new(1, 0, 0, 0));
        assert_eq!(decoded.status, PayloadStatus::Parsed);
    }

    #[test]
    fn test_non_mapping_string_is_empty() {
        let value = json!("car=2");
        let decoded = CountPayload::classify(Some(&value)).decode();
        assert_eq!(decoded.status, PayloadStatus::Empty);
    }

    #[test]
    fn test_brace_wrapped_set_is_malformed() {
        let value = json!("{1, 2}");
        let decoded = CountPayload::classify(Some(&value)).decode();
        assert_eq!(decoded.counts, VehicleCounts::default());
        assert!(matches!(decoded.status, PayloadStatus::Malformed(_)));
    }

    #[test]
    fn test_other_shapes_are_empty() {
        assert_eq!(parse_counts(Some(&json!(12))), VehicleCounts::default());
        assert_eq!(parse_counts(Some(&json!([1, 2]))), VehicleCounts::default());
    }

    #[test]
    fn test_count_value_coercions() {
        assert_eq!(count_value(&json!(4)), 4);
        assert_eq!(count_value(&json!(2.9)), 2);
        assert_eq!(count_value(&json!(-1)), 0);
        assert_eq!(count_value(&json!(true)), 1);
        assert_eq!(count_value(&json!(" 6 ")), 6);
        assert_eq!(count_value(&json!("many")), 0);
        assert_eq!(count_value(&Value::Null), 0);
    }
}
