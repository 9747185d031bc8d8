//! Sources of raw count documents.
//!
//! [`RecordStore`] is the seam between the dashboard core and wherever the
//! documents live. [`JsonFileStore`] reads an export from disk,
//! [`HttpJsonStore`] fetches one over HTTP and [`DataApiStore`] queries the
//! document store's data API directly.

mod data_api;
mod file;
mod http;

pub use data_api::DataApiStore;
pub use file::JsonFileStore;
pub use http::HttpJsonStore;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::warn;

use crate::record::RawRecord;

/// Store-assigned document id, not part of the count data.
const ID_FIELD: &str = "_id";

/// Fetches the full snapshot of raw documents.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_all_records(&self) -> Result<Vec<RawRecord>>;
}

/// Parses a document export.
///
/// Accepts a JSON array of documents, an object with a `documents` array
/// (data API responses) or newline-delimited JSON (`mongoexport` output).
/// Entries that are not objects are skipped.
pub fn parse_documents(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let text = std::str::from_utf8(bytes).context("document export is not valid UTF-8")?;
    let trimmed = text.trim_start();

    let values: Vec<Value> = if trimmed.is_empty() {
        Vec::new()
    } else if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("failed to parse JSON array of documents")?
    } else {
        let mut stream = serde_json::Deserializer::from_str(trimmed).into_iter::<Value>();
        match stream.next() {
            Some(first) => {
                let first = first.context("failed to parse document")?;
                match first {
                    Value::Object(mut envelope) if is_envelope(&envelope) => {
                        match envelope.remove("documents") {
                            Some(Value::Array(items)) => items,
                            _ => bail!("'documents' field is not an array"),
                        }
                    }
                    first => {
                        let mut values = vec![first];
                        for value in stream {
                            values.push(value.context("failed to parse document line")?);
                        }
                        values
                    }
                }
            }
            None => Vec::new(),
        }
    };

    Ok(into_records(values))
}

fn is_envelope(object: &serde_json::Map<String, Value>) -> bool {
    object.len() == 1 && object.contains_key("documents")
}

fn into_records(values: Vec<Value>) -> Vec<RawRecord> {
    let mut skipped = 0usize;
    let records: Vec<RawRecord> = values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(mut map) => {
                map.remove(ID_FIELD);
                Some(map)
            }
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, "Skipped non-object entries in document export");
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_and_strip_ids() {
        let records = parse_documents(
            br#"[{"_id": {"$oid": "65a1"}, "time": "2024-01-01_08-05-00"}, 3, {"cctv_no": "A"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].contains_key("_id"));
        assert_eq!(records[0]["time"], "2024-01-01_08-05-00");
    }

    #[test]
    fn test_parse_envelope() {
        let records =
            parse_documents(br#"{"documents": [{"cctv_no": "A"}, {"cctv_no": "B"}]}"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_parse_newline_delimited() {
        let input = b"{\"cctv_no\": \"A\"}\n{\"cctv_no\": \"B\"}\n\n{\"cctv_no\": \"C\"}\n";
        let records = parse_documents(input).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["cctv_no"], "C");
    }

    #[test]
    fn test_single_document_with_documents_sibling_is_not_an_envelope() {
        let records = parse_documents(br#"{"documents": [], "cctv_no": "A"}"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_documents(b"").unwrap().is_empty());
        assert!(parse_documents(b"  \n").unwrap().is_empty());
        assert!(parse_documents(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_input() {
        assert!(parse_documents(b"[{").is_err());
        assert!(parse_documents(br#"{"documents": 5}"#).is_err());
        assert!(parse_documents(&[0xFF, 0xFE]).is_err());
    }
}
