//! Raw document → [`CanonicalRecord`] normalization.
//!
//! Every record is checked on its own; problems with one document never
//! affect another. Problems that only show up across the whole batch
//! (a field no document ever carried) are reported as [`DatasetWarning`]s.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::payload::{CountPayload, PayloadStatus, count_value};
use crate::record::{CameraId, CanonicalRecord, Category, RawRecord, TIME_FORMAT, VehicleCounts};

/// Field names read from raw documents.
pub const TIME_FIELD: &str = "time";
pub const LEGACY_TIME_FIELD: &str = "timestamp";
pub const CAMERA_FIELD: &str = "cctv_no";
pub const COUNT_FIELD: &str = "count";

/// Column names older documents used for category counts, checked in order.
fn legacy_columns(category: Category) -> &'static [&'static str] {
    match category {
        Category::Car => &["mobil", "car"],
        Category::Truck => &["truck"],
        Category::Motorcycle => &["motor", "motorcycle"],
        Category::Bus => &["bus"],
    }
}

/// Where category counts are read from for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// The `count` payload of each document.
    Payload,
    /// Per-document category columns; used when no document has `count`.
    LegacyColumns,
}

/// Why a document was left out of the canonical set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingTime,
    InvalidTime(String),
}

/// A batch-level shape problem. Processing continues with zero defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetWarning {
    MissingCountField,
    MissingCategoryColumn { category: Category },
    MissingTimeField,
    MissingCameraField,
}

impl std::fmt::Display for DatasetWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetWarning::MissingCountField => {
                write!(
                    f,
                    "no record has a '{}' field; using per-record category columns",
                    COUNT_FIELD
                )
            }
            DatasetWarning::MissingCategoryColumn { category } => {
                write!(f, "no record has a '{}' column; defaulting it to zero", category)
            }
            DatasetWarning::MissingTimeField => {
                write!(f, "no record has a '{}' field; every record was dropped", TIME_FIELD)
            }
            DatasetWarning::MissingCameraField => {
                write!(
                    f,
                    "no record has a '{}' field; all records are grouped as unknown",
                    CAMERA_FIELD
                )
            }
        }
    }
}

/// One normalized document plus how its payload was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub record: CanonicalRecord,
    pub payload: PayloadStatus,
}

/// Diagnostics for one normalization pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub total_raw: usize,
    pub kept: usize,
    pub dropped_invalid_time: usize,
    pub malformed_payloads: usize,
    pub empty_payloads: usize,
    pub warnings: Vec<DatasetWarning>,
}

/// The canonical working set for one invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedSet {
    pub records: Vec<CanonicalRecord>,
    pub report: NormalizeReport,
}

/// Parses a `time` value in the fixed `YYYY-MM-DD_HH-MM-SS` format.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT).ok()
}

fn time_value(raw: &RawRecord) -> Option<&Value> {
    raw.get(TIME_FIELD)
        .filter(|v| !v.is_null())
        .or_else(|| raw.get(LEGACY_TIME_FIELD).filter(|v| !v.is_null()))
}

fn camera_id(raw: &RawRecord) -> CameraId {
    match raw.get(CAMERA_FIELD) {
        None | Some(Value::Null) => CameraId::Unset,
        Some(Value::String(s)) => CameraId::Known(s.clone()),
        Some(other) => CameraId::Known(other.to_string()),
    }
}

fn legacy_counts(raw: &RawRecord) -> VehicleCounts {
    let mut counts = VehicleCounts::default();
    for category in Category::ALL {
        let value = legacy_columns(category)
            .iter()
            .find_map(|name| raw.get(*name))
            .map_or(0, count_value);
        counts.set(category, value);
    }
    counts
}

/// Normalizes one document.
///
/// # Errors
///
/// Returns a [`Rejection`] when the document has no usable time.
pub fn normalize_record(raw: &RawRecord, source: CountSource) -> Result<Normalized, Rejection> {
    let time = match time_value(raw) {
        None => return Err(Rejection::MissingTime),
        Some(Value::String(s)) => parse_time(s).ok_or_else(|| Rejection::InvalidTime(s.clone()))?,
        Some(other) => return Err(Rejection::InvalidTime(other.to_string())),
    };

    let (counts, payload) = match source {
        CountSource::Payload => {
            let decoded = CountPayload::classify(raw.get(COUNT_FIELD)).decode();
            (decoded.counts, decoded.status)
        }
        CountSource::LegacyColumns => (legacy_counts(raw), PayloadStatus::Empty),
    };

    Ok(Normalized {
        record: CanonicalRecord {
            time,
            camera_id: camera_id(raw),
            counts,
        },
        payload,
    })
}

/// Checks which fields the batch carries at all.
fn dataset_shape(raws: &[RawRecord]) -> (CountSource, Vec<DatasetWarning>) {
    let has = |name: &str| raws.iter().any(|r| r.contains_key(name));
    let mut warnings = Vec::new();

    if raws.is_empty() {
        return (CountSource::Payload, warnings);
    }

    if !has(TIME_FIELD) && !has(LEGACY_TIME_FIELD) {
        warnings.push(DatasetWarning::MissingTimeField);
    }
    if !has(CAMERA_FIELD) {
        warnings.push(DatasetWarning::MissingCameraField);
    }

    let source = if has(COUNT_FIELD) {
        CountSource::Payload
    } else {
        warnings.push(DatasetWarning::MissingCountField);
        for category in Category::ALL {
            if !legacy_columns(category).iter().any(|name| has(name)) {
                warnings.push(DatasetWarning::MissingCategoryColumn { category });
            }
        }
        CountSource::LegacyColumns
    };

    (source, warnings)
}

/// Normalizes a whole batch, dropping records without a valid time.
pub fn normalize_all(raws: &[RawRecord]) -> NormalizedSet {
    let (source, warnings) = dataset_shape(raws);
    for warning in &warnings {
        warn!(%warning, "Dataset shape warning");
    }

    let mut report = NormalizeReport {
        total_raw: raws.len(),
        warnings,
        ..Default::default()
    };
    let mut records = Vec::with_capacity(raws.len());

    for raw in raws {
        match normalize_record(raw, source) {
            Ok(normalized) => {
                match normalized.payload {
                    PayloadStatus::Malformed(_) => report.malformed_payloads += 1,
                    PayloadStatus::Empty => report.empty_payloads += 1,
                    PayloadStatus::Parsed => {}
                }
                records.push(normalized.record);
            }
            Err(rejection) => {
                debug!(?rejection, "Dropping record");
                report.dropped_invalid_time += 1;
            }
        }
    }
    report.kept = records.len();

    if report.dropped_invalid_time > 0 {
        warn!(
            dropped = report.dropped_invalid_time,
            "{} records dropped for invalid time", report.dropped_invalid_time
        );
    }
    info!(
        total = report.total_raw,
        kept = report.kept,
        malformed_payloads = report.malformed_payloads,
        "Normalized records"
    );

    NormalizedSet { records, report }
}
