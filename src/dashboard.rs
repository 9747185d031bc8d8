//! Shapes aggregated data into the tables the dashboard renders.
//!
//! Nothing here sums counts on its own: every hourly table comes from
//! [`hourly_series`], so the overall and per-camera views always agree on
//! aggregation rules.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyzers::aggregate::{camera_series, hourly_series};
use crate::analyzers::types::{DenseHourlySeries, HourlyRow, LongRow, RawRow};
use crate::normalize::{NormalizeReport, NormalizedSet, normalize_all};
use crate::record::{CameraId, CanonicalRecord, Category, RawRecord};

/// Every table for one view (overall or a single camera).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    /// `None` for the overall view.
    pub camera_id: Option<CameraId>,
    pub record_count: usize,
    /// Chronological series, used for the time-axis chart.
    pub series: DenseHourlySeries,
    /// The same rows ordered by descending total.
    pub sorted: Vec<HourlyRow>,
    /// One row per hour and category.
    pub long: Vec<LongRow>,
    pub raw: Vec<RawRow>,
}

impl View {
    fn build(camera_id: Option<CameraId>, records: Vec<&CanonicalRecord>) -> Self {
        let series = hourly_series(records.iter().copied());
        Self {
            camera_id,
            record_count: records.len(),
            sorted: series.sorted_by_total(),
            long: melt(&series),
            raw: records.into_iter().map(RawRow::from).collect(),
            series,
        }
    }
}

/// Number of records seen from one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraSummary {
    pub camera_id: CameraId,
    pub record_count: usize,
}

/// Reshapes a series into long form: for every hour, one row per category.
pub fn melt(series: &DenseHourlySeries) -> Vec<LongRow> {
    series
        .rows()
        .iter()
        .flat_map(|row| {
            let counts = row.counts();
            Category::ALL.into_iter().map(move |category| LongRow {
                hour: row.hour,
                vehicle_type: category,
                vehicle_count: counts.get(category),
            })
        })
        .collect()
}

/// The canonical working set plus everything derived from it.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    records: Vec<CanonicalRecord>,
    report: NormalizeReport,
}

impl Dashboard {
    pub fn from_raw(raws: &[RawRecord]) -> Self {
        normalize_all(raws).into()
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn report(&self) -> &NormalizeReport {
        &self.report
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct cameras in the order they first appear.
    pub fn cameras(&self) -> Vec<CameraId> {
        let mut seen = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.camera_id) {
                seen.push(record.camera_id.clone());
            }
        }
        seen
    }

    pub fn camera_summaries(&self) -> Vec<CameraSummary> {
        self.cameras()
            .into_iter()
            .map(|camera_id| CameraSummary {
                record_count: self.records.iter().filter(|r| r.camera_id == camera_id).count(),
                camera_id,
            })
            .collect()
    }

    /// The camera selected when the user has not picked one.
    pub fn default_camera(&self) -> Option<CameraId> {
        self.records.first().map(|r| r.camera_id.clone())
    }

    pub fn overall(&self) -> View {
        View::build(None, self.records.iter().collect())
    }

    pub fn camera_view(&self, camera: &CameraId) -> View {
        let records = self.records.iter().filter(|r| &r.camera_id == camera).collect();
        View::build(Some(camera.clone()), records)
    }

    /// Hourly series for one camera, without the derived tables.
    pub fn camera_series(&self, camera: &CameraId) -> DenseHourlySeries {
        camera_series(&self.records, camera)
    }

    /// Everything one render needs: overall view, camera list and, when a
    /// camera is selected (or a default exists), that camera's view.
    pub fn snapshot(&self, selected: Option<&CameraId>) -> DashboardSnapshot {
        let selected = selected.cloned().or_else(|| self.default_camera());
        DashboardSnapshot {
            generated_at: Utc::now(),
            report: self.report.clone(),
            cameras: self.camera_summaries(),
            overall: self.overall(),
            selected: selected.as_ref().map(|camera| self.camera_view(camera)),
        }
    }
}

impl From<NormalizedSet> for Dashboard {
    fn from(set: NormalizedSet) -> Self {
        Self {
            records: set.records,
            report: set.report,
        }
    }
}

/// Serializable bundle handed to the rendering sink.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub report: NormalizeReport,
    pub cameras: Vec<CameraSummary>,
    pub overall: View,
    pub selected: Option<View>,
}
