//! Table rows produced by the aggregation pipeline.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::record::{CameraId, CanonicalRecord, Category, VehicleCounts};

/// Display format for hour buckets, e.g. `2024-01-01 08:00`.
pub const HOUR_LABEL_FORMAT: &str = "%Y-%m-%d %H:00";
/// Display format for record times in the raw table.
pub const TIME_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn hour_label<S: Serializer>(hour: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&hour.format(HOUR_LABEL_FORMAT))
}

fn time_label<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(TIME_LABEL_FORMAT))
}

/// One hour of summed counts. Columns: `hour, car, truck, motorcycle, bus, total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyRow {
    #[serde(serialize_with = "hour_label")]
    pub hour: NaiveDateTime,
    pub car: u64,
    pub truck: u64,
    pub motorcycle: u64,
    pub bus: u64,
    pub total: u64,
}

impl HourlyRow {
    pub fn new(hour: NaiveDateTime, counts: VehicleCounts) -> Self {
        Self {
            hour,
            car: counts.car,
            truck: counts.truck,
            motorcycle: counts.motorcycle,
            bus: counts.bus,
            total: counts.total(),
        }
    }

    pub fn zero(hour: NaiveDateTime) -> Self {
        Self::new(hour, VehicleCounts::default())
    }

    pub fn counts(&self) -> VehicleCounts {
        VehicleCounts::new(self.car, self.truck, self.motorcycle, self.bus)
    }
}

/// Hourly rows covering every hour of the observed range, oldest first.
///
/// Built only by [`hourly_series`](crate::analyzers::aggregate::hourly_series),
/// which guarantees the hours are contiguous and unique.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DenseHourlySeries {
    rows: Vec<HourlyRow>,
}

impl DenseHourlySeries {
    pub(crate) fn from_rows(rows: Vec<HourlyRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[HourlyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, hour: NaiveDateTime) -> Option<&HourlyRow> {
        self.rows
            .binary_search_by_key(&hour, |row| row.hour)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// First and last hour of the series.
    pub fn span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((self.rows.first()?.hour, self.rows.last()?.hour))
    }

    /// Rows ordered by descending total; ties keep chronological order.
    pub fn sorted_by_total(&self) -> Vec<HourlyRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        rows
    }
}

/// One (hour, category) cell of the long table used for multi-series charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LongRow {
    #[serde(serialize_with = "hour_label")]
    pub hour: NaiveDateTime,
    pub vehicle_type: Category,
    pub vehicle_count: u64,
}

/// A canonical record as shown in the raw table.
/// Columns: `camera_id, time, car, truck, motorcycle, bus, total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub camera_id: CameraId,
    #[serde(serialize_with = "time_label")]
    pub time: NaiveDateTime,
    pub car: u64,
    pub truck: u64,
    pub motorcycle: u64,
    pub bus: u64,
    pub total: u64,
}

impl From<&CanonicalRecord> for RawRow {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            camera_id: record.camera_id.clone(),
            time: record.time,
            car: record.counts.car,
            truck: record.counts.truck,
            motorcycle: record.counts.motorcycle,
            bus: record.counts.bus,
            total: record.total(),
        }
    }
}
