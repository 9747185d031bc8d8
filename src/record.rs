//! Record types shared by the normalization and aggregation stages.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// A document exactly as the store returned it.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Format of the `time` field written by the camera uploaders.
pub const TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// The four vehicle categories tracked per record, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Car,
    Truck,
    Motorcycle,
    Bus,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Car,
        Category::Truck,
        Category::Motorcycle,
        Category::Bus,
    ];

    /// Key used both in count payloads and in output column names.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Car => "car",
            Category::Truck => "truck",
            Category::Motorcycle => "motorcycle",
            Category::Bus => "bus",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category vehicle counts. The total is always derived, never stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VehicleCounts {
    pub car: u64,
    pub truck: u64,
    pub motorcycle: u64,
    pub bus: u64,
}

impl VehicleCounts {
    pub fn new(car: u64, truck: u64, motorcycle: u64, bus: u64) -> Self {
        Self {
            car,
            truck,
            motorcycle,
            bus,
        }
    }

    /// Sum of all categories, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.car
            .saturating_add(self.truck)
            .saturating_add(self.motorcycle)
            .saturating_add(self.bus)
    }

    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Car => self.car,
            Category::Truck => self.truck,
            Category::Motorcycle => self.motorcycle,
            Category::Bus => self.bus,
        }
    }

    pub fn set(&mut self, category: Category, value: u64) {
        match category {
            Category::Car => self.car = value,
            Category::Truck => self.truck = value,
            Category::Motorcycle => self.motorcycle = value,
            Category::Bus => self.bus = value,
        }
    }

    /// Adds `other` into `self`, saturating instead of wrapping.
    pub fn accumulate(&mut self, other: &VehicleCounts) {
        self.car = self.car.saturating_add(other.car);
        self.truck = self.truck.saturating_add(other.truck);
        self.motorcycle = self.motorcycle.saturating_add(other.motorcycle);
        self.bus = self.bus.saturating_add(other.bus);
    }
}

/// Which camera a record came from.
///
/// Records without a `cctv_no` form their own `Unset` group so they are
/// never folded into a real camera's numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CameraId {
    Known(String),
    Unset,
}

impl CameraId {
    /// Parses a camera selection typed by a user. `"unknown"` selects the
    /// unset group.
    pub fn from_selection(value: &str) -> Self {
        if value == UNSET_CAMERA_LABEL {
            CameraId::Unset
        } else {
            CameraId::Known(value.to_string())
        }
    }
}

/// Label used wherever the unset camera group is displayed.
pub const UNSET_CAMERA_LABEL: &str = "unknown";

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::Known(id) => f.write_str(id),
            CameraId::Unset => f.write_str(UNSET_CAMERA_LABEL),
        }
    }
}

impl Serialize for CameraId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated observation: parsed time, camera and category counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub time: NaiveDateTime,
    pub camera_id: CameraId,
    pub counts: VehicleCounts,
}

impl CanonicalRecord {
    pub fn total(&self) -> u64 {
        self.counts.total()
    }
}
