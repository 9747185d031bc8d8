use crate::analyzers::types::{DenseHourlySeries, HourlyRow};
use crate::analyzers::utility::{floor_hour, hour_range};
use crate::record::{CameraId, CanonicalRecord, VehicleCounts};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregates records into a [`DenseHourlySeries`].
///
/// Records are bucketed by the hour they fall in and their category counts
/// summed. The series then covers every hour from the earliest record's hour
/// through the latest record's hour, with zero rows for hours nothing was
/// recorded in. No records means an empty series.
///
/// The global view and the per-camera view both go through here; they differ
/// only in which records are passed in.
pub fn hourly_series<'a, I>(records: I) -> DenseHourlySeries
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut buckets: BTreeMap<NaiveDateTime, VehicleCounts> = BTreeMap::new();
    let mut record_count = 0usize;

    for record in records {
        record_count += 1;
        buckets
            .entry(floor_hour(record.time))
            .or_default()
            .accumulate(&record.counts);
    }

    // BTreeMap keys are ordered, so the first and last buckets bound the range.
    let (Some(start), Some(end)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return DenseHourlySeries::default();
    };

    let rows: Vec<HourlyRow> = hour_range(start, end)
        .map(|hour| match buckets.get(&hour) {
            Some(counts) => HourlyRow::new(hour, *counts),
            None => HourlyRow::zero(hour),
        })
        .collect();

    debug!(
        record_count,
        hours = rows.len(),
        filled = rows.len() - buckets.len(),
        "Built hourly series"
    );

    DenseHourlySeries::from_rows(rows)
}

/// Aggregates only the records from `camera`.
pub fn camera_series(records: &[CanonicalRecord], camera: &CameraId) -> DenseHourlySeries {
    hourly_series(records.iter().filter(|r| &r.camera_id == camera))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_time;

    fn rec(time: &str, camera: &str, counts: VehicleCounts) -> CanonicalRecord {
        CanonicalRecord {
            time: parse_time(time).unwrap(),
            camera_id: CameraId::Known(camera.to_string()),
            counts,
        }
    }

    fn hour(label: &str) -> NaiveDateTime {
        parse_time(label).unwrap()
    }

    fn scenario() -> Vec<CanonicalRecord> {
        vec![
            rec("2024-01-01_08-05-00", "A", VehicleCounts::new(2, 1, 0, 0)),
            rec("2024-01-01_08-40-00", "A", VehicleCounts::new(1, 0, 0, 0)),
            rec("2024-01-01_10-10-00", "B", VehicleCounts::new(0, 0, 0, 3)),
        ]
    }

    #[test]
    fn test_scenario_dense_series() {
        let series = hourly_series(&scenario());
        let rows = series.rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            HourlyRow::new(hour("2024-01-01_08-00-00"), VehicleCounts::new(3, 1, 0, 0))
        );
        assert_eq!(rows[0].total, 4);
        assert_eq!(rows[1], HourlyRow::zero(hour("2024-01-01_09-00-00")));
        assert_eq!(rows[2].hour, hour("2024-01-01_10-00-00"));
        assert_eq!(rows[2].bus, 3);
        assert_eq!(rows[2].total, 3);
    }

    #[test]
    fn test_sorted_by_total_keeps_series_chronological() {
        let series = hourly_series(&scenario());
        let sorted: Vec<_> = series.sorted_by_total().iter().map(|r| r.total).collect();
        assert_eq!(sorted, vec![4, 3, 0]);
        assert_eq!(series.rows()[1].total, 0);
    }

    #[test]
    fn test_sorted_by_total_ties_are_chronological() {
        let records = vec![
            rec("2024-01-01_08-00-00", "A", VehicleCounts::new(1, 0, 0, 0)),
            rec("2024-01-01_09-00-00", "A", VehicleCounts::new(0, 1, 0, 0)),
        ];
        let sorted = hourly_series(&records).sorted_by_total();
        assert_eq!(sorted[0].hour, hour("2024-01-01_08-00-00"));
        assert_eq!(sorted[1].hour, hour("2024-01-01_09-00-00"));
    }

    #[test]
    fn test_range_ends_at_latest_observed_hour() {
        let series = hourly_series(&scenario());
        assert_eq!(
            series.span(),
            Some((hour("2024-01-01_08-00-00"), hour("2024-01-01_10-00-00")))
        );
        assert!(series.get(hour("2024-01-01_11-00-00")).is_none());
    }

    #[test]
    fn test_empty_input_gives_empty_series() {
        let series = hourly_series(&Vec::<CanonicalRecord>::new());
        assert!(series.is_empty());
        assert_eq!(series.span(), None);
        assert!(series.sorted_by_total().is_empty());
    }

    #[test]
    fn test_single_record_on_the_hour() {
        let records = vec![rec("2024-01-01_10-00-00", "A", VehicleCounts::new(1, 1, 1, 1))];
        let series = hourly_series(&records);
        assert_eq!(series.len(), 1);
        assert_eq!(series.rows()[0].total, 4);
    }

    #[test]
    fn test_every_hour_present_once_and_totals_hold() {
        let records = vec![
            rec("2024-01-01_22-30-00", "A", VehicleCounts::new(1, 0, 0, 0)),
            rec("2024-01-02_03-15-00", "B", VehicleCounts::new(0, 2, 1, 0)),
        ];
        let series = hourly_series(&records);
        let (start, end) = series.span().unwrap();
        let expected: Vec<_> = hour_range(start, end).collect();
        let actual: Vec<_> = series.rows().iter().map(|r| r.hour).collect();

        assert_eq!(actual, expected);
        assert_eq!(series.len(), 6);
        for row in series.rows() {
            assert_eq!(row.total, row.car + row.truck + row.motorcycle + row.bus);
        }
    }

    #[test]
    fn test_camera_series_is_dominated_by_global() {
        let records = scenario();
        let global = hourly_series(&records);
        let cam_a = camera_series(&records, &CameraId::Known("A".into()));

        assert_eq!(cam_a.len(), 1);
        for row in cam_a.rows() {
            let g = global.get(row.hour).unwrap();
            assert!(g.car >= row.car);
            assert!(g.truck >= row.truck);
            assert!(g.motorcycle >= row.motorcycle);
            assert!(g.bus >= row.bus);
            assert!(g.total >= row.total);
        }
    }

    #[test]
    fn test_camera_series_for_unknown_camera_is_empty() {
        let series = camera_series(&scenario(), &CameraId::Known("Z".into()));
        assert!(series.is_empty());
    }

    #[test]
    fn test_unset_camera_is_its_own_group() {
        let mut records = scenario();
        records.push(CanonicalRecord {
            time: parse_time("2024-01-01_08-10-00").unwrap(),
            camera_id: CameraId::Unset,
            counts: VehicleCounts::new(5, 0, 0, 0),
        });
        let unset = camera_series(&records, &CameraId::Unset);
        assert_eq!(unset.rows()[0].car, 5);

        let cam_a = camera_series(&records, &CameraId::Known("A".into()));
        assert_eq!(cam_a.rows()[0].car, 3);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let records = scenario();
        assert_eq!(hourly_series(&records), hourly_series(&records));
    }
}
