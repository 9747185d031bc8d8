use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

/// Truncates a time to the start of its hour.
pub fn floor_hour(time: NaiveDateTime) -> NaiveDateTime {
    time.date().and_time(NaiveTime::default()) + TimeDelta::hours(i64::from(time.hour()))
}

/// Every hour from `start` to `end` inclusive, one hour apart.
/// Empty when `end` is before `start`.
pub fn hour_range(start: NaiveDateTime, end: NaiveDateTime) -> impl Iterator<Item = NaiveDateTime> {
    std::iter::successors(Some(start), |h| h.checked_add_signed(TimeDelta::hours(1)))
        .take_while(move |h| *h <= end)
}
