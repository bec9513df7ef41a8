//! Readiness projection: how many days has the pile spent at composting
//! temperature, and is it past the curing point?
//!
//! Recomputed from the full daily history each cycle. There is no stored
//! state machine, so the projection is idempotent and survives restarts.

use chrono::NaiveDate;

use crate::db::models::DailyAggregate;

/// Project total elapsed composting days from the daily history.
///
/// A day qualifies when its mean temperature exceeds `baseline_temp_f`.
/// Counting caps at `safe_temp_days`; the day the cap is reached is
/// remembered. Once capped, the projection keeps growing with the
/// calendar: days since the cap day plus the cap itself. Below the cap
/// the raw qualifying-day count is returned.
///
/// Downstream, the result gates the Building / Curing / Ready phases.
pub fn days_elapsed(
    aggregates: &[DailyAggregate],
    today: NaiveDate,
    baseline_temp_f: f64,
    safe_temp_days: i64,
) -> i64 {
    let mut qualifying = 0i64;
    let mut cap_day: Option<NaiveDate> = None;

    let mut ordered: Vec<&DailyAggregate> = aggregates.iter().collect();
    ordered.sort_by_key(|agg| agg.day);

    for agg in ordered {
        if agg.avg_temp_f > baseline_temp_f && qualifying < safe_temp_days {
            qualifying += 1;
            if qualifying == safe_temp_days {
                cap_day = Some(agg.day);
            }
        }
    }

    match cap_day {
        Some(day) => (today - day).num_days().abs() + safe_temp_days,
        None => qualifying,
    }
}
