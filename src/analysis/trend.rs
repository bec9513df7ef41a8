//! Trend computation over recent daily aggregates.
//!
//! Answers one question per metric: is it rising, falling, or flat? The
//! slope is an ordinary-least-squares fit of the daily mean against a
//! small recency ordinal, so only the last few days of history influence
//! the advisory rules.

use chrono::NaiveDate;

use crate::db::models::DailyAggregate;

/// How far back (in days from today) an aggregate may be and still count.
const MAX_AGE_DAYS: i64 = 4;

/// Signed rate of change per metric. Positive = rising, negative =
/// falling, zero = flat or not enough data to tell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trend {
    pub temp: f64,
    pub moisture: f64,
}

/// Compute temperature and moisture slopes from the most recent daily
/// aggregates (callers pass at most the 7 newest days).
///
/// Days older than [`MAX_AGE_DAYS`] are dropped; each kept day gets the
/// integer offset `(day - today) + 5`, so the newest possible day maps to
/// 5 and the oldest kept day to 1. Fewer than 2 qualifying days means the
/// slope is indeterminate and both metrics report 0.
pub fn compute_trends(aggregates: &[DailyAggregate], today: NaiveDate) -> Trend {
    let mut offsets = Vec::new();
    let mut temps = Vec::new();
    let mut moistures = Vec::new();

    for agg in aggregates {
        let age = (agg.day - today).num_days();
        if age.abs() < MAX_AGE_DAYS + 1 {
            offsets.push((age + 5) as f64);
            temps.push(agg.avg_temp_f);
            moistures.push(agg.avg_moisture);
        }
    }

    if offsets.len() < 2 {
        return Trend::default();
    }

    Trend {
        temp: ols_slope(&offsets, &temps),
        moisture: ols_slope(&offsets, &moistures),
    }
}

/// Closed-form single-variable least-squares slope:
/// Σ(xᵢ−x̄)(yᵢ−ȳ) / Σ(xᵢ−x̄)².
fn ols_slope(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean) * (x - x_mean);
    }

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(today: NaiveDate, offset: i64) -> NaiveDate {
        today + chrono::Duration::days(offset)
    }

    fn agg(day: NaiveDate, temp: f64, moisture: f64) -> DailyAggregate {
        DailyAggregate {
            day,
            avg_temp_f: temp,
            avg_moisture: moisture,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn fewer_than_two_days_is_flat() {
        let t = today();
        assert_eq!(compute_trends(&[], t), Trend::default());
        assert_eq!(
            compute_trends(&[agg(t, 150.0, 50.0)], t),
            Trend::default()
        );
    }

    #[test]
    fn stale_days_are_ignored() {
        let t = today();
        // One recent day plus one outside the 4-day window: still flat.
        let aggs = vec![
            agg(day(t, 0), 150.0, 50.0),
            agg(day(t, -6), 100.0, 30.0),
        ];
        assert_eq!(compute_trends(&aggs, t), Trend::default());
    }

    #[test]
    fn evenly_spaced_rise_gives_exact_slope() {
        let t = today();
        // Five consecutive days warming 10°F per day.
        let aggs: Vec<_> = (0..5)
            .map(|i| agg(day(t, -4 + i), 100.0 + 10.0 * i as f64, 50.0))
            .collect();
        let trend = compute_trends(&aggs, t);
        assert!((trend.temp - 10.0).abs() < 1e-9);
        assert!(trend.moisture.abs() < 1e-9);
    }

    #[test]
    fn falling_moisture_has_negative_slope() {
        let t = today();
        let aggs = vec![
            agg(day(t, -2), 140.0, 60.0),
            agg(day(t, -1), 140.0, 55.0),
            agg(day(t, 0), 140.0, 48.0),
        ];
        let trend = compute_trends(&aggs, t);
        assert!(trend.moisture < 0.0);
        assert_eq!(trend.temp, 0.0);
    }

    #[test]
    fn order_of_aggregates_does_not_matter() {
        let t = today();
        let mut aggs: Vec<_> = (0..4)
            .map(|i| agg(day(t, -i), 150.0 - 5.0 * i as f64, 50.0))
            .collect();
        let forward = compute_trends(&aggs, t);
        aggs.reverse();
        let backward = compute_trends(&aggs, t);
        assert_eq!(forward, backward);
        assert!(forward.temp > 0.0);
    }
}
