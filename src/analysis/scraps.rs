//! Kitchen scrap fill-level tracking.
//!
//! Notification samples carry the current bin fill level. A near-zero
//! sample means the bin was emptied into the pile since the last sample,
//! so the previous level is converted to an estimated weight and banked
//! into the running total.

use crate::config::MonitorConfig;
use crate::db::models::ScrapState;

/// Loosely packed kitchen scraps: 300 lb per cubic yard, 764555 cm³ per
/// cubic yard.
const LBS_PER_CUBIC_CM: f64 = 300.0 / 764_555.0;

/// Fold one fill-level sample into the scrap state.
///
/// The returned `total_scraps` is always >= the previous total; an
/// emptied bin adds `previous level x footprint area x density` pounds
/// and resets the level to zero.
pub fn apply_sample(state: &ScrapState, sample: i64, config: &MonitorConfig) -> ScrapState {
    if sample < 1 {
        let lbs_added =
            state.last_scrap_level as f64 * config.bin_footprint_cm2() * LBS_PER_CUBIC_CM;
        ScrapState {
            last_scrap_level: 0,
            total_scraps: state.total_scraps + lbs_added,
        }
    } else {
        ScrapState {
            last_scrap_level: sample,
            total_scraps: state.total_scraps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::default()
    }

    #[test]
    fn normal_sample_just_stores_the_level() {
        let state = ScrapState {
            last_scrap_level: 5,
            total_scraps: 2.0,
        };
        let next = apply_sample(&state, 8, &config());
        assert_eq!(next.last_scrap_level, 8);
        assert_eq!(next.total_scraps, 2.0);
    }

    #[test]
    fn empty_event_banks_the_previous_level() {
        let state = ScrapState {
            last_scrap_level: 10,
            total_scraps: 0.0,
        };
        let next = apply_sample(&state, 0, &config());
        assert_eq!(next.last_scrap_level, 0);
        let expected = 10.0 * 250.0 * LBS_PER_CUBIC_CM;
        assert!((next.total_scraps - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_event_with_empty_history_adds_nothing() {
        let next = apply_sample(&ScrapState::default(), 0, &config());
        assert_eq!(next, ScrapState::default());
    }

    #[test]
    fn total_is_monotone_across_any_sample_sequence() {
        let cfg = config();
        let samples = [3, 7, 12, 0, 4, 9, 0, 0, 2, 16, 0];
        let mut state = ScrapState::default();
        for sample in samples {
            let next = apply_sample(&state, sample, &cfg);
            assert!(next.total_scraps >= state.total_scraps);
            state = next;
        }
        assert!(state.total_scraps > 0.0);
    }
}
