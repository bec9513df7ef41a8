use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Every tunable the monitor reads: alert thresholds, retry intervals,
/// device names, and output paths. Loaded once at startup and passed by
/// reference into the analysis and acquisition code; nothing reads
/// ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// SQLite database holding reading history and scrap state.
    pub database_path: PathBuf,
    /// Flat JSON artifact consumed by the dashboard.
    pub snapshot_path: PathBuf,

    /// Advertised name of the compost sensor array.
    pub compost_device_name: String,
    /// Advertised name of the kitchen scrap bin.
    pub scrap_device_name: String,

    /// Core temperature bands (°F), highest to lowest.
    pub temp_danger_f: f64,
    pub temp_high_f: f64,
    /// Baseline: the top of the optimal band, and the bar a day's mean
    /// must clear to count toward readiness.
    pub temp_ok_f: f64,
    pub temp_low_f: f64,

    /// Moisture bands (%).
    pub moist_high: f64,
    pub moist_low: f64,

    /// Kitchen bin fill-level tiers.
    pub scrap_high: i64,
    pub scrap_medium: i64,

    /// Ambient at or below this is classified Low (cover-the-pile weather).
    pub ambient_cold_f: f64,

    /// Days at safe temperature before the pile enters the curing stage.
    pub safe_temp_days: i64,
    /// Total elapsed days before the pile is ready for a new layer.
    pub ready_days: i64,

    /// Methane tiers (ppm).
    pub methane_danger_ppm: f64,
    pub methane_warning_ppm: f64,

    /// Kitchen bin footprint, used to estimate scrap weight on emptying.
    pub bin_width_cm: f64,
    pub bin_length_cm: f64,

    /// Reschedule interval after a successful acquisition cycle.
    pub found_retry_secs: u64,
    /// Reschedule interval after discovery failure or any cycle error.
    pub not_found_retry_secs: u64,
    /// Per-iteration bound on the scrap notification wait.
    pub notification_wait_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("smart_compost.db"),
            snapshot_path: PathBuf::from("currentReadings.json"),
            compost_device_name: "Compost".into(),
            scrap_device_name: "KitchenBin".into(),
            temp_danger_f: 175.0,
            temp_high_f: 160.0,
            temp_ok_f: 140.0,
            temp_low_f: 90.0,
            moist_high: 60.0,
            moist_low: 40.0,
            scrap_high: 20,
            scrap_medium: 10,
            ambient_cold_f: 40.0,
            safe_temp_days: 25,
            ready_days: 35,
            methane_danger_ppm: 50_000.0,
            methane_warning_ppm: 10_000.0,
            bin_width_cm: 25.0,
            bin_length_cm: 10.0,
            found_retry_secs: 3_600,
            not_found_retry_secs: 300,
            notification_wait_secs: 1,
        }
    }
}

impl MonitorConfig {
    /// Load from a JSON file; a missing file means defaults, an unreadable
    /// or malformed file is an error (silently running with the wrong
    /// thresholds would be worse than failing at startup).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Bin footprint area in cm², the fixed part of the volume estimate.
    pub fn bin_footprint_cm2(&self) -> f64 {
        self.bin_width_cm * self.bin_length_cm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_thresholds() {
        let config = MonitorConfig::default();
        assert_eq!(config.temp_danger_f, 175.0);
        assert_eq!(config.temp_ok_f, 140.0);
        assert_eq!(config.safe_temp_days, 25);
        assert_eq!(config.ready_days, 35);
        assert_eq!(config.bin_footprint_cm2(), 250.0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = MonitorConfig::load(Path::new("/nonexistent/compostwatch.json")).unwrap();
        assert_eq!(config.not_found_retry_secs, 300);
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("compostwatch-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"temp_danger_f": 180.0}"#).unwrap();
        let config = MonitorConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.temp_danger_f, 180.0);
        assert_eq!(config.temp_high_f, 160.0);
    }
}
