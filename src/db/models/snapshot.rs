//! Dashboard snapshot model.
//!
//! Flat projection of the latest advisory plus the raw reading it was
//! derived from. One row in the database and one JSON artifact on disk,
//! both fully overwritten every successful cycle.

use serde::{Deserialize, Serialize};

use crate::analysis::advisory::AdvisoryResult;
use crate::db::models::Reading;

/// The one externally visible summary of the system. Field names follow
/// the dashboard's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub days_elapsed: i64,
    pub temp_f: f64,
    pub temp_c: f64,
    pub moisture: f64,
    pub methane: f64,
    pub water_level_text: String,
    pub scrap_level_text: String,
    pub total_scraps: f64,
    pub message: String,
    pub temp_alert: String,
    pub moist_alert: String,
    pub methane_alert: String,
    pub water_alert: String,
    pub scrap_alert: String,
    /// Seconds since the Unix epoch, same clock as the reading history.
    pub timestamp: i64,
}

impl UiSnapshot {
    /// Flatten an advisory and the reading it was computed from into the
    /// dashboard projection.
    pub fn compose(advisory: &AdvisoryResult, reading: &Reading, total_scraps: f64) -> Self {
        Self {
            days_elapsed: advisory.days_elapsed,
            temp_f: reading.temp_f,
            temp_c: reading.temp_c,
            moisture: reading.moisture,
            methane: reading.methane,
            water_level_text: advisory.water_level_text.clone(),
            scrap_level_text: advisory.scrap_level_text.clone(),
            total_scraps,
            message: advisory.message.clone(),
            temp_alert: advisory.temp_alert.as_css().to_string(),
            moist_alert: advisory.moist_alert.as_css().to_string(),
            methane_alert: advisory.methane_alert.as_css().to_string(),
            water_alert: advisory.water_alert.as_css().to_string(),
            scrap_alert: advisory.scrap_alert.as_css().to_string(),
            timestamp: reading.timestamp,
        }
    }
}
