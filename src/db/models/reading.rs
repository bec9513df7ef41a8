//! Sensor reading data models.
//!
//! A `Reading` is one successful acquisition cycle's worth of raw sensor
//! values; the history of readings is append-only and everything else the
//! monitor knows (trends, readiness) is derived from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw sensor values captured in a single acquisition cycle.
/// Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: Option<i64>,
    pub temp_f: f64,
    pub temp_c: f64,
    pub ambient_temp_f: f64,
    pub ambient_temp_c: f64,
    /// Percent.
    pub moisture: f64,
    /// Parts per million.
    pub methane: f64,
    /// Reservoir level, raw integer from the sensor.
    pub water_level: i64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

/// Per-calendar-day mean of the stored readings. Never persisted on its
/// own; recomputed from the readings table on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    /// Local calendar day the readings fell on.
    pub day: NaiveDate,
    pub avg_temp_f: f64,
    pub avg_moisture: f64,
}
