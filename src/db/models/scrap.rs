use serde::{Deserialize, Serialize};

/// Kitchen scrap bin state: current fill level plus the running weight
/// estimate of everything ever emptied into the pile. Exactly one row
/// lives in the database and is overwritten on each sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapState {
    pub last_scrap_level: i64,
    /// Estimated pounds added over the life of the pile. Never decreases.
    pub total_scraps: f64,
}
