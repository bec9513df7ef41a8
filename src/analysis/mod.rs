//! The decision engine: pure functions from persisted history and the
//! current reading to an advisory and actuator directives. Nothing in
//! here touches the database, the clock, or the transport.

pub mod advisory;
pub mod readiness;
pub mod scraps;
pub mod trend;

pub use advisory::{evaluate, AdvisoryResult, AlertLevel, AmbientBand};
pub use readiness::days_elapsed;
pub use trend::{compute_trends, Trend};
