pub mod reading;
pub mod scrap;
pub mod snapshot;

pub use reading::{DailyAggregate, Reading};
pub use scrap::ScrapState;
pub use snapshot::UiSnapshot;
