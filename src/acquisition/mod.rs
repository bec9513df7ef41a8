pub mod loop_worker;

pub use loop_worker::{
    handle_scrap_sample, perform_primary_cycle, run_acquisition, CycleOutcome,
};
