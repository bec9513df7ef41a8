pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod db;
pub mod publish;
pub mod transport;
pub mod utils;

pub use config::MonitorConfig;
pub use db::Database;
pub use publish::SnapshotPublisher;
