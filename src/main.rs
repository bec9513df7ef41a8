use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use compostwatch::{
    acquisition::run_acquisition, transport::SimLink, Database, MonitorConfig, SnapshotPublisher,
};

/// Only run mode so far; the production BLE link plugs in behind the
/// same `SensorLink` trait when the radio bridge lands.
fn parse_args() -> Result<PathBuf> {
    let mut config_path = PathBuf::from("compostwatch.json");
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = args
                    .next()
                    .map(PathBuf::from)
                    .context("--config requires a path")?;
            }
            "--help" | "-h" => {
                println!("usage: compostwatch [--config <path>]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(config_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = parse_args()?;
    let config = MonitorConfig::load(&config_path)?;
    info!(
        "compostwatch starting (db {}, snapshot {})",
        config.database_path.display(),
        config.snapshot_path.display()
    );

    // Storage failure at startup is the one fatal path; everything after
    // this funnels into the retry scheduler.
    let db = Database::new(config.database_path.clone())?;
    let publisher = SnapshotPublisher::new(config.snapshot_path.clone());

    let primary = SimLink::new(&config.compost_device_name, rand::random());
    let scrap = SimLink::new(&config.scrap_device_name, rand::random());

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    run_acquisition(primary, scrap, db, config, publisher, cancel_token).await;

    info!("compostwatch stopped");
    Ok(())
}
