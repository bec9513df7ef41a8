use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::{self, AdvisoryResult, AmbientBand},
    config::MonitorConfig,
    db::{
        models::{Reading, UiSnapshot},
        Database,
    },
    publish::SnapshotPublisher,
    transport::{Channel, SensorLink},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

/// Daily aggregates fed into the trend fit.
const TREND_WINDOW_DAYS: u32 = 7;
/// Upper bound on one full primary cycle (discover through publish).
const CYCLE_TIMEOUT_SECS: u64 = 60;

/// How one primary acquisition attempt ended. The scheduler dispatches
/// on this instead of on caught faults.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing advertising the device name answered the scan.
    NotFound,
    /// Full cycle ran: reading persisted, actuators written, snapshot
    /// published.
    Completed(AdvisoryResult),
}

/// Drive both links until cancelled.
///
/// One cooperative loop owns everything: the primary link polls the
/// sensor array on a long interval (short after any failure), the
/// secondary link sits in a bounded notification wait for kitchen bin
/// samples. No link work ever runs concurrently with the other.
pub async fn run_acquisition<P, S>(
    mut primary: P,
    mut scrap: S,
    db: Database,
    config: MonitorConfig,
    publisher: SnapshotPublisher,
    cancel_token: CancellationToken,
) where
    P: SensorLink,
    S: SensorLink,
{
    let mut ticker = time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let short_retry = Duration::from_secs(config.not_found_retry_secs);
    let long_retry = Duration::from_secs(config.found_retry_secs);
    let notification_wait = Duration::from_secs(config.notification_wait_secs);

    let mut primary_next = Instant::now();
    let mut scrap_next = Instant::now();
    let mut scrap_connected = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if scrap_connected {
                    match scrap.next_notification(notification_wait).await {
                        Ok(Some(sample)) => {
                            if let Err(err) = handle_scrap_sample(&db, &config, sample).await {
                                log_error!("failed to record scrap sample {sample}: {err:?}");
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            log_warn!("scrap link dropped: {err:?}");
                            let _ = scrap.disconnect().await;
                            scrap_connected = false;
                            scrap_next = Instant::now() + short_retry;
                        }
                    }
                } else if Instant::now() >= scrap_next {
                    match attach_scrap_link(&mut scrap, &config).await {
                        Ok(true) => {
                            scrap_connected = true;
                            log_info!(
                                "connected to {} and waiting for notifications",
                                config.scrap_device_name
                            );
                        }
                        Ok(false) => {
                            scrap_next = Instant::now() + short_retry;
                        }
                        Err(err) => {
                            log_warn!("scrap link attach failed: {err:?}");
                            let _ = scrap.disconnect().await;
                            scrap_next = Instant::now() + short_retry;
                        }
                    }
                }

                if Instant::now() >= primary_next {
                    let now = Utc::now();
                    let cycle = perform_primary_cycle(&mut primary, &db, &config, &publisher, now);
                    match time::timeout(Duration::from_secs(CYCLE_TIMEOUT_SECS), cycle).await {
                        Ok(Ok(CycleOutcome::Completed(advisory))) => {
                            log_info!(
                                "cycle complete (priority {}, vent {}, water {}), next poll in {}s",
                                advisory.priority,
                                advisory.vent_angle,
                                advisory.need_water,
                                config.found_retry_secs
                            );
                            primary_next = Instant::now() + long_retry;
                        }
                        Ok(Ok(CycleOutcome::NotFound)) => {
                            log_info!(
                                "{} not found, retrying in {}s",
                                config.compost_device_name,
                                config.not_found_retry_secs
                            );
                            primary_next = Instant::now() + short_retry;
                        }
                        Ok(Err(err)) => {
                            log_error!("acquisition cycle failed: {err:?}");
                            let _ = primary.disconnect().await;
                            primary_next = Instant::now() + short_retry;
                        }
                        Err(_) => {
                            log_warn!("acquisition cycle timeout (> {CYCLE_TIMEOUT_SECS}s)");
                            let _ = primary.disconnect().await;
                            primary_next = Instant::now() + short_retry;
                        }
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("acquisition loop shutting down");
                break;
            }
        }
    }
}

/// One full primary-link cycle: discover, connect, read the characteristic
/// map, persist, analyze, actuate, disconnect, publish. Any error aborts
/// the whole cycle with nothing partially persisted or published; the
/// caller reschedules on the short interval.
pub async fn perform_primary_cycle<L: SensorLink>(
    link: &mut L,
    db: &Database,
    config: &MonitorConfig,
    publisher: &SnapshotPublisher,
    now: DateTime<Utc>,
) -> Result<CycleOutcome> {
    let Some(device) = link.discover(&config.compost_device_name).await? else {
        return Ok(CycleOutcome::NotFound);
    };

    link.connect(&device)
        .await
        .with_context(|| format!("failed to connect to {device}"))?;

    let temp_f = link.read_channel(Channel::CompostTempF).await? as f64;
    let device_clock = link.read_channel(Channel::DeviceClock).await?;
    let ambient_temp_f = link.read_channel(Channel::AmbientTempF).await? as f64;
    let moisture = link.read_channel(Channel::CompostMoisture).await? as f64;
    let methane = link.read_channel(Channel::MethanePpm).await? as f64;
    let water_level = link.read_channel(Channel::WaterLevel).await?;

    log_info!(
        "read {}: {temp_f}F core, {ambient_temp_f}F ambient, {moisture}% moisture, {methane} ppm, water {water_level} (device clock {device_clock})",
        config.compost_device_name
    );

    let reading = Reading {
        id: None,
        temp_f,
        temp_c: fahrenheit_to_celsius(temp_f),
        ambient_temp_f,
        ambient_temp_c: fahrenheit_to_celsius(ambient_temp_f),
        moisture,
        methane,
        water_level,
        timestamp: now.timestamp(),
    };
    let ambient = if ambient_temp_f <= config.ambient_cold_f {
        AmbientBand::Low
    } else {
        AmbientBand::High
    };

    db.insert_reading(&reading).await?;

    let today = now.with_timezone(&Local).date_naive();
    let days_elapsed = analysis::days_elapsed(
        &db.daily_aggregates().await?,
        today,
        config.temp_ok_f,
        config.safe_temp_days,
    );
    let trend = analysis::compute_trends(
        &db.recent_daily_aggregates(TREND_WINDOW_DAYS).await?,
        today,
    );
    let scrap_state = db.scrap_state().await?;

    let advisory = analysis::evaluate(&reading, ambient, trend, days_elapsed, &scrap_state, config);

    // The vent command is written every cycle, open or closed; the water
    // valve only fires on demand.
    link.write_channel(Channel::VentControl, i64::from(advisory.vent_angle))
        .await
        .context("failed to write vent command")?;
    if advisory.need_water == 1 {
        link.write_channel(Channel::WaterValveControl, 1)
            .await
            .context("failed to write water valve command")?;
    }

    link.disconnect().await?;

    let snapshot = UiSnapshot::compose(&advisory, &reading, scrap_state.total_scraps);
    db.upsert_snapshot(&snapshot).await?;
    publisher.publish(&snapshot)?;

    Ok(CycleOutcome::Completed(advisory))
}

/// Discover and attach the kitchen bin notification channel. `Ok(false)`
/// means nothing answered the scan.
async fn attach_scrap_link<L: SensorLink>(link: &mut L, config: &MonitorConfig) -> Result<bool> {
    let Some(device) = link.discover(&config.scrap_device_name).await? else {
        return Ok(false);
    };
    link.connect(&device)
        .await
        .with_context(|| format!("failed to connect to {device}"))?;
    link.subscribe(Channel::ScrapNotify)
        .await
        .context("failed to subscribe to scrap notifications")?;
    Ok(true)
}

/// Fold one notification sample into the stored scrap state.
pub async fn handle_scrap_sample(db: &Database, config: &MonitorConfig, sample: i64) -> Result<()> {
    let current = db.scrap_state().await?;
    let next = analysis::scraps::apply_sample(&current, sample, config);
    db.put_scrap_state(&next).await?;
    log_info!(
        "kitchen bin at level {}, {:.1} lb added to the pile so far",
        next.last_scrap_level,
        next.total_scraps
    );
    Ok(())
}

fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}
