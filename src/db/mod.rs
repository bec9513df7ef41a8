//! SQLite persistence for the monitor.
//!
//! One worker thread owns the `Connection`; async callers hand it
//! closures over an mpsc channel and await the reply on a oneshot. Every
//! write is a single statement, so a cycle that dies mid-way can never
//! leave partial state behind.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;
pub mod models;

use migrations::run_migrations;
use models::{DailyAggregate, Reading, ScrapState, UiSnapshot};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid day '{value}': {err}"))
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("compostwatch-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Append one reading to the history.
    pub async fn insert_reading(&self, reading: &Reading) -> Result<()> {
        let record = reading.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO readings (temp_f, temp_c, ambient_temp_f, ambient_temp_c, moisture, methane, water_level, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.temp_f,
                    record.temp_c,
                    record.ambient_temp_f,
                    record.ambient_temp_c,
                    record.moisture,
                    record.methane,
                    record.water_level,
                    record.timestamp,
                ],
            )
            .with_context(|| "failed to insert reading")?;
            Ok(())
        })
        .await
    }

    /// Per-local-calendar-day means, newest first, at most `limit` days.
    /// Feeds the trend computation.
    pub async fn recent_daily_aggregates(&self, limit: u32) -> Result<Vec<DailyAggregate>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT ROUND(AVG(temp_f), 0) AS avg_temp_f,
                        ROUND(AVG(moisture), 0) AS avg_moisture,
                        date(timestamp, 'unixepoch', 'localtime') AS day
                 FROM readings
                 GROUP BY day
                 ORDER BY day DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut aggregates = Vec::new();
            while let Some(row) = rows.next()? {
                aggregates.push(DailyAggregate {
                    avg_temp_f: row.get(0)?,
                    avg_moisture: row.get(1)?,
                    day: parse_day(&row.get::<_, String>(2)?)?,
                });
            }
            Ok(aggregates)
        })
        .await
    }

    /// Per-local-calendar-day means over the whole history, oldest first.
    /// Feeds the readiness projection.
    pub async fn daily_aggregates(&self) -> Result<Vec<DailyAggregate>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ROUND(AVG(temp_f), 0) AS avg_temp_f,
                        ROUND(AVG(moisture), 0) AS avg_moisture,
                        date(timestamp, 'unixepoch', 'localtime') AS day
                 FROM readings
                 GROUP BY day
                 ORDER BY day ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut aggregates = Vec::new();
            while let Some(row) = rows.next()? {
                aggregates.push(DailyAggregate {
                    avg_temp_f: row.get(0)?,
                    avg_moisture: row.get(1)?,
                    day: parse_day(&row.get::<_, String>(2)?)?,
                });
            }
            Ok(aggregates)
        })
        .await
    }

    /// The single scrap-state row; a fresh database reads as all zeroes.
    pub async fn scrap_state(&self) -> Result<ScrapState> {
        self.execute(|conn| {
            let mut stmt =
                conn.prepare("SELECT last_scrap_level, total_scraps FROM kitchen_scraps")?;
            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                Ok(ScrapState {
                    last_scrap_level: row.get(0)?,
                    total_scraps: row.get(1)?,
                })
            } else {
                Ok(ScrapState::default())
            }
        })
        .await
    }

    /// Overwrite the scrap-state row (last-write-wins, never appended).
    pub async fn put_scrap_state(&self, state: &ScrapState) -> Result<()> {
        let record = state.clone();
        self.execute(move |conn| {
            conn.execute("DELETE FROM kitchen_scraps", [])?;
            conn.execute(
                "INSERT INTO kitchen_scraps (last_scrap_level, total_scraps) VALUES (?1, ?2)",
                params![record.last_scrap_level, record.total_scraps],
            )
            .with_context(|| "failed to write scrap state")?;
            Ok(())
        })
        .await
    }

    /// Overwrite the dashboard snapshot row.
    pub async fn upsert_snapshot(&self, snapshot: &UiSnapshot) -> Result<()> {
        let record = snapshot.clone();
        self.execute(move |conn| {
            conn.execute("DELETE FROM ui_snapshot", [])?;
            conn.execute(
                "INSERT INTO ui_snapshot (days_elapsed, temp_f, temp_c, moisture, methane, water_level_text, scrap_level_text, total_scraps, message, temp_alert, moist_alert, methane_alert, water_alert, scrap_alert, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.days_elapsed,
                    record.temp_f,
                    record.temp_c,
                    record.moisture,
                    record.methane,
                    record.water_level_text,
                    record.scrap_level_text,
                    record.total_scraps,
                    record.message,
                    record.temp_alert,
                    record.moist_alert,
                    record.methane_alert,
                    record.water_alert,
                    record.scrap_alert,
                    record.timestamp,
                ],
            )
            .with_context(|| "failed to write ui snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn latest_snapshot(&self) -> Result<Option<UiSnapshot>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT days_elapsed, temp_f, temp_c, moisture, methane, water_level_text, scrap_level_text, total_scraps, message, temp_alert, moist_alert, methane_alert, water_alert, scrap_alert, timestamp
                 FROM ui_snapshot",
            )?;
            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                Ok(Some(UiSnapshot {
                    days_elapsed: row.get(0)?,
                    temp_f: row.get(1)?,
                    temp_c: row.get(2)?,
                    moisture: row.get(3)?,
                    methane: row.get(4)?,
                    water_level_text: row.get(5)?,
                    scrap_level_text: row.get(6)?,
                    total_scraps: row.get(7)?,
                    message: row.get(8)?,
                    temp_alert: row.get(9)?,
                    moist_alert: row.get(10)?,
                    methane_alert: row.get(11)?,
                    water_alert: row.get(12)?,
                    scrap_alert: row.get(13)?,
                    timestamp: row.get(14)?,
                }))
            } else {
                Ok(None)
            }
        })
        .await
    }

    /// Most recent reading by timestamp, if any.
    pub async fn latest_reading(&self) -> Result<Option<Reading>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, temp_f, temp_c, ambient_temp_f, ambient_temp_c, moisture, methane, water_level, timestamp
                 FROM readings
                 ORDER BY timestamp DESC
                 LIMIT 1",
            )?;
            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                Ok(Some(Reading {
                    id: row.get(0)?,
                    temp_f: row.get(1)?,
                    temp_c: row.get(2)?,
                    ambient_temp_f: row.get(3)?,
                    ambient_temp_c: row.get(4)?,
                    moisture: row.get(5)?,
                    methane: row.get(6)?,
                    water_level: row.get(7)?,
                    timestamp: row.get(8)?,
                }))
            } else {
                Ok(None)
            }
        })
        .await
    }
}
