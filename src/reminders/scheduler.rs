// src/reminders/scheduler.rs
// Minute-aligned background loop driving the reminder engine

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use super::ReminderEngine;
use crate::timezone::now_local;

const MINUTE: Duration = Duration::from_secs(60);

/// Runs [`ReminderEngine::tick_at`] once per wall-clock minute.
///
/// The sleep is recomputed from the wall clock before every tick, so clock
/// adjustments cannot shift the phase. Each minute is evaluated at most once;
/// a minute the process sleeps through is skipped, not replayed.
pub struct ReminderScheduler {
    engine: Arc<ReminderEngine>,
    handle: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(engine: Arc<ReminderEngine>) -> Self {
        Self { engine, handle: None }
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let engine = self.engine.clone();

        self.handle = Some(tokio::spawn(async move {
            info!("reminder scheduler started");
            let mut last_run: Option<NaiveDateTime> = None;

            loop {
                time::sleep(until_next_minute(now_local())).await;

                let now = now_local();
                let Some(minute) = next_due_minute(last_run, &now) else {
                    debug!(at = %now, "woke inside an evaluated minute");
                    continue;
                };
                last_run = Some(minute);

                if let Err(e) = engine.tick_at(now).await {
                    error!(error = %e, "reminder tick failed");
                }
            }
        }));
    }

    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            info!("reminder scheduler stopped");
        }
    }
}

/// Time left until the next :00 second of `now`
fn until_next_minute(now: DateTime<FixedOffset>) -> Duration {
    let elapsed = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    MINUTE.saturating_sub(elapsed)
}

/// The wall-clock minute containing `now`, unless it was already evaluated
fn next_due_minute(last_run: Option<NaiveDateTime>, now: &DateTime<FixedOffset>) -> Option<NaiveDateTime> {
    let minute = now.naive_local().with_second(0)?.with_nanosecond(0)?;
    match last_run {
        Some(last) if minute <= last => None,
        _ => Some(minute),
    }
}
