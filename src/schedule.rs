//! Periodic re-runs of the organizer.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// How often the sleeping loop checks the stop flag.
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("interval must be a positive number of minutes that fits in a duration, got {0}")]
    InvalidInterval(u64),
    #[error("failed to install Ctrl+C handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
}

/// Runs a job now and then again after every interval until stopped.
///
/// Runs never overlap with each other, but nothing prevents another process
/// from organizing the same directory at the same time.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    /// Creates a scheduler firing every `interval_minutes` minutes.
    pub fn new(interval_minutes: u64) -> Result<Self, ScheduleError> {
        let seconds = interval_minutes
            .checked_mul(60)
            .filter(|_| interval_minutes >= 1)
            .ok_or(ScheduleError::InvalidInterval(interval_minutes))?;
        Ok(Self::with_interval(Duration::from_secs(seconds)))
    }

    /// Creates a scheduler with an arbitrary interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Shared flag; storing `false` stops the loop after the current run.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stops the loop when the process receives Ctrl+C.
    pub fn stop_on_ctrlc(&self) -> Result<(), ScheduleError> {
        let running = self.stop_handle();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
        Ok(())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs `job` until stopped. Returns the number of runs performed.
    ///
    /// A job that returns an error is logged and the schedule continues.
    pub fn run<F, E>(&self, mut job: F) -> usize
    where
        F: FnMut() -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut runs = 0;
        while self.is_running() {
            runs += 1;
            tracing::info!(run = runs, "scheduled organize starting");
            if let Err(e) = job() {
                tracing::error!(run = runs, error = %e, "scheduled organize failed");
            }

            if !self.is_running() {
                break;
            }
            let next: Option<DateTime<Local>> = chrono::Duration::from_std(self.interval)
                .ok()
                .and_then(|delta| Local::now().checked_add_signed(delta));
            match next {
                Some(next) => {
                    tracing::info!("next run at {}", next.format("%Y-%m-%d %H:%M:%S"))
                }
                None => tracing::info!("next run in {:?}", self.interval),
            }
            self.sleep_interval();
        }
        tracing::info!(runs, "schedule stopped");
        runs
    }

    fn sleep_interval(&self) {
        // Past the clock's range: nothing to wait for but the stop flag.
        let Some(deadline) = Instant::now().checked_add(self.interval) else {
            while self.is_running() {
                thread::sleep(TICK);
            }
            return;
        };
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(TICK.min(deadline - now));
        }
    }
}
