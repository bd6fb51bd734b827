//! Fixed-interval scheduler for discovery ticks.
//!
//! - The first tick fires immediately
//! - A tick always runs to completion before the next one starts
//! - Missed ticks are delayed, never run in a burst
//! - A [`CancellationToken`] stops the wait and is handed to each tick

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DEFAULT_INTERVAL;
use crate::discovery::TickReport;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between tick starts.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with the given interval; zero falls back to the default.
    pub fn new(interval: Duration) -> Self {
        if interval.is_zero() {
            Self::default()
        } else {
            Self { interval }
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Whether the loop is running.
    pub running: bool,
    /// Ticks completed.
    pub ticks: u64,
    /// When the last tick finished.
    pub last_tick: Option<DateTime<Utc>>,
    /// Report of the last tick.
    pub last_report: Option<TickReport>,
}

impl SchedulerState {
    /// Creates a new scheduler state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished tick.
    pub fn record_tick(&mut self, report: TickReport) {
        self.ticks += 1;
        self.last_tick = Some(Utc::now());
        self.last_report = Some(report);
    }

    /// Returns the time since the last tick finished.
    pub fn time_since_tick(&self) -> Option<Duration> {
        self.last_tick.map(|last| {
            let elapsed = Utc::now() - last;
            Duration::from_secs(elapsed.num_seconds().max(0) as u64)
        })
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Runs ticks at a fixed interval until cancelled.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
}

impl Scheduler {
    /// Creates a new scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::new())),
        }
    }

    /// Returns a handle for observing the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            state: self.state.clone(),
        }
    }

    /// Runs the loop. Returns once `cancel` fires and any in-flight tick is done.
    pub async fn run<F, Fut>(self, cancel: CancellationToken, tick_fn: F)
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = TickReport>,
    {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );
        self.state.write().await.running = true;

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            debug!("Starting tick");
            let report = tick_fn(cancel.clone()).await;
            self.state.write().await.record_tick(report);

            if cancel.is_cancelled() {
                break;
            }
        }

        self.state.write().await.running = false;
        info!("Scheduler stopped");
    }
}

/// Read-only view of a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Returns a snapshot of the scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    /// Number of ticks completed.
    pub async fn ticks(&self) -> u64 {
        self.state.read().await.ticks
    }
}
