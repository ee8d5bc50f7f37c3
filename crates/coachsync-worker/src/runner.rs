//! Worker loop: drains both pipelines and runs the reconciliation timers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time;

use coachsync_core::config::WorkerConfig;

use crate::dispatcher::OutboxDispatcher;
use crate::mirror::UpstreamMirror;
use crate::notification::{NotificationPlanner, NotificationWorker};

/// A low-frequency task gated by elapsed wall-clock time.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    last_run: Option<Instant>,
}

impl IntervalTimer {
    /// A timer that is due immediately, then every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Whether the interval has elapsed since the last run.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record a run at `now`.
    pub fn mark_run(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}

/// The three reconciliation timers, each with its own last-run time.
#[derive(Debug, Clone)]
pub struct ReconciliationTimers {
    pub full_resync: IntervalTimer,
    pub user_poll: IntervalTimer,
    pub planning: IntervalTimer,
}

impl ReconciliationTimers {
    /// Timers from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            full_resync: IntervalTimer::new(Duration::from_secs(config.full_resync_interval_seconds)),
            user_poll: IntervalTimer::new(Duration::from_secs(config.user_poll_interval_seconds)),
            planning: IntervalTimer::new(Duration::from_secs(config.planning_interval_seconds)),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub outbox_claimed: usize,
    pub notifications_claimed: usize,
    pub ran_full_resync: bool,
    pub ran_user_poll: bool,
    pub ran_planning: bool,
}

impl TickReport {
    /// Whether both queues came back empty.
    pub fn is_idle(&self) -> bool {
        self.outbox_claimed == 0 && self.notifications_claimed == 0
    }
}

/// Single long-lived loop driving the whole delivery engine.
#[derive(Debug)]
pub struct WorkerLoop {
    dispatcher: Arc<OutboxDispatcher>,
    worker: Arc<NotificationWorker>,
    planner: Arc<NotificationPlanner>,
    mirror: Arc<UpstreamMirror>,
    config: WorkerConfig,
    timers: ReconciliationTimers,
}

impl WorkerLoop {
    /// Create a new worker loop
    pub fn new(
        dispatcher: Arc<OutboxDispatcher>,
        worker: Arc<NotificationWorker>,
        planner: Arc<NotificationPlanner>,
        mirror: Arc<UpstreamMirror>,
        config: WorkerConfig,
    ) -> Self {
        let timers = ReconciliationTimers::from_config(&config);
        Self {
            dispatcher,
            worker,
            planner,
            mirror,
            config,
            timers,
        }
    }

    /// Run until the cancel signal flips to `true`.
    ///
    /// Sleeps between ticks only when both queues were empty. The current
    /// tick always finishes before the loop exits.
    pub async fn run(&mut self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker loop started: poll_interval={}ms, outbox_batch={}, notification_batch={}, push_enabled={}",
            self.config.poll_interval_ms,
            self.config.outbox_batch_size,
            self.config.notification_batch_size,
            self.worker.is_enabled()
        );

        let poll_interval = self.config.poll_interval();

        loop {
            if *cancel.borrow() {
                break;
            }

            let report = self.tick().await;
            if !report.is_idle() {
                continue;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!("Worker loop shut down");
    }

    /// One pass: an outbox batch, a notification batch, then any due timers.
    /// Every branch logs its own failure and never aborts the tick.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        match self.dispatcher.dispatch_batch(self.config.outbox_batch_size).await {
            Ok(claimed) => report.outbox_claimed = claimed,
            Err(e) => tracing::error!("Outbox dispatch failed: {}", e),
        }

        if self.worker.is_enabled() {
            match self
                .worker
                .process_batch(self.config.notification_batch_size)
                .await
            {
                Ok(claimed) => report.notifications_claimed = claimed,
                Err(e) => tracing::error!("Notification delivery failed: {}", e),
            }
        }

        let now = Instant::now();

        if self.timers.full_resync.is_due(now) {
            self.timers.full_resync.mark_run(now);
            report.ran_full_resync = true;
            if let Err(e) = self.mirror.full_resync().await {
                tracing::error!("Full resync failed: {}", e);
            }
        }

        if self.timers.user_poll.is_due(now) {
            self.timers.user_poll.mark_run(now);
            report.ran_user_poll = true;
            if let Err(e) = self.mirror.poll_users().await {
                tracing::error!("User poll failed: {}", e);
            }
        }

        if self.timers.planning.is_due(now) {
            self.timers.planning.mark_run(now);
            report.ran_planning = true;
            if let Err(e) = self.planner.sync_jobs_for_all_users().await {
                tracing::error!("Reminder planning failed: {}", e);
            }
        }

        report
    }
}
