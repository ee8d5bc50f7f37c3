//! Push delivery worker.
//!
//! Claims due reminder jobs, re-checks quiet hours against the user's
//! current preferences, fans each job out to every live subscription of the
//! user and drives the job to `sent`, back to `pending` with quadratic
//! backoff, or to `dead_letter`.

use std::sync::Arc;

use chrono_tz::Tz;
use futures::StreamExt;

use coachsync_core::config::NotificationConfig;
use coachsync_core::result::AppResult;
use coachsync_core::time::{is_time_inside_quiet_hours, local_time_in_time_zone};
use coachsync_core::traits::PushTransport;
use coachsync_database::{DeliveryLogStore, JobStore, PreferenceStore, SubscriptionStore};
use coachsync_entity::delivery::NewDeliveryLog;
use coachsync_entity::notification::{NotificationJob, NotificationPreference};

/// Error recorded when a user has nowhere to deliver to.
pub const NO_ACTIVE_SUBSCRIPTIONS: &str = "no active subscriptions";

/// Where a processed job ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Delivered to at least one device.
    Sent,
    /// Suppressed by quiet hours.
    SkippedQuietHours,
    /// Back to pending after `delay_seconds`.
    Retry { delay_seconds: i64 },
    /// Given up.
    DeadLetter,
}

/// Delivers due reminder jobs through a [`PushTransport`].
#[derive(Debug, Clone)]
pub struct NotificationWorker {
    jobs: Arc<dyn JobStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    preferences: Arc<dyn PreferenceStore>,
    delivery_logs: Arc<dyn DeliveryLogStore>,
    transport: Arc<dyn PushTransport>,
    max_retries: i32,
    retry_base_seconds: i64,
    default_timezone: Tz,
    concurrency: usize,
}

impl NotificationWorker {
    /// Create a new worker.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        preferences: Arc<dyn PreferenceStore>,
        delivery_logs: Arc<dyn DeliveryLogStore>,
        transport: Arc<dyn PushTransport>,
        config: &NotificationConfig,
        concurrency: usize,
    ) -> Self {
        Self {
            jobs,
            subscriptions,
            preferences,
            delivery_logs,
            transport,
            max_retries: config.max_retries,
            retry_base_seconds: config.retry_base_seconds,
            default_timezone: config.default_timezone,
            concurrency: concurrency.max(1),
        }
    }

    /// Whether the push transport has credentials.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_configured()
    }

    /// Claim and process up to `limit` due jobs. Returns the number claimed.
    ///
    /// A no-op returning 0 when the transport is not configured. A failure
    /// while processing one job is logged and does not affect the others;
    /// the job is handed back to the queue with backoff instead of being
    /// left in `processing`.
    pub async fn process_batch(&self, limit: i64) -> AppResult<usize> {
        if !self.transport.is_configured() {
            return Ok(0);
        }

        let jobs = self.jobs.claim_due(limit).await?;
        if jobs.is_empty() {
            return Ok(0);
        }

        let claimed = jobs.len();
        tracing::debug!(claimed, "Claimed due notification jobs");

        futures::stream::iter(jobs)
            .for_each_concurrent(self.concurrency, |job| async move {
                if let Err(e) = self.process_job(&job).await {
                    tracing::error!(
                        job_id = %job.id,
                        user_id = %job.user_id,
                        error = %e,
                        "Failed to process notification job"
                    );
                    let delay_seconds =
                        retry_delay_seconds(self.retry_base_seconds, job.attempt_count);
                    if let Err(e) = self
                        .jobs
                        .mark_retry(job.id, delay_seconds, &e.to_string())
                        .await
                    {
                        tracing::error!(
                            job_id = %job.id,
                            error = %e,
                            "Failed to release notification job"
                        );
                    }
                }
            })
            .await;

        Ok(claimed)
    }

    /// Process one claimed job.
    pub async fn process_job(&self, job: &NotificationJob) -> AppResult<JobOutcome> {
        let preference = self
            .preferences
            .get(job.user_id)
            .await?
            .unwrap_or_else(|| {
                NotificationPreference::default_for_user(job.user_id, self.default_timezone)
            });

        // Preferences may have changed since the job was planned.
        let local = local_time_in_time_zone(job.fire_at, preference.timezone);
        if is_time_inside_quiet_hours(
            local,
            preference.quiet_hours_start,
            preference.quiet_hours_end,
        ) {
            self.jobs.mark_skipped_quiet_hours(job.id).await?;
            tracing::info!(job_id = %job.id, local_time = %local, "Notification skipped (quiet hours)");
            return Ok(JobOutcome::SkippedQuietHours);
        }

        let subscriptions = self.subscriptions.list_active(job.user_id).await?;
        if subscriptions.is_empty() {
            self.jobs
                .mark_dead_letter(job.id, NO_ACTIVE_SUBSCRIPTIONS)
                .await?;
            tracing::warn!(job_id = %job.id, user_id = %job.user_id, "Notification dead-lettered: no active subscriptions");
            return Ok(JobOutcome::DeadLetter);
        }

        let mut delivered = 0usize;
        let mut any_retryable = false;
        let mut errors = Vec::new();

        for subscription in &subscriptions {
            match self.transport.send(&subscription.target(), &job.payload).await {
                // Bookkeeping failures are logged; the push outcome still
                // decides the job's fate.
                Ok(()) => {
                    delivered += 1;
                    if let Err(e) = self.subscriptions.mark_success(subscription.id).await {
                        tracing::warn!(subscription_id = %subscription.id, error = %e, "Failed to record subscription success");
                    }
                    self.append_log(NewDeliveryLog::success(job.id, subscription.id))
                        .await;
                }
                Err(err) => {
                    any_retryable |= err.kind.is_retryable();
                    self.append_log(NewDeliveryLog::failure(
                        job.id,
                        subscription.id,
                        err.status_code,
                        &err.message,
                    ))
                    .await;

                    let marked = if err.is_subscription_gone() {
                        self.subscriptions
                            .mark_expired(subscription.id, &err.message)
                            .await
                    } else {
                        self.subscriptions
                            .mark_error(subscription.id, &err.message)
                            .await
                    };
                    if let Err(e) = marked {
                        tracing::warn!(subscription_id = %subscription.id, error = %e, "Failed to record subscription failure");
                    }

                    tracing::warn!(
                        job_id = %job.id,
                        subscription_id = %subscription.id,
                        status_code = ?err.status_code,
                        kind = %err.kind,
                        "Push delivery failed: {}",
                        err.message
                    );
                    errors.push(match err.status_code {
                        Some(code) => format!("{code}: {}", err.message),
                        None => err.message,
                    });
                }
            }
        }

        if delivered > 0 {
            self.jobs.mark_sent(job.id).await?;
            tracing::info!(
                job_id = %job.id,
                delivered,
                failed = errors.len(),
                "Notification sent"
            );
            return Ok(JobOutcome::Sent);
        }

        let joined = errors.join("; ");
        if any_retryable && job.attempt_count < self.max_retries {
            let delay_seconds = retry_delay_seconds(self.retry_base_seconds, job.attempt_count);
            self.jobs.mark_retry(job.id, delay_seconds, &joined).await?;
            tracing::warn!(
                job_id = %job.id,
                attempt = job.attempt_count,
                delay_seconds,
                "Notification delivery failed, will retry"
            );
            return Ok(JobOutcome::Retry { delay_seconds });
        }

        let message = if any_retryable {
            format!("retries exhausted after {} attempts: {joined}", job.attempt_count)
        } else {
            joined
        };
        self.jobs.mark_dead_letter(job.id, &message).await?;
        tracing::error!(job_id = %job.id, attempt = job.attempt_count, "Notification dead-lettered: {}", message);
        Ok(JobOutcome::DeadLetter)
    }

    async fn append_log(&self, entry: NewDeliveryLog) {
        if let Err(e) = self.delivery_logs.append(&entry).await {
            tracing::warn!(
                job_id = %entry.job_id,
                subscription_id = %entry.subscription_id,
                error = %e,
                "Failed to append delivery log"
            );
        }
    }
}

/// Quadratic backoff: `base * attempt²`.
pub fn retry_delay_seconds(base_seconds: i64, attempt_count: i32) -> i64 {
    let attempt = i64::from(attempt_count.max(1));
    base_seconds.max(0).saturating_mul(attempt.saturating_mul(attempt))
}
