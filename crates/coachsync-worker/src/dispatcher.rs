//! Sync outbox dispatcher.
//!
//! Same claim / attempt / retry / dead-letter shape as the push worker, but
//! the attempt is an upstream write. Retryable failures back off; any other
//! failure still retries within the same attempt budget, then the entry is
//! dead-lettered together with its snapshot.

use std::sync::Arc;

use coachsync_core::config::OutboxConfig;
use coachsync_core::result::AppResult;
use coachsync_core::traits::{UpstreamClient, UpstreamError};
use coachsync_database::OutboxStore;
use coachsync_entity::outbox::OutboxEntry;

use crate::notification::worker::retry_delay_seconds;

/// Where a dispatched outbox entry ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Applied upstream.
    Processed,
    /// Back to pending after `delay_seconds`.
    Retry { delay_seconds: i64 },
    /// Attempt budget exhausted.
    DeadLetter,
}

/// Propagates outbox entries to the upstream system of record.
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    outbox: Arc<dyn OutboxStore>,
    upstream: Arc<dyn UpstreamClient>,
    max_attempts: i32,
    retry_base_seconds: i64,
}

impl OutboxDispatcher {
    /// Create a new dispatcher
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        upstream: Arc<dyn UpstreamClient>,
        config: &OutboxConfig,
    ) -> Self {
        Self {
            outbox,
            upstream,
            max_attempts: config.max_attempts.max(1),
            retry_base_seconds: config.retry_base_seconds,
        }
    }

    /// Claim and dispatch up to `limit` entries in `(priority, id)` order.
    /// Returns the number claimed.
    ///
    /// Nothing is claimed while the upstream client is unconfigured, so
    /// entries stay pending with their attempt budget intact.
    pub async fn dispatch_batch(&self, limit: i64) -> AppResult<usize> {
        if !self.upstream.is_configured() {
            return Ok(0);
        }

        let entries = self.outbox.claim_batch(limit).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Claimed {} outbox entries", entries.len());

        for entry in &entries {
            if let Err(e) = self.dispatch_entry(entry).await {
                tracing::error!(outbox_id = entry.id, error = %e, "Failed to dispatch outbox entry");
            }
        }

        Ok(entries.len())
    }

    /// Attempt one claimed entry and record the result.
    pub async fn dispatch_entry(&self, entry: &OutboxEntry) -> AppResult<DispatchOutcome> {
        let result = if self.upstream.is_configured() {
            self.upstream.apply(&entry.to_upstream_event()).await
        } else {
            Err(UpstreamError::permanent("upstream not configured"))
        };

        let err = match result {
            Ok(()) => {
                self.outbox.mark_processed(entry.id).await?;
                tracing::info!(
                    "Outbox entry {} applied upstream: {} {} {}",
                    entry.id,
                    entry.event_type,
                    entry.entity_type,
                    entry.entity_id
                );
                return Ok(DispatchOutcome::Processed);
            }
            Err(err) => err,
        };

        let message = err.to_string();

        if entry.attempt_count < self.max_attempts {
            let delay_seconds = retry_delay_seconds(self.retry_base_seconds, entry.attempt_count);
            self.outbox
                .mark_retry(entry.id, delay_seconds, &message)
                .await?;
            if err.kind.is_retryable() {
                tracing::warn!(
                    outbox_id = entry.id,
                    attempt = entry.attempt_count,
                    delay_seconds,
                    "Outbox entry failed (retryable): {}",
                    err.message
                );
            } else {
                tracing::error!(
                    outbox_id = entry.id,
                    attempt = entry.attempt_count,
                    delay_seconds,
                    "Outbox entry failed (permanent): {}",
                    err.message
                );
            }
            return Ok(DispatchOutcome::Retry { delay_seconds });
        }

        let message = format!("attempts exhausted after {}: {message}", entry.attempt_count);
        self.outbox.mark_dead_letter(entry, &message).await?;
        tracing::error!(outbox_id = entry.id, "Outbox entry dead-lettered: {}", message);
        Ok(DispatchOutcome::DeadLetter)
    }
}
