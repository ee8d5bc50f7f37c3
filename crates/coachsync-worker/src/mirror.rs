//! Upstream mirror: periodic full resync and the fallback user poll.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use coachsync_core::config::UpstreamConfig;
use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::{UpstreamClient, UpstreamError};
use coachsync_database::MirrorStore;
use coachsync_entity::user::UpstreamUser;

/// Result of a full resync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub tables: usize,
    pub failed_tables: usize,
    pub records: usize,
    pub written: u64,
}

/// Copies upstream records into the local cache.
#[derive(Debug)]
pub struct UpstreamMirror {
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn MirrorStore>,
    resync_tables: Vec<String>,
    users_table: String,
    /// Start time of the last successful user poll.
    last_user_poll: Mutex<Option<DateTime<Utc>>>,
}

impl UpstreamMirror {
    /// Create a new mirror.
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        store: Arc<dyn MirrorStore>,
        config: &UpstreamConfig,
    ) -> Self {
        Self {
            upstream,
            store,
            resync_tables: config.resync_tables.clone(),
            users_table: config.users_table.clone(),
            last_user_poll: Mutex::new(None),
        }
    }

    /// Re-read every configured table and every user. One failing table is
    /// logged and does not stop the others.
    pub async fn full_resync(&self) -> AppResult<ResyncSummary> {
        let mut summary = ResyncSummary::default();
        if !self.upstream.is_configured() {
            tracing::debug!("Upstream not configured, skipping full resync");
            return Ok(summary);
        }

        for table in &self.resync_tables {
            summary.tables += 1;
            let records = match self.upstream.list_records(table, None).await {
                Ok(records) => records,
                Err(e) => {
                    summary.failed_tables += 1;
                    tracing::error!(table = %table, error = %e, "Failed to resync upstream table");
                    continue;
                }
            };
            summary.records += records.len();
            summary.written += self.store.upsert_records(table, &records).await?;
        }

        summary.written += self.sync_users(None).await?;

        tracing::info!(
            tables = summary.tables,
            failed = summary.failed_tables,
            records = summary.records,
            written = summary.written,
            "Full upstream resync complete"
        );
        Ok(summary)
    }

    /// Upsert users modified upstream since the previous successful poll.
    pub async fn poll_users(&self) -> AppResult<u64> {
        if !self.upstream.is_configured() {
            return Ok(0);
        }

        let mut last = self.last_user_poll.lock().await;
        let started = Utc::now();
        let written = self.sync_users(*last).await?;
        *last = Some(started);

        if written > 0 {
            tracing::info!("User poll updated {} users", written);
        }
        Ok(written)
    }

    async fn sync_users(&self, since: Option<DateTime<Utc>>) -> AppResult<u64> {
        let records = self
            .upstream
            .list_records(&self.users_table, since)
            .await
            .map_err(upstream_error)?;

        let users: Vec<UpstreamUser> = records
            .iter()
            .filter_map(|r| UpstreamUser::from_fields(&r.id, &r.fields))
            .collect();
        if users.len() < records.len() {
            tracing::debug!(
                "Ignored {} upstream user records without an email",
                records.len() - users.len()
            );
        }

        self.store.upsert_users(&users).await
    }
}

fn upstream_error(err: UpstreamError) -> AppError {
    AppError::with_source(ErrorKind::ExternalService, err.to_string(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachsync_core::traits::UpstreamRecord;

    use crate::testing::{FakeUpstream, MemoryMirror};

    fn record(id: &str, fields: serde_json::Value) -> UpstreamRecord {
        UpstreamRecord {
            id: id.to_string(),
            fields,
        }
    }

    fn mirror(upstream: &Arc<FakeUpstream>, store: &Arc<MemoryMirror>) -> UpstreamMirror {
        let config = UpstreamConfig {
            resync_tables: vec!["programs".to_string(), "missing".to_string()],
            ..UpstreamConfig::default()
        };
        UpstreamMirror::new(upstream.clone(), store.clone(), &config)
    }

    #[tokio::test]
    async fn test_full_resync_isolates_failing_table() {
        let upstream = Arc::new(FakeUpstream::new());
        upstream.put_table("programs", vec![record("rec1", serde_json::json!({"name": "Base"}))]);
        upstream.put_table(
            "users",
            vec![
                record("u1", serde_json::json!({"email": "a@example.com"})),
                record("u2", serde_json::json!({"name": "no email"})),
            ],
        );
        let store = Arc::new(MemoryMirror::default());

        let summary = mirror(&upstream, &store).full_resync().await.unwrap();

        assert_eq!(summary.tables, 2);
        assert_eq!(summary.failed_tables, 1);
        assert_eq!(summary.records, 1);
        assert_eq!(store.records.lock().unwrap().len(), 1);
        assert_eq!(store.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_poll_is_incremental() {
        let upstream = Arc::new(FakeUpstream::new());
        upstream.put_table("users", vec![record("u1", serde_json::json!({"email": "a@example.com"}))]);
        let store = Arc::new(MemoryMirror::default());
        let mirror = mirror(&upstream, &store);

        mirror.poll_users().await.unwrap();
        mirror.poll_users().await.unwrap();

        let calls = upstream.list_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, None);
        assert!(calls[1].1.is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_upstream_is_skipped() {
        let upstream = Arc::new(FakeUpstream {
            configured: false,
            ..FakeUpstream::new()
        });
        let store = Arc::new(MemoryMirror::default());
        let mirror = mirror(&upstream, &store);

        assert_eq!(mirror.full_resync().await.unwrap(), ResyncSummary::default());
        assert_eq!(mirror.poll_users().await.unwrap(), 0);
        assert!(upstream.list_calls.lock().unwrap().is_empty());
    }
}
