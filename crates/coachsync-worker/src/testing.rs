//! In-memory stores and transports for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::{
    PushError, PushTarget, PushTransport, UpstreamClient, UpstreamError, UpstreamEvent,
    UpstreamRecord,
};
use coachsync_database::{
    DeliveryLogStore, JobStore, MirrorStore, OutboxStore, PreferenceStore, ScheduleSource,
    SubscriptionStore, UserDirectory,
};
use coachsync_entity::delivery::NewDeliveryLog;
use coachsync_entity::notification::{
    JobCandidate, NotificationJob, NotificationJobStatus, NotificationPreference,
    PreferenceUpdate,
};
use coachsync_entity::outbox::{NewOutboxEntry, OutboxEntry, OutboxStatus};
use coachsync_entity::schedule::{SchedulableSession, ScheduledPersonalGoal};
use coachsync_entity::subscription::{PushSubscription, SubscriptionStatus};
use coachsync_entity::user::UpstreamUser;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    pub jobs: Mutex<Vec<NotificationJob>>,
}

impl MemoryJobStore {
    pub fn all(&self) -> Vec<NotificationJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn by_key(&self, key: &str) -> Option<NotificationJob> {
        self.all().into_iter().find(|j| j.dedupe_key == key)
    }

    /// Insert a job that is already due, bypassing planning.
    pub fn insert_due(&self, user_id: Uuid, key: &str) -> NotificationJob {
        let now = Utc::now();
        let job = NotificationJob {
            id: Uuid::new_v4(),
            user_id,
            program_id: None,
            program_schedule_id: None,
            personal_goal_id: None,
            reminder_date: now.date_naive(),
            mode: coachsync_entity::notification::NotificationMode::DailySummary,
            fire_at: now - Duration::minutes(1),
            payload: serde_json::json!({"title": "Reminder"}),
            dedupe_key: key.to_string(),
            status: NotificationJobStatus::Pending,
            attempt_count: 0,
            next_attempt_at: now - Duration::minutes(1),
            processed_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().unwrap().push(job.clone());
        job
    }

    /// Pull a retried job's next attempt into the past.
    pub fn make_due(&self, key: &str) {
        if let Some(job) = self.jobs.lock().unwrap().iter_mut().find(|j| j.dedupe_key == key) {
            job.next_attempt_at = Utc::now() - Duration::seconds(1);
        }
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut NotificationJob)) {
        if let Some(job) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == id) {
            f(job);
            job.updated_at = Utc::now();
        }
    }
}

fn same_content(job: &NotificationJob, c: &JobCandidate) -> bool {
    job.user_id == c.user_id
        && job.program_id == c.program_id
        && job.program_schedule_id == c.program_schedule_id
        && job.personal_goal_id == c.personal_goal_id
        && job.reminder_date == c.reminder_date
        && job.mode == c.mode
        && job.fire_at == c.fire_at
        && job.payload == c.payload
        && job.status == c.status
        && job.attempt_count == 0
        && job.next_attempt_at == c.next_attempt_at()
        && job.last_error.is_none()
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert_many(&self, candidates: &[JobCandidate]) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut written = 0;
        for c in candidates {
            match jobs.iter_mut().find(|j| j.dedupe_key == c.dedupe_key) {
                Some(job) if job.status == NotificationJobStatus::Sent => {}
                Some(job) if same_content(job, c) => {}
                Some(job) => {
                    let keep_processed = job.status == c.status && job.processed_at.is_some();
                    job.user_id = c.user_id;
                    job.program_id = c.program_id;
                    job.program_schedule_id = c.program_schedule_id;
                    job.personal_goal_id = c.personal_goal_id;
                    job.reminder_date = c.reminder_date;
                    job.mode = c.mode;
                    job.fire_at = c.fire_at;
                    job.payload = c.payload.clone();
                    job.status = c.status;
                    job.attempt_count = 0;
                    job.next_attempt_at = c.next_attempt_at();
                    if !keep_processed {
                        job.processed_at = c.processed_at;
                    }
                    job.last_error = None;
                    job.updated_at = Utc::now();
                    written += 1;
                }
                None => {
                    let now = Utc::now();
                    jobs.push(NotificationJob {
                        id: Uuid::new_v4(),
                        user_id: c.user_id,
                        program_id: c.program_id,
                        program_schedule_id: c.program_schedule_id,
                        personal_goal_id: c.personal_goal_id,
                        reminder_date: c.reminder_date,
                        mode: c.mode,
                        fire_at: c.fire_at,
                        payload: c.payload.clone(),
                        dedupe_key: c.dedupe_key.clone(),
                        status: c.status,
                        attempt_count: 0,
                        next_attempt_at: c.next_attempt_at(),
                        processed_at: c.processed_at,
                        last_error: None,
                        created_at: now,
                        updated_at: now,
                    });
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn cancel_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.cancel_not_in_set(user_id, &[]).await
    }

    async fn cancel_not_in_set(&self, user_id: Uuid, keep_keys: &[String]) -> AppResult<u64> {
        let mut cancelled = 0;
        for job in self.jobs.lock().unwrap().iter_mut() {
            if job.user_id == user_id
                && NotificationJobStatus::cancellable().contains(&job.status)
                && !keep_keys.contains(&job.dedupe_key)
            {
                job.status = NotificationJobStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn claim_due(&self, limit: i64) -> AppResult<Vec<NotificationJob>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        let mut due: Vec<&mut NotificationJob> = jobs
            .iter_mut()
            .filter(|j| {
                j.status == NotificationJobStatus::Pending
                    && j.next_attempt_at <= now
                    && j.fire_at <= now
            })
            .collect();
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then(a.id.cmp(&b.id)));

        Ok(due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|job| {
                job.status = NotificationJobStatus::Processing;
                job.attempt_count += 1;
                job.clone()
            })
            .collect())
    }

    async fn mark_sent(&self, id: Uuid) -> AppResult<()> {
        self.update(id, |j| {
            j.status = NotificationJobStatus::Sent;
            j.processed_at = Some(Utc::now());
            j.last_error = None;
        });
        Ok(())
    }

    async fn mark_skipped_quiet_hours(&self, id: Uuid) -> AppResult<()> {
        self.update(id, |j| {
            j.status = NotificationJobStatus::SkippedQuietHours;
            j.processed_at = Some(Utc::now());
            j.last_error = None;
        });
        Ok(())
    }

    async fn mark_dead_letter(&self, id: Uuid, error: &str) -> AppResult<()> {
        self.update(id, |j| {
            j.status = NotificationJobStatus::DeadLetter;
            j.processed_at = Some(Utc::now());
            j.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn mark_retry(&self, id: Uuid, delay_seconds: i64, error: &str) -> AppResult<()> {
        self.update(id, |j| {
            j.status = NotificationJobStatus::Pending;
            j.next_attempt_at = Utc::now() + Duration::seconds(delay_seconds);
            j.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn count_by_status(&self, status: NotificationJobStatus) -> AppResult<i64> {
        Ok(self.all().iter().filter(|j| j.status == status).count() as i64)
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MemoryPreferenceStore {
    pub default_timezone: Tz,
    /// Known users; `None` means the user never saved preferences.
    pub users: Mutex<HashMap<Uuid, Option<NotificationPreference>>>,
}

impl MemoryPreferenceStore {
    pub fn new(default_timezone: Tz) -> Self {
        Self {
            default_timezone,
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_user(&self, user_id: Uuid) {
        self.users.lock().unwrap().insert(user_id, None);
    }

    pub fn set(&self, preference: NotificationPreference) {
        self.users
            .lock()
            .unwrap()
            .insert(preference.user_id, Some(preference));
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<NotificationPreference>> {
        Ok(self.users.lock().unwrap().get(&user_id).map(|stored| {
            stored.clone().unwrap_or_else(|| {
                NotificationPreference::default_for_user(user_id, self.default_timezone)
            })
        }))
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        update: &PreferenceUpdate,
    ) -> AppResult<NotificationPreference> {
        let current = self.get(user_id).await?.unwrap_or_else(|| {
            NotificationPreference::default_for_user(user_id, self.default_timezone)
        });
        let merged = current.merge(update);
        self.set(merged.clone());
        Ok(merged)
    }
}

/// Preference store whose database is unreachable.
#[derive(Debug, Default)]
pub struct FailingPreferenceStore;

#[async_trait]
impl PreferenceStore for FailingPreferenceStore {
    async fn get(&self, _user_id: Uuid) -> AppResult<Option<NotificationPreference>> {
        Err(AppError::new(ErrorKind::Database, "connection refused"))
    }

    async fn upsert(
        &self,
        _user_id: Uuid,
        _update: &PreferenceUpdate,
    ) -> AppResult<NotificationPreference> {
        Err(AppError::new(ErrorKind::Database, "connection refused"))
    }
}

// ---------------------------------------------------------------------------
// Subscriptions and delivery logs
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySubscriptionStore {
    pub subscriptions: Mutex<Vec<PushSubscription>>,
}

impl MemorySubscriptionStore {
    pub fn get(&self, id: Uuid) -> Option<PushSubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut PushSubscription)) {
        if let Some(sub) = self
            .subscriptions
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.id == id)
        {
            f(sub);
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn register(&self, user_id: Uuid, target: &PushTarget) -> AppResult<PushSubscription> {
        let now = Utc::now();
        let sub = PushSubscription {
            id: Uuid::new_v4(),
            user_id,
            endpoint: target.endpoint.clone(),
            p256dh: target.p256dh.clone(),
            auth: target.auth.clone(),
            status: SubscriptionStatus::Active,
            failure_count: 0,
            last_success_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.subscriptions.lock().unwrap().push(sub.clone());
        Ok(sub)
    }

    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<PushSubscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.status.is_deliverable())
            .cloned()
            .collect())
    }

    async fn mark_success(&self, id: Uuid) -> AppResult<()> {
        self.update(id, |s| {
            s.status = SubscriptionStatus::Active;
            s.failure_count = 0;
            s.last_success_at = Some(Utc::now());
            s.last_error = None;
        });
        Ok(())
    }

    async fn mark_error(&self, id: Uuid, error: &str) -> AppResult<()> {
        self.update(id, |s| {
            s.status = SubscriptionStatus::Error;
            s.failure_count += 1;
            s.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn mark_expired(&self, id: Uuid, error: &str) -> AppResult<()> {
        self.update(id, |s| {
            s.status = SubscriptionStatus::Expired;
            s.failure_count += 1;
            s.last_error = Some(error.to_string());
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeliveryLog {
    pub entries: Mutex<Vec<NewDeliveryLog>>,
}

impl MemoryDeliveryLog {
    pub fn for_job(&self, job_id: Uuid) -> Vec<NewDeliveryLog> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryDeliveryLog {
    async fn append(&self, entry: &NewDeliveryLog) -> AppResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Delivery log whose backing table is unavailable.
#[derive(Debug, Default)]
pub struct FailingDeliveryLog;

#[async_trait]
impl DeliveryLogStore for FailingDeliveryLog {
    async fn append(&self, _entry: &NewDeliveryLog) -> AppResult<()> {
        Err(AppError::new(ErrorKind::Database, "delivery_logs unavailable"))
    }
}

// ---------------------------------------------------------------------------
// Schedules and users
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySchedule {
    pub sessions: Mutex<HashMap<Uuid, Vec<SchedulableSession>>>,
    pub goals: Mutex<HashMap<Uuid, Vec<ScheduledPersonalGoal>>>,
}

impl MemorySchedule {
    pub fn add_session(&self, user_id: Uuid, date: NaiveDate) -> SchedulableSession {
        let session = SchedulableSession {
            program_id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            session_date: date,
            planned_count: 2,
            completed_count: 0,
        };
        self.sessions
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(session.clone());
        session
    }

    pub fn remove_sessions(&self, user_id: Uuid) {
        self.sessions.lock().unwrap().remove(&user_id);
    }

    pub fn add_goal(&self, user_id: Uuid, goal: ScheduledPersonalGoal) {
        self.goals.lock().unwrap().entry(user_id).or_default().push(goal);
    }
}

#[async_trait]
impl ScheduleSource for MemorySchedule {
    async fn list_schedulable_sessions_for_user(
        &self,
        user_id: Uuid,
        from: NaiveDate,
    ) -> AppResult<Vec<SchedulableSession>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter(|s| s.session_date >= from && s.is_remaining())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_scheduled_personal_goals_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<ScheduledPersonalGoal>> {
        Ok(self
            .goals
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUsers {
    pub languages: Mutex<HashMap<Uuid, String>>,
    pub planning: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn get_user_language_code(&self, user_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.languages.lock().unwrap().get(&user_id).cloned())
    }

    async fn list_users_for_notification_planning(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.planning.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Outbox and mirror
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryOutbox {
    pub entries: Mutex<Vec<OutboxEntry>>,
    pub dead_letters: Mutex<Vec<(i64, String)>>,
}

impl MemoryOutbox {
    pub fn push(&self, entry: NewOutboxEntry) -> OutboxEntry {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let created = OutboxEntry {
            id: entries.len() as i64 + 1,
            event_type: entry.event_type,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            payload: entry.payload,
            status: OutboxStatus::Pending,
            priority: entry.priority,
            attempt_count: 0,
            next_attempt_at: now,
            last_error: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        entries.push(created.clone());
        created
    }

    pub fn get(&self, id: i64) -> Option<OutboxEntry> {
        self.entries.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    /// Make a retried entry due again.
    pub fn make_due(&self, id: i64) {
        if let Some(entry) = self.entries.lock().unwrap().iter_mut().find(|e| e.id == id) {
            entry.next_attempt_at = Utc::now() - Duration::seconds(1);
        }
    }

    fn update(&self, id: i64, f: impl FnOnce(&mut OutboxEntry)) {
        if let Some(entry) = self.entries.lock().unwrap().iter_mut().find(|e| e.id == id) {
            f(entry);
        }
    }
}

#[async_trait]
impl OutboxStore for MemoryOutbox {
    async fn claim_batch(&self, limit: i64) -> AppResult<Vec<OutboxEntry>> {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        let mut due: Vec<&mut OutboxEntry> = entries
            .iter_mut()
            .filter(|e| e.status == OutboxStatus::Pending && e.next_attempt_at <= now)
            .collect();
        due.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));

        Ok(due
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|entry| {
                entry.status = OutboxStatus::Processing;
                entry.attempt_count += 1;
                entry.clone()
            })
            .collect())
    }

    async fn mark_processed(&self, id: i64) -> AppResult<()> {
        self.update(id, |e| {
            e.status = OutboxStatus::Processed;
            e.processed_at = Some(Utc::now());
            e.last_error = None;
        });
        Ok(())
    }

    async fn mark_retry(&self, id: i64, delay_seconds: i64, error: &str) -> AppResult<()> {
        self.update(id, |e| {
            e.status = OutboxStatus::Pending;
            e.next_attempt_at = Utc::now() + Duration::seconds(delay_seconds);
            e.last_error = Some(error.to_string());
        });
        Ok(())
    }

    async fn mark_dead_letter(&self, entry: &OutboxEntry, error: &str) -> AppResult<()> {
        self.update(entry.id, |e| {
            e.status = OutboxStatus::DeadLetter;
            e.last_error = Some(error.to_string());
        });
        self.dead_letters
            .lock()
            .unwrap()
            .push((entry.id, error.to_string()));
        Ok(())
    }

    async fn count_by_status(&self, status: OutboxStatus) -> AppResult<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == status)
            .count() as i64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryMirror {
    pub records: Mutex<HashMap<(String, String), serde_json::Value>>,
    pub users: Mutex<Vec<UpstreamUser>>,
}

#[async_trait]
impl MirrorStore for MemoryMirror {
    async fn upsert_records(&self, table: &str, records: &[UpstreamRecord]) -> AppResult<u64> {
        let mut stored = self.records.lock().unwrap();
        let mut written = 0;
        for record in records {
            let key = (table.to_string(), record.id.clone());
            if stored.get(&key) != Some(&record.fields) {
                stored.insert(key, record.fields.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn upsert_users(&self, users: &[UpstreamUser]) -> AppResult<u64> {
        self.users.lock().unwrap().extend(users.iter().cloned());
        Ok(users.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Push transport answering per endpoint; unknown endpoints succeed.
#[derive(Debug)]
pub struct FakePushTransport {
    pub configured: bool,
    pub failures: Mutex<HashMap<String, PushError>>,
    pub sent: Mutex<Vec<(String, serde_json::Value)>>,
}

impl FakePushTransport {
    pub fn new() -> Self {
        Self {
            configured: true,
            failures: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn fail(&self, endpoint: &str, status_code: Option<u16>) {
        self.failures.lock().unwrap().insert(
            endpoint.to_string(),
            PushError::from_status(status_code, format!("push service answered {status_code:?}")),
        );
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushTransport for FakePushTransport {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send(&self, target: &PushTarget, payload: &serde_json::Value) -> Result<(), PushError> {
        self.sent
            .lock()
            .unwrap()
            .push((target.endpoint.clone(), payload.clone()));
        match self.failures.lock().unwrap().get(&target.endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Upstream client replaying scripted `apply` results, then succeeding.
#[derive(Debug)]
pub struct FakeUpstream {
    pub configured: bool,
    pub script: Mutex<VecDeque<Result<(), UpstreamError>>>,
    pub applied: Mutex<Vec<UpstreamEvent>>,
    pub tables: Mutex<HashMap<String, Vec<UpstreamRecord>>>,
    pub list_calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self {
            configured: true,
            script: Mutex::new(VecDeque::new()),
            applied: Mutex::new(Vec::new()),
            tables: Mutex::new(HashMap::new()),
            list_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, results: impl IntoIterator<Item = Result<(), UpstreamError>>) {
        self.script.lock().unwrap().extend(results);
    }

    pub fn put_table(&self, table: &str, records: Vec<UpstreamRecord>) {
        self.tables.lock().unwrap().insert(table.to_string(), records);
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn apply(&self, event: &UpstreamEvent) -> Result<(), UpstreamError> {
        self.applied.lock().unwrap().push(event.clone());
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn list_records(
        &self,
        table: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((table.to_string(), modified_since));
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| UpstreamError::from_status(Some(404), format!("unknown table {table}")))
    }
}
