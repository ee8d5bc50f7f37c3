//! Reminder planner.
//!
//! For one user the planner derives the complete set of reminder jobs that
//! should exist right now, upserts them by dedupe key and cancels every
//! outstanding job whose key is no longer in the set. Running it twice with
//! no schedule change writes nothing; running it after a schedule edit
//! retires stale reminders. Jobs already `sent` are never touched.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use coachsync_core::config::NotificationConfig;
use coachsync_core::result::AppResult;
use coachsync_core::time::{
    add_minutes, date_in_time_zone, is_time_inside_quiet_hours, local_time_in_time_zone,
    zoned_date_time_to_utc,
};
use coachsync_database::{JobStore, PreferenceStore, ScheduleSource, UserDirectory};
use coachsync_entity::notification::{
    JobCandidate, NotificationJobStatus, NotificationMode, NotificationPreference,
};
use coachsync_entity::schedule::{SchedulableSession, ScheduledPersonalGoal};

use super::payload::{Locale, PayloadBuilder};

/// Result of planning one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Candidates derived from the schedule.
    pub planned: usize,
    /// Candidates born `skipped_quiet_hours`.
    pub skipped_quiet_hours: usize,
    /// Rows inserted or changed.
    pub written: u64,
    /// Outstanding jobs cancelled.
    pub cancelled: u64,
}

/// Result of a planning pass over every eligible user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanningSummary {
    pub users: usize,
    pub failed_users: usize,
    pub written: u64,
    pub cancelled: u64,
}

/// Derives and reconciles reminder jobs.
#[derive(Debug, Clone)]
pub struct NotificationPlanner {
    preferences: Arc<dyn PreferenceStore>,
    jobs: Arc<dyn JobStore>,
    schedules: Arc<dyn ScheduleSource>,
    users: Arc<dyn UserDirectory>,
    goal_horizon_days: i64,
    app_base_url: String,
}

impl NotificationPlanner {
    /// Create a new planner.
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        jobs: Arc<dyn JobStore>,
        schedules: Arc<dyn ScheduleSource>,
        users: Arc<dyn UserDirectory>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            preferences,
            jobs,
            schedules,
            users,
            goal_horizon_days: config.goal_horizon_days.max(0),
            app_base_url: config.app_base_url.clone(),
        }
    }

    /// Plan every user with an active or planned program, or with
    /// notifications explicitly enabled. A failing user is logged and
    /// skipped.
    pub async fn sync_jobs_for_all_users(&self) -> AppResult<PlanningSummary> {
        let user_ids = self.users.list_users_for_notification_planning().await?;
        let mut summary = PlanningSummary::default();

        for user_id in user_ids {
            summary.users += 1;
            match self.sync_jobs_for_user(user_id).await {
                Ok(outcome) => {
                    summary.written += outcome.written;
                    summary.cancelled += outcome.cancelled;
                }
                Err(e) => {
                    summary.failed_users += 1;
                    tracing::error!(%user_id, error = %e, "Reminder planning failed for user");
                }
            }
        }

        tracing::info!(
            users = summary.users,
            failed = summary.failed_users,
            written = summary.written,
            cancelled = summary.cancelled,
            "Reminder planning pass complete"
        );
        Ok(summary)
    }

    /// Plan one user as of now.
    pub async fn sync_jobs_for_user(&self, user_id: Uuid) -> AppResult<PlanOutcome> {
        self.sync_jobs_for_user_at(user_id, Utc::now()).await
    }

    /// Plan one user as of `now`.
    pub async fn sync_jobs_for_user_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<PlanOutcome> {
        let preference = match self.preferences.get(user_id).await? {
            Some(preference) if preference.enabled => preference,
            _ => {
                let cancelled = self.jobs.cancel_all_for_user(user_id).await?;
                tracing::debug!(%user_id, cancelled, "Notifications disabled, outstanding jobs cancelled");
                return Ok(PlanOutcome {
                    cancelled,
                    ..Default::default()
                });
            }
        };

        let language = self.users.get_user_language_code(user_id).await?;
        let locale = Locale::detect(language.as_deref());
        let today = date_in_time_zone(now, preference.timezone);

        let sessions = self
            .schedules
            .list_schedulable_sessions_for_user(user_id, today)
            .await?;
        let goals = self
            .schedules
            .list_scheduled_personal_goals_for_user(user_id)
            .await?;

        let candidates =
            self.build_candidates(&preference, locale, today, &sessions, &goals, now);
        let keep_keys: Vec<String> = candidates.iter().map(|c| c.dedupe_key.clone()).collect();

        let written = self.jobs.upsert_many(&candidates).await?;
        let cancelled = self.jobs.cancel_not_in_set(user_id, &keep_keys).await?;

        let outcome = PlanOutcome {
            planned: candidates.len(),
            skipped_quiet_hours: candidates
                .iter()
                .filter(|c| c.status == NotificationJobStatus::SkippedQuietHours)
                .count(),
            written,
            cancelled,
        };
        tracing::debug!(
            %user_id,
            planned = outcome.planned,
            written = outcome.written,
            cancelled = outcome.cancelled,
            "Reminders planned"
        );
        Ok(outcome)
    }

    /// Every candidate the user's schedule calls for.
    pub fn build_candidates(
        &self,
        preference: &NotificationPreference,
        locale: Locale,
        today: NaiveDate,
        sessions: &[SchedulableSession],
        goals: &[ScheduledPersonalGoal],
        now: DateTime<Utc>,
    ) -> Vec<JobCandidate> {
        let payloads = PayloadBuilder::new(locale, &self.app_base_url);
        let user_id = preference.user_id;
        let lead = preference.lead_minutes;

        let remaining: Vec<&SchedulableSession> = sessions
            .iter()
            .filter(|s| s.session_date >= today && s.is_remaining())
            .collect();

        let mut candidates = Vec::new();

        if preference.reminder_mode.includes_sessions() {
            for session in &remaining {
                candidates.push(self.candidate(
                    preference,
                    now,
                    Occurrence {
                        program_id: Some(session.program_id),
                        program_schedule_id: Some(session.schedule_id),
                        personal_goal_id: None,
                        date: session.session_date,
                        mode: NotificationMode::Session,
                        payload: payloads.session(session),
                        dedupe_key: format!(
                            "session:{}:user:{user_id}:lead:{lead}",
                            session.schedule_id
                        ),
                    },
                ));
            }
        }

        if preference.reminder_mode.includes_daily_summary() {
            let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
            for session in &remaining {
                *per_day.entry(session.session_date).or_default() += 1;
            }
            for (date, count) in per_day {
                candidates.push(self.candidate(
                    preference,
                    now,
                    Occurrence {
                        program_id: None,
                        program_schedule_id: None,
                        personal_goal_id: None,
                        date,
                        mode: NotificationMode::DailySummary,
                        payload: payloads.daily_summary(date, count),
                        dedupe_key: format!("daily:user:{user_id}:date:{date}:lead:{lead}"),
                    },
                ));
            }
        }

        for goal in goals.iter().filter(|g| !g.schedule_days.is_empty()) {
            for offset in 0..self.goal_horizon_days {
                let date = today + Duration::days(offset);
                if !goal.schedule_days.contains(&date.weekday()) {
                    continue;
                }
                candidates.push(self.candidate(
                    preference,
                    now,
                    Occurrence {
                        program_id: None,
                        program_schedule_id: None,
                        personal_goal_id: Some(goal.id),
                        date,
                        mode: NotificationMode::PersonalGoal,
                        payload: payloads.personal_goal(goal, date),
                        dedupe_key: format!(
                            "pgoal:{}:user:{user_id}:date:{date}:lead:{lead}",
                            goal.id
                        ),
                    },
                ));
            }
        }

        candidates
    }

    fn candidate(
        &self,
        preference: &NotificationPreference,
        now: DateTime<Utc>,
        occurrence: Occurrence,
    ) -> JobCandidate {
        let anchor = zoned_date_time_to_utc(
            occurrence.date,
            preference.preferred_time_local,
            preference.timezone,
        );
        let fire_at = add_minutes(anchor, -i64::from(preference.lead_minutes));

        // Born skipped rather than claimed and discarded later.
        let quiet = is_time_inside_quiet_hours(
            local_time_in_time_zone(fire_at, preference.timezone),
            preference.quiet_hours_start,
            preference.quiet_hours_end,
        );
        let (status, processed_at) = if quiet {
            (NotificationJobStatus::SkippedQuietHours, Some(now))
        } else {
            (NotificationJobStatus::Pending, None)
        };

        JobCandidate {
            user_id: preference.user_id,
            program_id: occurrence.program_id,
            program_schedule_id: occurrence.program_schedule_id,
            personal_goal_id: occurrence.personal_goal_id,
            reminder_date: occurrence.date,
            mode: occurrence.mode,
            fire_at,
            payload: occurrence.payload,
            dedupe_key: occurrence.dedupe_key,
            status,
            processed_at,
        }
    }
}

struct Occurrence {
    program_id: Option<Uuid>,
    program_schedule_id: Option<Uuid>,
    personal_goal_id: Option<Uuid>,
    date: NaiveDate,
    mode: NotificationMode,
    payload: serde_json::Value,
    dedupe_key: String,
}
