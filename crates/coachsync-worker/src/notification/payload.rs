//! Localized push payloads.
//!
//! Every payload carries `title`, `body`, `targetUrl` and `mode`, plus the
//! ids of whatever the reminder is about so the client can deep-link.

use chrono::NaiveDate;
use serde_json::{Value, json};

use coachsync_entity::notification::NotificationMode;
use coachsync_entity::schedule::{SchedulableSession, ScheduledPersonalGoal};

/// Supported reminder languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Dutch, the primary locale.
    #[default]
    Nl,
    /// French.
    Fr,
    /// English.
    En,
}

impl Locale {
    /// Coarse detection from a stored language code (`"fr-BE"`, `"EN"`, ...).
    pub fn detect(code: Option<&str>) -> Self {
        let code = code.map(|c| c.trim().to_ascii_lowercase()).unwrap_or_default();
        if code.starts_with("fr") {
            Self::Fr
        } else if code.starts_with("en") {
            Self::En
        } else {
            Self::Nl
        }
    }

    /// Two-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nl => "nl",
            Self::Fr => "fr",
            Self::En => "en",
        }
    }

    fn format_date(&self, date: NaiveDate) -> String {
        match self {
            Self::Nl | Self::Fr => date.format("%d/%m/%Y").to_string(),
            Self::En => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Builds payloads for one user.
#[derive(Debug, Clone)]
pub struct PayloadBuilder<'a> {
    locale: Locale,
    app_base_url: &'a str,
}

impl<'a> PayloadBuilder<'a> {
    /// Create a builder for `locale`, linking under `app_base_url`.
    pub fn new(locale: Locale, app_base_url: &'a str) -> Self {
        Self {
            locale,
            app_base_url,
        }
    }

    /// Reminder for a single session.
    pub fn session(&self, session: &SchedulableSession) -> Value {
        let date = self.locale.format_date(session.session_date);
        let (title, body) = match self.locale {
            Locale::Nl => (
                "Trainingsherinnering".to_string(),
                format!("Je hebt een sessie gepland op {date}."),
            ),
            Locale::Fr => (
                "Rappel d'entraînement".to_string(),
                format!("Tu as une séance prévue le {date}."),
            ),
            Locale::En => (
                "Training reminder".to_string(),
                format!("You have a session planned on {date}."),
            ),
        };

        json!({
            "title": title,
            "body": body,
            "targetUrl": self.url(&format!(
                "programs/{}?session={}",
                session.program_id, session.schedule_id
            )),
            "mode": NotificationMode::Session.as_str(),
            "programId": session.program_id,
            "programScheduleId": session.schedule_id,
            "reminderDate": session.session_date,
        })
    }

    /// Summary of every remaining session on `date`.
    pub fn daily_summary(&self, date: NaiveDate, count: usize) -> Value {
        let shown = self.locale.format_date(date);
        let (title, body) = match (self.locale, count) {
            (Locale::Nl, 1) => (
                "Je training van de dag".to_string(),
                format!("Je hebt 1 sessie gepland op {shown}."),
            ),
            (Locale::Nl, n) => (
                "Je training van de dag".to_string(),
                format!("Je hebt {n} sessies gepland op {shown}."),
            ),
            (Locale::Fr, 1) => (
                "Ton programme du jour".to_string(),
                format!("Tu as 1 séance prévue le {shown}."),
            ),
            (Locale::Fr, n) => (
                "Ton programme du jour".to_string(),
                format!("Tu as {n} séances prévues le {shown}."),
            ),
            (Locale::En, 1) => (
                "Your training today".to_string(),
                format!("You have 1 session planned on {shown}."),
            ),
            (Locale::En, n) => (
                "Your training today".to_string(),
                format!("You have {n} sessions planned on {shown}."),
            ),
        };

        json!({
            "title": title,
            "body": body,
            "targetUrl": self.url(&format!("agenda?date={date}")),
            "mode": NotificationMode::DailySummary.as_str(),
            "reminderDate": date,
            "sessionCount": count,
        })
    }

    /// Reminder for one occurrence of a recurring personal goal.
    pub fn personal_goal(&self, goal: &ScheduledPersonalGoal, date: NaiveDate) -> Value {
        let (title, body) = match self.locale {
            Locale::Nl => (
                "Persoonlijk doel".to_string(),
                format!("Tijd voor je doel: {}", goal.name),
            ),
            Locale::Fr => (
                "Objectif personnel".to_string(),
                format!("C'est le moment pour ton objectif : {}", goal.name),
            ),
            Locale::En => (
                "Personal goal".to_string(),
                format!("Time for your goal: {}", goal.name),
            ),
        };

        json!({
            "title": title,
            "body": body,
            "targetUrl": self.url(&format!("goals/{}", goal.id)),
            "mode": NotificationMode::PersonalGoal.as_str(),
            "personalGoalId": goal.id,
            "reminderDate": date,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.app_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_locale_detection() {
        assert_eq!(Locale::detect(Some("fr-BE")), Locale::Fr);
        assert_eq!(Locale::detect(Some(" EN ")), Locale::En);
        assert_eq!(Locale::detect(Some("nl")), Locale::Nl);
        assert_eq!(Locale::detect(Some("de-DE")), Locale::Nl);
        assert_eq!(Locale::detect(None), Locale::Nl);
    }

    #[test]
    fn test_session_payload_links_and_ids() {
        let session = SchedulableSession {
            program_id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            planned_count: 1,
            completed_count: 0,
        };
        let payload = PayloadBuilder::new(Locale::En, "https://app.example.com/").session(&session);

        assert_eq!(payload["mode"], "session");
        assert_eq!(payload["body"], "You have a session planned on 2026-02-20.");
        assert_eq!(
            payload["targetUrl"],
            format!(
                "https://app.example.com/programs/{}?session={}",
                session.program_id, session.schedule_id
            )
        );
        assert_eq!(payload["programScheduleId"], session.schedule_id.to_string());
    }

    #[test]
    fn test_daily_summary_pluralizes() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let builder = PayloadBuilder::new(Locale::Nl, "/");
        assert_eq!(
            builder.daily_summary(date, 1)["body"],
            "Je hebt 1 sessie gepland op 04/03/2026."
        );
        let many = builder.daily_summary(date, 3);
        assert_eq!(many["body"], "Je hebt 3 sessies gepland op 04/03/2026.");
        assert_eq!(many["targetUrl"], "/agenda?date=2026-03-04");
        assert_eq!(many["sessionCount"], 3);
    }
}
