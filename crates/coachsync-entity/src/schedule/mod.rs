//! Read-only schedule views consumed by the reminder planner.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A scheduled training session of one of the user's programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SchedulableSession {
    /// Program the session belongs to.
    pub program_id: Uuid,
    /// Schedule row identifier (the session id).
    pub schedule_id: Uuid,
    /// Calendar date of the session.
    pub session_date: NaiveDate,
    /// Activities planned for the session.
    pub planned_count: i32,
    /// Activities already completed.
    pub completed_count: i32,
}

impl SchedulableSession {
    /// Whether the session still has work left.
    pub fn is_remaining(&self) -> bool {
        self.planned_count > 0 && self.completed_count < self.planned_count
    }
}

/// A personal goal with a recurring weekday schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPersonalGoal {
    /// Goal identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Weekdays the goal recurs on.
    pub schedule_days: Vec<Weekday>,
}

/// A `personal_goals` row as stored (ISO weekday numbers, Monday = 1).
#[derive(Debug, Clone, FromRow)]
pub struct PersonalGoalRow {
    /// Goal identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// ISO weekday numbers.
    pub schedule_days: Vec<i16>,
}

impl From<PersonalGoalRow> for ScheduledPersonalGoal {
    fn from(row: PersonalGoalRow) -> Self {
        let mut schedule_days: Vec<Weekday> =
            row.schedule_days.iter().filter_map(|d| iso_weekday(*d)).collect();
        schedule_days.sort_by_key(|d| d.number_from_monday());
        schedule_days.dedup();
        Self {
            id: row.id,
            name: row.name,
            schedule_days,
        }
    }
}

fn iso_weekday(day: i16) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_row_conversion_drops_invalid_days() {
        let row = PersonalGoalRow {
            id: Uuid::new_v4(),
            name: "Stretch".to_string(),
            schedule_days: vec![5, 1, 9, 1, 0, 7],
        };
        let goal = ScheduledPersonalGoal::from(row);
        assert_eq!(goal.schedule_days, vec![Weekday::Mon, Weekday::Fri, Weekday::Sun]);
    }

    #[test]
    fn test_session_remaining() {
        let mut session = SchedulableSession {
            program_id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            session_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            planned_count: 3,
            completed_count: 2,
        };
        assert!(session.is_remaining());
        session.completed_count = 3;
        assert!(!session.is_remaining());
        session.planned_count = 0;
        session.completed_count = 0;
        assert!(!session.is_remaining());
    }
}
