//! Timezone conversion and quiet-hours helpers.
//!
//! All functions are pure. Local wall-clock values are `NaiveDate` /
//! `NaiveTime`; absolute instants are `DateTime<Utc>`; zones are IANA
//! names resolved through `chrono-tz`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Upper bound on how far a spring-forward gap is scanned, in minutes.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Parse a `"HH:MM"` (or `"HH:MM:SS"`) wall-clock time.
pub fn parse_local_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Parse an IANA timezone name. Returns `None` for unknown zones.
pub fn parse_time_zone(name: &str) -> Option<Tz> {
    name.trim().parse().ok()
}

/// Resolve a stored timezone name, falling back when missing or invalid.
pub fn resolve_time_zone(name: Option<&str>, fallback: Tz) -> Tz {
    name.and_then(parse_time_zone).unwrap_or(fallback)
}

/// Resolve a calendar date and local wall-clock time in `tz` to an instant.
///
/// Ambiguous local times (the repeated hour when clocks fall back) resolve
/// to the earlier instant. Nonexistent local times (the skipped hour when
/// clocks spring forward) resolve to the first valid instant after the gap.
pub fn zoned_date_time_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, time);

    for minutes in 0..=MAX_GAP_MINUTES {
        let candidate = naive + Duration::minutes(minutes);
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved.with_timezone(&Utc);
        }
    }

    Utc.from_utc_datetime(&naive)
}

/// Shift an instant by a (possibly negative) number of minutes.
pub fn add_minutes(instant: DateTime<Utc>, delta: i64) -> DateTime<Utc> {
    instant + Duration::minutes(delta)
}

/// Wall-clock time of `instant` in `tz`, truncated to the minute.
pub fn local_time_in_time_zone(instant: DateTime<Utc>, tz: Tz) -> NaiveTime {
    let local = instant.with_timezone(&tz).time();
    NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or(local)
}

/// Format the wall-clock time of `instant` in `tz` as `"HH:MM"`.
pub fn format_time_in_time_zone(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// Calendar date of `instant` in `tz`.
pub fn date_in_time_zone(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Whether a local time falls inside the quiet window `[start, end)`.
///
/// When `end <= start` the window wraps midnight, so `22:00-07:00` matches
/// times on or after 22:00 and times before 07:00.
pub fn is_time_inside_quiet_hours(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if end <= start {
        time >= start || time < end
    } else {
        time >= start && time < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(value: &str) -> NaiveTime {
        parse_local_time(value).unwrap()
    }

    fn d(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn brussels() -> Tz {
        parse_time_zone("Europe/Brussels").unwrap()
    }

    #[test]
    fn test_parse_local_time() {
        assert_eq!(t("19:00"), NaiveTime::from_hms_opt(19, 0, 0).unwrap());
        assert_eq!(t(" 07:30:15 "), NaiveTime::from_hms_opt(7, 30, 15).unwrap());
        assert!(parse_local_time("25:00").is_none());
        assert!(parse_local_time("evening").is_none());
    }

    #[test]
    fn test_resolve_time_zone_falls_back() {
        let fallback = brussels();
        assert_eq!(resolve_time_zone(Some("Mars/Olympus_Mons"), fallback), fallback);
        assert_eq!(resolve_time_zone(None, fallback), fallback);
        assert_eq!(
            resolve_time_zone(Some("America/New_York"), fallback),
            chrono_tz::America::New_York
        );
    }

    #[test]
    fn test_winter_and_summer_offsets() {
        let winter = zoned_date_time_to_utc(d("2026-02-20"), t("19:00"), brussels());
        assert_eq!(winter.to_rfc3339(), "2026-02-20T18:00:00+00:00");

        let summer = zoned_date_time_to_utc(d("2026-07-01"), t("19:00"), brussels());
        assert_eq!(summer.to_rfc3339(), "2026-07-01T17:00:00+00:00");
    }

    #[test]
    fn test_spring_forward_gap_moves_past_gap() {
        let instant = zoned_date_time_to_utc(d("2026-03-29"), t("02:30"), brussels());
        assert_eq!(instant.to_rfc3339(), "2026-03-29T01:00:00+00:00");
        assert_eq!(format_time_in_time_zone(instant, brussels()), "03:00");
    }

    #[test]
    fn test_fall_back_ambiguity_takes_earlier() {
        let instant = zoned_date_time_to_utc(d("2026-10-25"), t("02:30"), brussels());
        assert_eq!(instant.to_rfc3339(), "2026-10-25T00:30:00+00:00");
    }

    #[test]
    fn test_add_minutes_and_format() {
        let fire = add_minutes(
            zoned_date_time_to_utc(d("2026-02-20"), t("19:00"), brussels()),
            -60,
        );
        assert_eq!(format_time_in_time_zone(fire, brussels()), "18:00");
        assert_eq!(local_time_in_time_zone(fire, brussels()), t("18:00"));
        assert_eq!(date_in_time_zone(fire, brussels()), d("2026-02-20"));
    }

    #[test]
    fn test_quiet_hours_boundaries() {
        let (start, end) = (t("22:00"), t("07:00"));
        assert!(is_time_inside_quiet_hours(t("22:00"), start, end));
        assert!(is_time_inside_quiet_hours(t("23:59"), start, end));
        assert!(is_time_inside_quiet_hours(t("00:00"), start, end));
        assert!(is_time_inside_quiet_hours(t("06:59"), start, end));
        assert!(!is_time_inside_quiet_hours(t("07:00"), start, end));
        assert!(!is_time_inside_quiet_hours(t("21:59"), start, end));

        let (start, end) = (t("13:00"), t("14:00"));
        assert!(is_time_inside_quiet_hours(t("13:00"), start, end));
        assert!(!is_time_inside_quiet_hours(t("14:00"), start, end));
        assert!(!is_time_inside_quiet_hours(t("12:59"), start, end));
    }

    #[test]
    fn test_wrapping_window_matches_either_side_for_every_minute() {
        let windows = [("22:00", "07:00"), ("23:30", "00:15"), ("08:00", "08:00")];
        for (start, end) in windows {
            let (start, end) = (t(start), t(end));
            for minute in 0..(24 * 60) {
                let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).unwrap();
                assert_eq!(
                    is_time_inside_quiet_hours(time, start, end),
                    time >= start || time < end,
                    "window {start}-{end} at {time}"
                );
            }
        }
    }
}
