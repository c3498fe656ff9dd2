// src/services/timing.rs

use chrono::{DateTime, Duration, Utc};

/// Where `now` falls relative to an exam's optional scheduled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    NotOpen,
    Open,
    Closed,
}

pub fn window_state(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> WindowState {
    if starts_at.is_some_and(|start| now < start) {
        WindowState::NotOpen
    } else if ends_at.is_some_and(|end| now >= end) {
        WindowState::Closed
    } else {
        WindowState::Open
    }
}

/// Deadline of an attempt: the exam duration from `started_at`, cut short
/// by the end of the exam window.
pub fn compute_expiration(
    started_at: DateTime<Utc>,
    duration_minutes: i64,
    ends_at: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    let by_duration = started_at + Duration::minutes(duration_minutes);
    match ends_at {
        Some(end) if end < by_duration => end,
        _ => by_duration,
    }
}

/// Seconds left before `expires_at`, never negative.
pub fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_seconds().max(0)
}

/// True while new answers may still be saved.
pub fn is_open(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

/// True if a submission at `now` still counts as on time.
pub fn accepts_submission(expires_at: DateTime<Utc>, now: DateTime<Utc>, grace_seconds: i64) -> bool {
    now <= expires_at + Duration::seconds(grace_seconds.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn expiration_uses_duration() {
        assert_eq!(compute_expiration(at(10, 0, 0), 45, None), at(10, 45, 0));
    }

    #[test]
    fn window_end_cuts_the_attempt_short() {
        assert_eq!(
            compute_expiration(at(10, 0, 0), 60, Some(at(10, 30, 0))),
            at(10, 30, 0)
        );
        assert_eq!(
            compute_expiration(at(10, 0, 0), 20, Some(at(10, 30, 0))),
            at(10, 20, 0)
        );
    }

    #[test]
    fn remaining_is_clamped_at_zero() {
        assert_eq!(remaining_seconds(at(10, 30, 0), at(10, 29, 0)), 60);
        assert_eq!(remaining_seconds(at(10, 30, 0), at(11, 0, 0)), 0);
    }

    #[test]
    fn grace_applies_to_submissions_only() {
        let deadline = at(10, 30, 0);
        let late = at(10, 30, 20);

        assert!(!is_open(deadline, late));
        assert!(accepts_submission(deadline, late, 30));
        assert!(!accepts_submission(deadline, at(10, 31, 0), 30));
        assert!(!accepts_submission(deadline, late, 0));
    }

    #[test]
    fn window_states() {
        let start = Some(at(9, 0, 0));
        let end = Some(at(12, 0, 0));

        assert_eq!(window_state(start, end, at(8, 0, 0)), WindowState::NotOpen);
        assert_eq!(window_state(start, end, at(10, 0, 0)), WindowState::Open);
        assert_eq!(window_state(start, end, at(12, 0, 0)), WindowState::Closed);
        assert_eq!(window_state(None, None, at(0, 0, 0)), WindowState::Open);
    }
}
