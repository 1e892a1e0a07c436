//! Turns submitted sessions into the numbers that get stored.

use chrono::{DateTime, Utc};
use derive_more::Display;

use crate::model::{
    session::Session,
    worklog::{NewIdleSegment, NewWorkLog},
};

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ReconcileError {
    #[display(fmt = "endTime must not be before startTime")]
    EndBeforeStart,
    #[display(fmt = "duration must be a non-negative number of seconds")]
    NegativeDuration,
    #[display(fmt = "duration must not exceed the time between startTime and endTime")]
    DurationExceedsRange,
    #[display(fmt = "idle segment {} is invalid", _0)]
    InvalidIdleSegment(usize),
    #[display(fmt = "idle segment {} is longer than its time range", _0)]
    IdleSegmentTooLong(usize),
    #[display(fmt = "total idle time is out of range")]
    IdleOverflow,
}

impl std::error::Error for ReconcileError {}

/// A worklog ready to be inserted: every duration is known and
/// `effective_duration == max(duration - total_idle_time, 0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledWorkLog {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub idle_segments: Vec<NewIdleSegment>,
    pub total_idle_time: i64,
    pub effective_duration: i64,
}

/// `None` on overflow.
pub fn total_idle_time(segments: &[NewIdleSegment]) -> Option<i64> {
    segments
        .iter()
        .filter_map(|s| s.duration)
        .try_fold(0i64, |acc, d| acc.checked_add(d))
}

pub fn effective_duration(duration: i64, total_idle_time: i64) -> i64 {
    duration.saturating_sub(total_idle_time).max(0)
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds()
}

pub fn normalize(new: &NewWorkLog) -> Result<ReconciledWorkLog, ReconcileError> {
    if new.end_time < new.start_time {
        return Err(ReconcileError::EndBeforeStart);
    }

    // the client's own measurement wins, bounded by the timestamps
    let span = seconds_between(new.start_time, new.end_time);
    let duration = new.duration.unwrap_or(span);
    if duration < 0 {
        return Err(ReconcileError::NegativeDuration);
    }
    if duration > span {
        return Err(ReconcileError::DurationExceedsRange);
    }

    let idle_segments = new
        .idle_segments
        .iter()
        .enumerate()
        .map(|(idx, seg)| {
            if seg.end < seg.start {
                return Err(ReconcileError::InvalidIdleSegment(idx));
            }
            let span = seconds_between(seg.start, seg.end);
            let seconds = seg.duration.unwrap_or(span);
            if seconds < 0 {
                return Err(ReconcileError::InvalidIdleSegment(idx));
            }
            if seconds > span {
                return Err(ReconcileError::IdleSegmentTooLong(idx));
            }
            Ok(NewIdleSegment {
                start: seg.start,
                end: seg.end,
                duration: Some(seconds),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total_idle = total_idle_time(&idle_segments).ok_or(ReconcileError::IdleOverflow)?;

    Ok(ReconciledWorkLog {
        start_time: new.start_time,
        end_time: new.end_time,
        duration,
        idle_segments,
        total_idle_time: total_idle,
        effective_duration: effective_duration(duration, total_idle),
    })
}

/// Seconds between login and `logout_at`, never negative.
pub fn session_duration(session: &Session, logout_at: DateTime<Utc>) -> i64 {
    seconds_between(session.login_at, logout_at).max(0)
}

/// Worklog covering a whole login session, used when the user logs out
/// without stopping the timer. `None` until the session has a logout time.
pub fn worklog_from_session(session: &Session) -> Option<NewWorkLog> {
    let logout_at = session.logout_at?;
    let end_time = logout_at.max(session.login_at);
    Some(NewWorkLog {
        start_time: session.login_at,
        end_time,
        duration: Some(session_duration(session, end_time)),
        idle_segments: Vec::new(),
    })
}
