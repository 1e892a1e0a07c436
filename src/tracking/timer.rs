use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;

use crate::model::worklog::{NewIdleSegment, NewWorkLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum TimerError {
    #[display(fmt = "timer already started")]
    AlreadyStarted,
    #[display(fmt = "timer is not running")]
    NotRunning,
    #[display(fmt = "timer is not paused")]
    NotPaused,
    #[display(fmt = "no active session to finish")]
    NothingToFinish,
}

impl std::error::Error for TimerError {}

/// Client-side work session: counts active seconds once per tick, pauses when
/// the idle detector fires and records the idle interval.
#[derive(Debug, Clone)]
pub struct WorkTimer {
    status: TimerStatus,
    started_at: Option<DateTime<Utc>>,
    active_seconds: u64,
    idle_segments: Vec<NewIdleSegment>,
    open_idle: Option<DateTime<Utc>>,
}

impl Default for WorkTimer {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            started_at: None,
            active_seconds: 0,
            idle_segments: Vec::new(),
            open_idle: None,
        }
    }
}

impl WorkTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn active_seconds(&self) -> u64 {
        self.active_seconds
    }

    pub fn idle_segments(&self) -> &[NewIdleSegment] {
        &self.idle_segments
    }

    /// True while counting; the idle detector should be enabled only then.
    pub fn is_counting(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.status != TimerStatus::Idle {
            return Err(TimerError::AlreadyStarted);
        }
        self.status = TimerStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// One second of wall time has passed.
    pub fn tick(&mut self) {
        if self.status == TimerStatus::Running {
            self.active_seconds += 1;
        }
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        if self.status != TimerStatus::Running {
            return Err(TimerError::NotRunning);
        }
        self.status = TimerStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        if self.status != TimerStatus::Paused || self.open_idle.is_some() {
            return Err(TimerError::NotPaused);
        }
        self.status = TimerStatus::Running;
        Ok(())
    }

    /// Auto-pause: the user has been inactive since `since`.
    pub fn mark_idle(&mut self, since: DateTime<Utc>) -> Result<(), TimerError> {
        if self.status != TimerStatus::Running {
            return Err(TimerError::NotRunning);
        }
        self.status = TimerStatus::Paused;
        self.open_idle = Some(since);
        Ok(())
    }

    /// Closes the idle segment opened by [`mark_idle`](Self::mark_idle) and
    /// keeps counting.
    pub fn resume_after_idle(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        let since = match (self.status, self.open_idle) {
            (TimerStatus::Paused, Some(since)) => since,
            _ => return Err(TimerError::NotPaused),
        };
        self.close_idle(since, now);
        self.status = TimerStatus::Running;
        Ok(())
    }

    /// Ends the session and produces the worklog payload. Duration is whole
    /// seconds between start and `now`, measured on the wall clock.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<NewWorkLog, TimerError> {
        let started_at = match (self.status, self.started_at) {
            (TimerStatus::Running | TimerStatus::Paused, Some(at)) => at,
            _ => return Err(TimerError::NothingToFinish),
        };
        if let Some(since) = self.open_idle {
            self.close_idle(since, now);
        }
        let end_time = now.max(started_at);
        self.status = TimerStatus::Finished;

        Ok(NewWorkLog {
            start_time: started_at,
            end_time,
            duration: Some((end_time - started_at).num_seconds()),
            idle_segments: std::mem::take(&mut self.idle_segments),
        })
    }

    fn close_idle(&mut self, since: DateTime<Utc>, now: DateTime<Utc>) {
        let end = now.max(since);
        self.idle_segments.push(NewIdleSegment {
            start: since,
            end,
            duration: Some((end - since).num_seconds()),
        });
        self.open_idle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::reconcile;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn counts_only_while_running() {
        let mut timer = WorkTimer::new();
        timer.tick();
        assert_eq!(timer.active_seconds(), 0);

        timer.start(t(0)).unwrap();
        for _ in 0..10 {
            timer.tick();
        }
        timer.pause().unwrap();
        timer.tick();
        timer.resume().unwrap();
        timer.tick();
        assert_eq!(timer.active_seconds(), 11);
    }

    #[test]
    fn idle_interval_becomes_a_segment() {
        let mut timer = WorkTimer::new();
        timer.start(t(0)).unwrap();
        timer.mark_idle(t(600)).unwrap();
        assert!(!timer.is_counting());
        assert_eq!(timer.resume(), Err(TimerError::NotPaused));
        timer.resume_after_idle(t(900)).unwrap();

        let log = timer.finish(t(1810)).unwrap();
        assert_eq!(log.duration, Some(1810));
        assert_eq!(log.idle_segments.len(), 1);
        assert_eq!(log.idle_segments[0].duration, Some(300));

        let normalized = reconcile::normalize(&log).unwrap();
        assert_eq!(normalized.total_idle_time, 300);
        assert_eq!(normalized.effective_duration, 1510);
    }

    #[test]
    fn finishing_while_idle_closes_the_open_segment() {
        let mut timer = WorkTimer::new();
        timer.start(t(0)).unwrap();
        timer.mark_idle(t(100)).unwrap();
        let log = timer.finish(t(160)).unwrap();
        assert_eq!(log.idle_segments[0].end, t(160));
        assert_eq!(log.idle_segments[0].duration, Some(60));
    }

    #[test]
    fn cannot_finish_twice_or_before_start() {
        let mut timer = WorkTimer::new();
        assert_eq!(timer.finish(t(1)), Err(TimerError::NothingToFinish));
        timer.start(t(0)).unwrap();
        assert_eq!(timer.start(t(1)), Err(TimerError::AlreadyStarted));
        timer.finish(t(5)).unwrap();
        assert_eq!(timer.status(), TimerStatus::Finished);
        assert_eq!(timer.finish(t(6)), Err(TimerError::NothingToFinish));
    }
}
