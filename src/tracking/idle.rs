//! Inactivity detection for a running work timer.
//!
//! The detector is a plain state machine driven by explicit timestamps, so it
//! can be unit tested without a clock. [`watch`] wraps it in the polling loop a
//! client runs while the timer is active.

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use tokio::{
    sync::{Mutex, watch as signal},
    time::{self, MissedTickBehavior},
};

#[derive(Debug, Clone, Copy)]
pub struct IdleConfig {
    /// Silence after which the user is considered idle.
    pub threshold: Duration,
    /// How often the watcher polls the detector.
    pub poll_interval: StdDuration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            threshold: Duration::seconds(30),
            poll_interval: StdDuration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Idle,
}

#[derive(Debug, Clone)]
pub struct IdleDetector {
    config: IdleConfig,
    enabled: bool,
    state: IdleState,
    last_activity: DateTime<Utc>,
}

impl IdleDetector {
    pub fn new(config: IdleConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            enabled: false,
            state: IdleState::Active,
            last_activity: now,
        }
    }

    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_idle(&self) -> bool {
        self.state == IdleState::Idle
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    /// Last activity seen before the detector went idle.
    pub fn idle_since(&self) -> Option<DateTime<Utc>> {
        self.is_idle().then_some(self.last_activity)
    }

    /// Enabling restarts the silence window; disabling freezes the detector.
    pub fn set_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        if enabled && !self.enabled {
            self.last_activity = now;
        }
        self.enabled = enabled;
    }

    /// Activity while idle is ignored until the owner calls [`reset`](Self::reset).
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        if self.state == IdleState::Active && now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Returns `true` exactly once per transition into the idle state.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.state == IdleState::Idle {
            return false;
        }
        if now - self.last_activity >= self.config.threshold {
            self.state = IdleState::Idle;
            return true;
        }
        false
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.state = IdleState::Active;
        self.last_activity = now;
    }
}

/// Polls `detector` every `poll_interval` and calls `on_idle` with the time of
/// the last activity whenever the user goes idle. Runs until `shutdown` turns
/// `true` or its sender is dropped.
pub async fn watch<C, F>(
    detector: Arc<Mutex<IdleDetector>>,
    clock: C,
    mut on_idle: F,
    mut shutdown: signal::Receiver<bool>,
) where
    C: Fn() -> DateTime<Utc>,
    F: FnMut(DateTime<Utc>),
{
    let poll_interval = detector.lock().await.config().poll_interval;
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fired = {
                    let mut guard = detector.lock().await;
                    if guard.poll(clock()) { guard.idle_since() } else { None }
                };
                if let Some(since) = fired {
                    log::debug!("idle detected, last activity at {}", since);
                    on_idle(since);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
