//! Host-owned timers on a virtual clock.
//!
//! Engines never schedule anything themselves. The host asks an engine for
//! its next delay, registers a timer here under the session's token and
//! feeds fired timers back. Tokens of ended sessions stop being live, so
//! late callbacks are dropped instead of reaching a discarded engine.

use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    EngineTick,
    MemoryResolve,
    QuizCountdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub token: SessionToken,
    pub kind: TimerKind,
    pub due: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    token: SessionToken,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    generation: u64,
    live: Option<SessionToken>,
    next_id: u64,
    timers: BTreeMap<(Duration, TimerId), Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Opens a new session generation. Timers of any earlier session are
    /// cancelled.
    pub fn begin_session(&mut self) -> SessionToken {
        if let Some(previous) = self.live {
            self.cancel_session(previous);
        }
        self.generation += 1;
        let token = SessionToken(self.generation);
        self.live = Some(token);
        debug!("Session generation {} started", self.generation);
        token
    }

    pub fn is_live(&self, token: SessionToken) -> bool {
        self.live == Some(token)
    }

    /// Registers a timer `delay` from now. Returns `None` when `token` is not
    /// the live session.
    pub fn schedule(&mut self, token: SessionToken, kind: TimerKind, delay: Duration) -> Option<TimerId> {
        if !self.is_live(token) {
            debug!("Refusing {:?} for stale session {}", kind, token.0);
            return None;
        }
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert((self.now + delay, id), Timer { token, kind });
        Some(id)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, timer_id)| *timer_id == id).copied();
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Cancels every timer of `token` and retires it. Returns how many were
    /// pending.
    pub fn cancel_session(&mut self, token: SessionToken) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, timer| timer.token != token);
        if self.live == Some(token) {
            self.live = None;
        }
        let cancelled = before - self.timers.len();
        debug!("Cancelled {} timers of session {}", cancelled, token.0);
        cancelled
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timers.keys().next().map(|(due, _)| *due)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Moves the clock forward and returns the timers that came due, oldest
    /// first. Timers of sessions that are no longer live are discarded.
    pub fn advance(&mut self, by: Duration) -> Vec<FiredTimer> {
        self.now += by;
        let mut fired = Vec::new();

        while let Some(entry) = self.timers.first_entry() {
            let (due, id) = *entry.key();
            if due > self.now {
                break;
            }
            let timer = entry.remove();
            if self.is_live(timer.token) {
                fired.push(FiredTimer {
                    id,
                    token: timer.token,
                    kind: timer.kind,
                    due,
                });
            } else {
                debug!("Dropping {:?} of stale session {}", timer.kind, timer.token.0);
            }
        }
        fired
    }

    /// Jumps the clock to the earliest pending timer and fires everything due
    /// at that instant.
    pub fn advance_to_next(&mut self) -> Vec<FiredTimer> {
        match self.next_due() {
            Some(due) => self.advance(due.saturating_sub(self.now)),
            None => Vec::new(),
        }
    }
}
