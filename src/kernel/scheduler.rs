//! Autosave and autosync timing decisions.
//!
//! Both schedulers are plain state owned by the dispatcher. They never sleep;
//! they only emit `ArmTimer`/`StopTimer`/`RunSync` effects and validate the
//! ticks coming back from the runtime timers.

use std::time::{Duration, Instant};

use super::effect::{Effect, TimerKind};
use super::message::SyncKind;

/// Continuous typing still gets saved once its first edit is this many intervals old.
const MAX_WAIT_INTERVALS: u32 = 2;

/// Tracks the current arming of one runtime timer.
///
/// Every arm or stop bumps the generation, so a tick that was already queued
/// when its timer got reset or stopped no longer matches and is dropped.
#[derive(Debug, Clone, Default)]
pub struct TimerSlot {
    generation: u64,
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub fn arm(&mut self, timer: TimerKind, now: Instant, after: Duration) -> Effect {
        self.generation += 1;
        self.deadline = Some(now + after);
        Effect::ArmTimer {
            timer,
            after,
            generation: self.generation,
        }
    }

    pub fn stop(&mut self, timer: TimerKind) -> Option<Effect> {
        self.deadline.take()?;
        self.generation += 1;
        Some(Effect::StopTimer { timer })
    }

    /// Consumes the pending fire. Returns false for a tick from an older arming.
    pub fn take_fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.deadline.is_none() {
            return false;
        }
        self.deadline = None;
        true
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub enum ScanDecision {
    /// Tick from an older arming, or no edit has happened yet.
    Ignore,
    /// The last edit is too recent; the timer was re-armed for the remainder.
    Defer(Effect),
    /// Enqueue every dirty tab.
    Scan,
}

#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    interval: Duration,
    slot: TimerSlot,
    /// First edit not yet covered by a scan.
    burst_started: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            slot: TimerSlot::default(),
            burst_started: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on how long a burst of edits may postpone its scan.
    pub fn max_wait(&self) -> Duration {
        self.interval * MAX_WAIT_INTERVALS
    }

    pub fn slot(&self) -> &TimerSlot {
        &self.slot
    }

    /// Must be called before the workspace's `last_edit_at` moves to `now`.
    ///
    /// An edit after a quiet period longer than the interval restarts the
    /// countdown; edits inside a burst leave the pending fire alone.
    pub fn on_edit(&mut self, previous_edit: Option<Instant>, now: Instant) -> Option<Effect> {
        let quiet = previous_edit
            .map_or(true, |prev| now.saturating_duration_since(prev) > self.interval);
        if quiet {
            self.burst_started = Some(now);
        } else {
            self.burst_started.get_or_insert(now);
        }
        if quiet || !self.slot.is_armed() {
            Some(self.slot.arm(TimerKind::Autosave, now, self.interval))
        } else {
            None
        }
    }

    pub fn on_fire(
        &mut self,
        generation: u64,
        last_edit_at: Option<Instant>,
        now: Instant,
    ) -> ScanDecision {
        if !self.slot.take_fire(generation) {
            return ScanDecision::Ignore;
        }
        let Some(last_edit_at) = last_edit_at else {
            return ScanDecision::Ignore;
        };
        let since_edit = now.saturating_duration_since(last_edit_at);
        let burst_deadline = self.burst_started.map(|start| start + self.max_wait());
        let overdue = burst_deadline.is_some_and(|deadline| now >= deadline);
        if since_edit < self.interval && !overdue {
            let mut remaining = self.interval - since_edit;
            if let Some(deadline) = burst_deadline {
                remaining = remaining.min(deadline.saturating_duration_since(now));
            }
            return ScanDecision::Defer(self.slot.arm(TimerKind::Autosave, now, remaining));
        }
        self.burst_started = None;
        ScanDecision::Scan
    }

    /// A failed save leaves its document dirty; make sure another scan comes.
    pub fn on_save_failed(&mut self, now: Instant) -> Option<Effect> {
        if self.slot.is_armed() {
            return None;
        }
        Some(self.slot.arm(TimerKind::Autosave, now, self.interval))
    }
}

#[derive(Debug, Clone)]
pub struct SyncScheduler {
    interval: Duration,
    slot: TimerSlot,
    next_sync_at: Option<Instant>,
    running: Option<SyncKind>,
}

impl SyncScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            slot: TimerSlot::default(),
            next_sync_at: None,
            running: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn slot(&self) -> &TimerSlot {
        &self.slot
    }

    pub fn next_sync_at(&self) -> Option<Instant> {
        self.next_sync_at
    }

    pub fn running(&self) -> Option<SyncKind> {
        self.running
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start(&mut self, now: Instant) -> Effect {
        self.rearm(now, self.interval)
    }

    /// Handles `StartSync`. While a sync is running this is a no-op, and an
    /// auto tick consumed here leaves the timer disarmed until the result.
    pub fn request(&mut self, kind: SyncKind, generation: Option<u64>) -> Vec<Effect> {
        if let Some(generation) = generation {
            if !self.slot.take_fire(generation) {
                tracing::trace!(generation, "stale sync tick dropped");
                return Vec::new();
            }
        }
        if let Some(running) = self.running {
            tracing::debug!(?kind, ?running, "sync already in flight; request dropped");
            return Vec::new();
        }

        let mut effects = Vec::with_capacity(2);
        if let Some(stop) = self.slot.stop(TimerKind::Sync) {
            effects.push(stop);
        }
        self.running = Some(kind);
        effects.push(Effect::RunSync(kind));
        effects
    }

    /// A user action far ahead of a backed-off schedule syncs right away.
    pub fn on_user_action(&mut self, now: Instant) -> Vec<Effect> {
        if self.running.is_some() {
            return Vec::new();
        }
        let backed_off = self
            .next_sync_at
            .is_some_and(|at| at.saturating_duration_since(now) > self.interval);
        if !backed_off {
            return Vec::new();
        }
        self.request(SyncKind::Manual, None)
    }

    /// Auto syncs back off by the user's idle time; manual syncs use the base interval.
    pub fn on_result(&mut self, kind: SyncKind, now: Instant, last_action_at: Instant) -> Effect {
        if self.running.take().is_none() {
            tracing::warn!(?kind, "sync result without a running sync");
        }
        let next = match kind {
            SyncKind::Auto => self
                .interval
                .max(now.saturating_duration_since(last_action_at)),
            SyncKind::Manual => self.interval,
        };
        self.rearm(now, next)
    }

    fn rearm(&mut self, now: Instant, after: Duration) -> Effect {
        self.next_sync_at = Some(now + after);
        self.slot.arm(TimerKind::Sync, now, after)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/scheduler.rs"]
mod tests;
