use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sequencer::{RunId, TickKind};

/// Wall-clock length of one sequencer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickPacing {
    pub tick_ms: u64,
}

impl Default for TickPacing {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

impl TickPacing {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Timer armed by the sequencer, due at an absolute tick on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTick {
    pub run: RunId,
    pub kind: TickKind,
    pub due: u64,
}

/// Single-slot timer on a virtual clock counted in ticks.
///
/// The sequencer never has more than one wait outstanding, so arming a new
/// tick replaces whatever was pending.
#[derive(Debug, Default, Clone)]
pub struct TickTimer {
    now: u64,
    pending: Option<PendingTick>,
}

impl TickTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending(&self) -> Option<PendingTick> {
        self.pending
    }

    /// Arms a tick that fires one unit from now.
    pub fn schedule(&mut self, run: RunId, kind: TickKind) {
        if let Some(replaced) = self.pending {
            tracing::debug!(run = %replaced.run, "replacing pending tick");
        }
        self.pending = Some(PendingTick {
            run,
            kind,
            due: self.now + 1,
        });
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Moves the clock forward by `units` and returns the tick that came due,
    /// if any. Only the armed tick can fire; advancing an idle timer just
    /// moves the clock.
    pub fn advance(&mut self, units: u64) -> Option<PendingTick> {
        self.now += units;
        match self.pending {
            Some(tick) if tick.due <= self.now => self.pending.take(),
            _ => None,
        }
    }
}
