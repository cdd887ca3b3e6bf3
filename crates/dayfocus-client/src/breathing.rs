//! Box-breathing routine.
//!
//! ```text
//! Inhale (4s) -> Hold (4s) -> Exhale (4s) -> Inhale ...
//! ```
//!
//! Finishing an exhale completes one cycle. [`BreathingRoutine`] is the
//! plain state machine; [`BreathingSession`] drives it from a
//! [`ScopedInterval`] and publishes every change on a watch channel.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::timer::ScopedInterval;

/// How long each phase lasts.
pub const PHASE_DURATION: Duration = Duration::from_secs(4);

/// Instruction shown while the routine is not running.
pub const IDLE_INSTRUCTION: &str = "Ready";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BreathingPhase {
    #[default]
    Inhale,
    Hold,
    Exhale,
}

impl BreathingPhase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::Inhale => Self::Hold,
            Self::Hold => Self::Exhale,
            Self::Exhale => Self::Inhale,
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Self::Inhale => "Breathe In",
            Self::Hold => "Hold",
            Self::Exhale => "Breathe Out",
        }
    }

    /// Relative size of the breathing circle during this phase.
    pub fn scale(self) -> f32 {
        match self {
            Self::Inhale | Self::Hold => 1.5,
            Self::Exhale => 0.75,
        }
    }
}

impl fmt::Display for BreathingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.instruction())
    }
}

/// Breathing state: running flag, current phase and completed cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreathingRoutine {
    running: bool,
    phase: BreathingPhase,
    cycles: u32,
}

impl BreathingRoutine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a fresh inhale with the cycle count reset.
    pub fn start(&mut self) {
        self.running = true;
        self.phase = BreathingPhase::Inhale;
        self.cycles = 0;
    }

    /// Returns to idle. The phase resets to inhale; the count is kept.
    pub fn stop(&mut self) {
        self.running = false;
        self.phase = BreathingPhase::Inhale;
    }

    /// Moves to the next phase. Does nothing while idle.
    pub fn advance(&mut self) {
        if !self.running {
            return;
        }
        if self.phase == BreathingPhase::Exhale {
            self.cycles += 1;
        }
        self.phase = self.phase.next();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> BreathingPhase {
        self.phase
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// The cycle in progress, counting from one.
    pub fn current_cycle(&self) -> u32 {
        self.cycles + 1
    }

    pub fn instruction(&self) -> &'static str {
        if self.running {
            self.phase.instruction()
        } else {
            IDLE_INSTRUCTION
        }
    }

    pub fn scale(&self) -> f32 {
        if self.running { self.phase.scale() } else { 1.0 }
    }
}

/// A running routine ticking every [`PHASE_DURATION`].
///
/// The ticker lives as long as the session is running; [`stop`](Self::stop)
/// or dropping the session cancels it.
#[derive(Debug)]
pub struct BreathingSession {
    routine: Arc<Mutex<BreathingRoutine>>,
    updates: watch::Sender<BreathingRoutine>,
    ticker: Option<ScopedInterval>,
}

impl Default for BreathingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BreathingSession {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(BreathingRoutine::new());
        Self {
            routine: Arc::new(Mutex::new(BreathingRoutine::new())),
            updates,
            ticker: None,
        }
    }

    /// Subscribes to routine changes.
    pub fn subscribe(&self) -> watch::Receiver<BreathingRoutine> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> BreathingRoutine {
        *self.routine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Starts (or restarts) the routine.
    pub fn start(&mut self) {
        self.start_with_period(PHASE_DURATION);
    }

    fn start_with_period(&mut self, period: Duration) {
        // Replacing the ticker drops, and so cancels, any previous one.
        self.ticker = None;
        self.update(BreathingRoutine::start);

        let routine = self.routine.clone();
        let updates = self.updates.clone();
        self.ticker = Some(ScopedInterval::spawn(period, move || {
            let mut routine = routine.lock().unwrap_or_else(PoisonError::into_inner);
            routine.advance();
            debug!(phase = ?routine.phase(), cycles = routine.cycles(), "breathing tick");
            updates.send_replace(*routine);
        }));
    }

    pub fn stop(&mut self) {
        self.ticker = None;
        self.update(BreathingRoutine::stop);
    }

    fn update(&self, change: impl FnOnce(&mut BreathingRoutine)) {
        let mut routine = self.routine.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut routine);
        self.updates.send_replace(*routine);
    }
}
