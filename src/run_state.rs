//! Run phase state machine
//!
//! A run moves strictly forward through its phases; there is no branching
//! back, no retry and no rollback.
//!
//! ```text
//! Init → Backup → Apply → Restart → Report
//! ```

use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Phases of one run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RunPhase {
    /// Start time recorded, conflicting editor asked to quit
    Init = 0,
    /// Referenced domains exported
    Backup = 1,
    /// Groups applied in declared order
    Apply = 2,
    /// UI processes signalled
    Restart = 3,
    /// Elapsed time and backup path reported (terminal)
    Report = 4,
}

impl RunPhase {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Report)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Backup),
            Self::Backup => Some(Self::Apply),
            Self::Apply => Some(Self::Restart),
            Self::Restart => Some(Self::Report),
            Self::Report => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Init => "Initializing",
            Self::Backup => "Backing up preference domains",
            Self::Apply => "Applying settings",
            Self::Restart => "Restarting services",
            Self::Report => "Reporting",
        }
    }

    pub const fn all_phases() -> &'static [Self] {
        &[
            Self::Init,
            Self::Backup,
            Self::Apply,
            Self::Restart,
            Self::Report,
        ]
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during phase transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseTransitionError {
    #[error("Cannot skip from {from} to {to}")]
    SkippedPhase { from: RunPhase, to: RunPhase },

    #[error("Cannot go backwards from {from} to {to} (runs are forward-only)")]
    BackwardTransition { from: RunPhase, to: RunPhase },

    #[error("Cannot leave terminal phase {from}")]
    FromTerminalPhase { from: RunPhase },

    #[error("Already in phase {phase}")]
    AlreadyInPhase { phase: RunPhase },
}

/// Owns the current phase and the order phases were entered in.
#[derive(Debug, Clone)]
pub struct RunProgress {
    current: RunPhase,
    history: Vec<(RunPhase, Instant)>,
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RunProgress {
    /// Start in `Init`
    pub fn new() -> Self {
        let mut history = Vec::with_capacity(RunPhase::all_phases().len());
        history.push((RunPhase::Init, Instant::now()));
        Self {
            current: RunPhase::Init,
            history,
        }
    }

    #[inline]
    pub fn current(&self) -> RunPhase {
        self.current
    }

    /// Phases entered so far, in order
    pub fn phases(&self) -> Vec<RunPhase> {
        self.history.iter().map(|(phase, _)| *phase).collect()
    }

    /// Move to the next phase.
    pub fn advance(&mut self) -> Result<RunPhase, PhaseTransitionError> {
        let next = self
            .current
            .next()
            .ok_or(PhaseTransitionError::FromTerminalPhase { from: self.current })?;
        self.history.push((next, Instant::now()));
        self.current = next;
        Ok(next)
    }

    /// Move to `target`, which must be exactly the next phase.
    pub fn transition_to(&mut self, target: RunPhase) -> Result<RunPhase, PhaseTransitionError> {
        let from = self.current;
        if target == from {
            return Err(PhaseTransitionError::AlreadyInPhase { phase: target });
        }
        if from.is_terminal() {
            return Err(PhaseTransitionError::FromTerminalPhase { from });
        }
        if target.order() < from.order() {
            return Err(PhaseTransitionError::BackwardTransition { from, to: target });
        }
        if from.next() != Some(target) {
            return Err(PhaseTransitionError::SkippedPhase { from, to: target });
        }
        self.advance()
    }
}
