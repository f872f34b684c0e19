// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use qchar_log::diagnostic;
use serde::Serialize;

use crate::{Error, Result};

/// Progress of one run.
///
/// A run moves strictly forward through the states. It can fail from any
/// state, which also ends in [`RunState::Terminal`]. Reduction of the
/// captures to responses happens in `analyze`, outside the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    /// Front end configured, program being built.
    BuildingTimeline,
    /// Program handed to the instrument.
    Submitted,
    /// Captures returned by the instrument.
    Captured,
    /// Captures checked and stored with their frequency axes as the sweep
    /// data; nothing is demodulated yet.
    Assembled,
    Terminal,
}

impl RunState {
    fn successor(self) -> Option<RunState> {
        match self {
            RunState::Idle => Some(RunState::BuildingTimeline),
            RunState::BuildingTimeline => Some(RunState::Submitted),
            RunState::Submitted => Some(RunState::Captured),
            RunState::Captured => Some(RunState::Assembled),
            RunState::Assembled => Some(RunState::Terminal),
            RunState::Terminal => None,
        }
    }

    pub fn can_advance_to(self, next: RunState) -> bool {
        self.successor() == Some(next) || (next == RunState::Terminal && self != RunState::Terminal)
    }
}

#[derive(Debug)]
pub struct RunTracker {
    experiment: &'static str,
    state: RunState,
    failed: bool,
}

impl RunTracker {
    pub fn new(experiment: &'static str) -> Self {
        RunTracker {
            experiment,
            state: RunState::Idle,
            failed: false,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        diagnostic!("{}: {:?} -> {:?}", self.experiment, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Abort the run. A run that already ended is left as it is.
    pub fn fail(&mut self) {
        if self.state != RunState::Terminal {
            diagnostic!("{}: {:?} -> Terminal (failed)", self.experiment, self.state);
            self.state = RunState::Terminal;
            self.failed = true;
        }
    }
}
