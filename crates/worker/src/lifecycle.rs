//! Worker instance lifecycle.
//!
//! `installing → installed → activating → activated`, with `redundant` as the
//! terminal state of failed installs and superseded instances.

use std::fmt;

use serde::Serialize;
use vitrine_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Only an activated worker answers fetches and messages.
    pub fn can_intercept(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }

    /// Check that `self → next` is a legal move.
    pub fn transition(self, next: WorkerState) -> Result<WorkerState, Error> {
        use WorkerState::*;

        let legal = matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        );

        if legal {
            Ok(next)
        } else {
            Err(Error::InvalidState { expected: expected_before(next).into(), actual: self.to_string() })
        }
    }
}

fn expected_before(next: WorkerState) -> &'static str {
    match next {
        WorkerState::Installing => "nothing (initial state)",
        WorkerState::Installed => "installing",
        WorkerState::Activating => "installed",
        WorkerState::Activated => "activating",
        WorkerState::Redundant => "a live worker",
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// What an activation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Superseded generations that were deleted.
    pub deleted: Vec<String>,
    /// Whether already-open pages were taken over immediately.
    pub claimed: bool,
}
