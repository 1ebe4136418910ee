//! Loop detection over a stepping machine.
//!
//! A `Supervisor` drives a machine one step at a time and records the canonical fingerprint
//! of every configuration it has seen. A machine that halts is reported as `Halts`; a machine
//! that revisits a configuration is reported as `Loops`. Because the tape is finite and
//! the state set is fixed, one of the two always happens eventually.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::machine::TuringMachine;
use crate::types::{Precondition, Step, TuringMachineError};

/// The verdict of a supervisor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisorResult {
    /// The machine stepped and its new configuration had not been seen before.
    Running,
    /// The machine has no transition for the symbol under its head.
    Halts,
    /// The machine reached a configuration it had already been in.
    Loops,
}

impl fmt::Display for SupervisorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SupervisorResult::Running => "RUNNING",
            SupervisorResult::Halts => "HALTS",
            SupervisorResult::Loops => "LOOPS",
        };
        f.write_str(text)
    }
}

/// Something a `Supervisor` can drive: it steps, and it can describe its whole
/// configuration as a string.
pub trait Supervised {
    /// Executes one step.
    fn step(&mut self) -> Result<Step, TuringMachineError>;

    /// Returns a string that is equal for two configurations exactly when they would
    /// behave identically from now on.
    fn fingerprint(&self) -> Result<String, TuringMachineError>;
}

/// Canonical fingerprint of a machine: `"<state-id>;<tape fingerprint>"`.
pub fn fingerprint(machine: &TuringMachine) -> Result<String, TuringMachineError> {
    let state = machine
        .current_state()
        .ok_or(TuringMachineError::PreconditionFailed(
            Precondition::NoCurrentState,
        ))?;
    let tape = machine
        .tape()
        .ok_or(TuringMachineError::PreconditionFailed(
            Precondition::MissingTape,
        ))?;

    Ok(format!("{};{}", state.id(), tape.canonical_fingerprint()?))
}

impl Supervised for TuringMachine {
    fn step(&mut self) -> Result<Step, TuringMachineError> {
        TuringMachine::step(self)
    }

    fn fingerprint(&self) -> Result<String, TuringMachineError> {
        fingerprint(self)
    }
}

/// Drives a machine until it halts or repeats a configuration.
#[derive(Debug)]
pub struct Supervisor<M: Supervised = TuringMachine> {
    machine: M,
    seen: HashSet<String>,
    outcome: Option<SupervisorResult>,
    iterations: u64,
}

impl<M: Supervised> Supervisor<M> {
    /// Wraps `machine` and records its starting configuration as seen.
    pub fn new(machine: M) -> Result<Self, TuringMachineError> {
        let mut seen = HashSet::new();
        seen.insert(machine.fingerprint()?);

        Ok(Self {
            machine,
            seen,
            outcome: None,
            iterations: 0,
        })
    }

    /// Advances the machine by one step and classifies the result.
    ///
    /// Once a run has finished, the stored outcome is returned without stepping again.
    pub fn run_single_iteration(&mut self) -> Result<SupervisorResult, TuringMachineError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }

        let result = match self.machine.step()? {
            Step::Halt => SupervisorResult::Halts,
            Step::Continue => {
                if self.seen.insert(self.machine.fingerprint()?) {
                    SupervisorResult::Running
                } else {
                    SupervisorResult::Loops
                }
            }
        };
        self.iterations += 1;

        if result != SupervisorResult::Running {
            debug!(
                "supervisor finished after {} iterations: {} ({} configurations seen)",
                self.iterations,
                result,
                self.seen.len()
            );
            self.outcome = Some(result);
        }

        Ok(result)
    }

    /// Iterates until the machine halts or loops.
    pub fn run(&mut self) -> Result<SupervisorResult, TuringMachineError> {
        loop {
            let result = self.run_single_iteration()?;
            if result != SupervisorResult::Running {
                return Ok(result);
            }
        }
    }

    /// Iterates at most `max_iterations` times; returns `Running` if no verdict was reached.
    pub fn run_for(&mut self, max_iterations: u64) -> Result<SupervisorResult, TuringMachineError> {
        if let Some(outcome) = self.outcome {
            return Ok(outcome);
        }
        for _ in 0..max_iterations {
            let result = self.run_single_iteration()?;
            if result != SupervisorResult::Running {
                return Ok(result);
            }
        }
        Ok(SupervisorResult::Running)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// The final verdict, once the run has finished.
    pub fn outcome(&self) -> Option<SupervisorResult> {
        self.outcome
    }

    /// Number of steps driven so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Number of distinct configurations recorded, including the starting one.
    pub fn seen_configurations(&self) -> usize {
        self.seen.len()
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn into_inner(self) -> M {
        self.machine
    }
}
