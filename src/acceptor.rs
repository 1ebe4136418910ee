//! Input acceptance on top of a plain machine.
//!
//! An `Acceptor` steps its machine like any other; when the machine halts, the input is
//! accepted if the state it halted in is marked accepting. A machine that loops never
//! accepts.

use serde::{Deserialize, Serialize};

use crate::machine::TuringMachine;
use crate::supervisor::{fingerprint, Supervised};
use crate::types::{Step, TuringMachineError};

/// Whether a halted acceptor accepted its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject,
}

/// A machine whose halting state decides acceptance.
#[derive(Debug, Clone)]
pub struct Acceptor {
    machine: TuringMachine,
    accepted: bool,
}

impl Acceptor {
    pub fn new(machine: TuringMachine) -> Self {
        Self {
            machine,
            accepted: false,
        }
    }

    /// Executes one step; on halt, records whether the current state is accepting.
    pub fn step(&mut self) -> Result<Step, TuringMachineError> {
        let step = self.machine.step()?;
        if step == Step::Halt {
            self.accepted = self
                .machine
                .current_state()
                .is_some_and(|state| state.is_accepting());
        }
        Ok(step)
    }

    /// Clears the halt and forgets the previous acceptance.
    pub fn clear_halt(&mut self) {
        self.machine.clear_halt();
        self.accepted = false;
    }

    /// True only after the machine halted in an accepting state.
    pub fn is_input_accepted(&self) -> bool {
        self.accepted
    }

    /// `None` while the machine has not halted.
    pub fn verdict(&self) -> Option<Verdict> {
        if !self.machine.is_halted() {
            return None;
        }
        Some(if self.accepted {
            Verdict::Accept
        } else {
            Verdict::Reject
        })
    }

    pub fn machine(&self) -> &TuringMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut TuringMachine {
        &mut self.machine
    }

    pub fn into_inner(self) -> TuringMachine {
        self.machine
    }
}

impl From<TuringMachine> for Acceptor {
    fn from(machine: TuringMachine) -> Self {
        Self::new(machine)
    }
}

impl Supervised for Acceptor {
    fn step(&mut self) -> Result<Step, TuringMachineError> {
        Acceptor::step(self)
    }

    fn fingerprint(&self) -> Result<String, TuringMachineError> {
        fingerprint(&self.machine)
    }
}
