//! This module defines the core data structures and types used throughout the simulator,
//! including symbols, head movements, program definitions, step outcomes, and error types.

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::state::StateId;
use crate::Rule;

/// A value stored on a tape tile. `None` is the empty marker ("no value written").
pub type Symbol = Option<BigInt>;

/// A special input symbol used in program definitions to represent the empty marker.
pub const INPUT_BLANK_SYMBOL: char = '_';
/// The maximum allowed size for a program definition in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB

/// Builds a non-empty symbol from anything convertible into a `BigInt`.
pub fn symbol(value: impl Into<BigInt>) -> Symbol {
    Some(value.into())
}

/// Formats a symbol the way program files spell it: decimal digits, or `_` for empty.
pub fn format_symbol(symbol: &Symbol) -> String {
    match symbol {
        Some(value) => value.to_string(),
        None => INPUT_BLANK_SYMBOL.to_string(),
    }
}

/// Represents the possible directions the head can move after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'S',
        };
        write!(f, "{c}")
    }
}

/// A machine definition as read from a `.tur` file.
///
/// States are kept in declaration order; the first one is the initial state and state ids
/// are assigned from that order when the program is turned into a machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    /// The name of the program.
    pub name: String,
    /// Number of addressable tape positions.
    pub capacity: BigInt,
    /// Initial head position.
    pub head: BigInt,
    /// Initial tape contents, placed from position 0.
    pub tape: Vec<Symbol>,
    /// The state the machine starts in.
    pub initial_state: String,
    /// Names of the states that accept the input when the machine halts in them.
    pub accepting: Vec<String>,
    /// Transition rules grouped by origin state.
    pub states: Vec<StateRules>,
}

impl Program {
    /// Returns the rules declared for `name`, if the state exists.
    pub fn rules(&self, name: &str) -> Option<&[ProgramRule]> {
        self.states
            .iter()
            .find(|state| state.name == name)
            .map(|state| state.rules.as_slice())
    }

    /// Returns the declared state names in declaration order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|state| state.name.as_str())
    }

    /// Total number of rules across all states.
    pub fn rule_count(&self) -> usize {
        self.states.iter().map(|state| state.rules.len()).sum()
    }

    /// Replaces the initial tape contents, growing the capacity if the new contents need it.
    pub fn with_tape(mut self, tape: Vec<Symbol>) -> Self {
        let needed = BigInt::from(tape.len());
        if needed > self.capacity {
            self.capacity = needed;
        }
        self.tape = tape;
        self
    }
}

/// The rules declared for one state in a program file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateRules {
    pub name: String,
    pub rules: Vec<ProgramRule>,
}

/// A single transition rule as written in a program file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRule {
    /// Symbols that trigger this rule.
    pub read: Vec<Symbol>,
    /// Symbol written before moving.
    pub write: Symbol,
    /// Head movement after the write.
    pub direction: Direction,
    /// The state the machine transitions to.
    pub next_state: String,
}

/// Represents the outcome of a single engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A transition fired and the machine can keep going.
    Continue,
    /// No transition matched the symbol under the head; the machine has halted.
    Halt,
}

/// Why a step request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("the machine has no tape")]
    MissingTape,
    #[error("the machine is not in any state")]
    NoCurrentState,
    #[error("the machine has already halted; clear the halt before stepping again")]
    AlreadyHalted,
}

/// Represents the errors that can occur while building, loading, or running a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuringMachineError {
    /// Malformed tape or program geometry (capacity, head, initial contents).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A step was requested while the machine could not take one.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),
    /// An internal tile adjacency invariant was violated.
    #[error("Tape corruption: {0}")]
    TapeCorruption(String),
    /// A transition or selection references a state the machine does not contain.
    #[error("Unknown state: {0}")]
    UnknownState(StateId),
    /// A display symbol has no mapping in the alphabet.
    #[error("Unknown symbol: {0:?}")]
    UnknownSymbol(String),
    /// Indicates an error during the parsing of a program definition.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an error during the validation of a program's structure or logic.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to reading program files.
    #[error("File error: {0}")]
    FileError(String),
}
