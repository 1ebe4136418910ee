//! This crate provides a single-tape Turing machine simulator over arbitrary-precision
//! symbols. The tape is finite, wraps around at both ends and only keeps the cells that were
//! actually visited. A supervisor drives a machine and decides whether it halts or loops by
//! remembering every configuration it has seen.
//!
//! Machines can be built in code or parsed from `.tur` program files.

pub mod acceptor;
pub mod alphabet;
pub mod analyzer;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod state;
pub mod supervisor;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the acceptance overlay.
pub use acceptor::{Acceptor, Verdict};
/// Re-exports the display-symbol translation table.
pub use alphabet::Alphabet;
/// Re-exports the `analyze` function and `AnalysisError` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisError};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `TuringMachine` struct from the machine module.
pub use machine::TuringMachine;
/// Re-exports the parsing entry points from the parser module.
pub use parser::{parse, parse_symbols};
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
pub use state::{State, StateId, Transition, TransitionId};
pub use supervisor::{fingerprint, Supervised, Supervisor, SupervisorResult};
pub use tape::Tape;
/// Re-exports the shared types from the types module.
pub use types::{
    format_symbol, symbol, Direction, Precondition, Program, ProgramRule, StateRules, Step,
    Symbol, TuringMachineError, MAX_PROGRAM_SIZE,
};
