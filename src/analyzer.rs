//! This module provides functions for analyzing machine programs to detect common errors
//! and inconsistencies before execution. This includes checks for tape geometry, defined
//! states, deterministic rules, and reachable states.

use crate::types::{format_symbol, Program, Symbol, TuringMachineError};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::collections::HashSet;

/// Represents various errors that can be found during the analysis of a program.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// Indicates an invalid head position, outside `[0, capacity)`.
    InvalidHead(BigInt),
    /// Indicates that the initial state is not declared in the rules section.
    InvalidStartState(String),
    /// Indicates that rules reference states that are not declared.
    UndefinedNextStates(Vec<String>),
    /// Indicates that a state reads the same symbol in more than one rule.
    AmbiguousRules(Vec<String>),
    /// Indicates accepting states that are not declared.
    UndefinedAcceptingStates(Vec<String>),
    /// Indicates declared states that cannot be reached from the initial state.
    UnreachableStates(Vec<String>),
    /// Indicates structural problems with the program (no states, duplicate names, etc.).
    StructuralError(String),
    /// Indicates a tape that cannot be built (capacity below 1, contents longer than the tape).
    InvalidTape(String),
}

impl From<AnalysisError> for TuringMachineError {
    /// Converts an `AnalysisError` into a `TuringMachineError`.
    ///
    /// Tape geometry problems become `InvalidConfiguration`; everything else is a
    /// `ValidationError`.
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::InvalidHead(pos) => TuringMachineError::InvalidConfiguration(format!(
                "Invalid head position: {}",
                pos
            )),
            AnalysisError::InvalidTape(msg) => TuringMachineError::InvalidConfiguration(msg),
            AnalysisError::InvalidStartState(state) => {
                TuringMachineError::ValidationError(format!("Invalid start state: {}", state))
            }
            AnalysisError::UndefinedNextStates(transitions) => TuringMachineError::ValidationError(
                format!("Transitions reference undefined states: {:?}", transitions),
            ),
            AnalysisError::AmbiguousRules(rules) => TuringMachineError::ValidationError(format!(
                "Symbols read by more than one rule: {:?}",
                rules
            )),
            AnalysisError::UndefinedAcceptingStates(states) => TuringMachineError::ValidationError(
                format!("Accepting states are not defined: {:?}", states),
            ),
            AnalysisError::UnreachableStates(states) => TuringMachineError::ValidationError(
                format!("Unreachable states detected: {:?}", states),
            ),
            AnalysisError::StructuralError(msg) => TuringMachineError::ValidationError(msg),
        }
    }
}

/// Analyzes a given `Program` for structural and logical errors.
///
/// # Arguments
///
/// * `program` - A reference to the `Program` to be analyzed.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(TuringMachineError)` with the first problem found, in the order the checks run.
pub fn analyze(program: &Program) -> Result<(), TuringMachineError> {
    let checks: [fn(&Program) -> Result<(), AnalysisError>; 8] = [
        check_structure,
        check_tape,
        check_head,
        check_valid_start_state,
        check_undefined_next_states,
        check_ambiguous_rules,
        check_accepting_states,
        check_unreachable_states,
    ];

    checks
        .iter()
        .find_map(|check| check(program).err())
        .map_or(Ok(()), |error| Err(error.into()))
}

/// Checks basic structural requirements of the program.
///
/// # Returns
///
/// * `Ok(())` if at least one state is declared and state names are unique.
/// * `Err(AnalysisError::StructuralError)` otherwise.
fn check_structure(program: &Program) -> Result<(), AnalysisError> {
    if program.states.is_empty() {
        return Err(AnalysisError::StructuralError(
            "No states defined".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for name in program.state_names() {
        if !names.insert(name) {
            return Err(AnalysisError::StructuralError(format!(
                "State '{}' is declared more than once",
                name
            )));
        }
    }

    Ok(())
}

/// Checks that the capacity is positive and the initial contents fit on the tape.
fn check_tape(program: &Program) -> Result<(), AnalysisError> {
    if program.capacity < BigInt::one() {
        return Err(AnalysisError::InvalidTape(format!(
            "Tape capacity must be at least 1, got {}",
            program.capacity
        )));
    }

    if BigInt::from(program.tape.len()) > program.capacity {
        return Err(AnalysisError::InvalidTape(format!(
            "Initial tape has {} symbols but the capacity is {}",
            program.tape.len(),
            program.capacity
        )));
    }

    Ok(())
}

/// Checks that the initial head position lies on the tape.
fn check_head(program: &Program) -> Result<(), AnalysisError> {
    if program.head < BigInt::zero() || program.head >= program.capacity {
        return Err(AnalysisError::InvalidHead(program.head.clone()));
    }

    Ok(())
}

/// Checks whether the initial state is declared in the rules section.
fn check_valid_start_state(program: &Program) -> Result<(), AnalysisError> {
    if program.rules(&program.initial_state).is_none() {
        return Err(AnalysisError::InvalidStartState(
            program.initial_state.clone(),
        ));
    }

    Ok(())
}

/// Checks that every rule's next state is declared.
///
/// # Returns
///
/// * `Ok(())` if all next states are declared.
/// * `Err(AnalysisError::UndefinedNextStates)` listing offending rules as `state[index] -> next`.
fn check_undefined_next_states(program: &Program) -> Result<(), AnalysisError> {
    let defined_states: HashSet<&str> = program.state_names().collect();

    let mut undefined_transitions = Vec::new();
    for state in &program.states {
        for (i, rule) in state.rules.iter().enumerate() {
            if !defined_states.contains(rule.next_state.as_str()) {
                undefined_transitions.push(format!("{}[{}] -> {}", state.name, i, rule.next_state));
            }
        }
    }

    if !undefined_transitions.is_empty() {
        return Err(AnalysisError::UndefinedNextStates(undefined_transitions));
    }

    Ok(())
}

/// Checks that no state reads the same symbol in two rules, which would make the machine
/// depend on rule order.
fn check_ambiguous_rules(program: &Program) -> Result<(), AnalysisError> {
    let mut ambiguous = Vec::new();

    for state in &program.states {
        let mut read: HashSet<&Symbol> = HashSet::new();
        for symbol in state.rules.iter().flat_map(|rule| &rule.read) {
            if !read.insert(symbol) {
                ambiguous.push(format!("{}: {}", state.name, format_symbol(symbol)));
            }
        }
    }

    if !ambiguous.is_empty() {
        return Err(AnalysisError::AmbiguousRules(ambiguous));
    }

    Ok(())
}

/// Checks that every accepting state is declared.
fn check_accepting_states(program: &Program) -> Result<(), AnalysisError> {
    let defined_states: HashSet<&str> = program.state_names().collect();
    let undefined: Vec<String> = program
        .accepting
        .iter()
        .filter(|name| !defined_states.contains(name.as_str()))
        .cloned()
        .collect();

    if !undefined.is_empty() {
        return Err(AnalysisError::UndefinedAcceptingStates(undefined));
    }

    Ok(())
}

/// Checks for unreachable states by traversing the rules from the initial state.
///
/// # Returns
///
/// * `Ok(())` if all declared states are reachable.
/// * `Err(AnalysisError::UnreachableStates)` listing the others, sorted.
fn check_unreachable_states(program: &Program) -> Result<(), AnalysisError> {
    let mut visited = HashSet::new();
    let mut queue = vec![program.initial_state.as_str()];

    while let Some(state) = queue.pop() {
        if !visited.insert(state) {
            continue;
        }

        if let Some(rules) = program.rules(state) {
            for rule in rules {
                if !visited.contains(rule.next_state.as_str()) {
                    queue.push(rule.next_state.as_str());
                }
            }
        }
    }

    let mut unreachable: Vec<String> = program
        .state_names()
        .filter(|name| !visited.contains(name))
        .map(String::from)
        .collect();

    if !unreachable.is_empty() {
        unreachable.sort();
        return Err(AnalysisError::UnreachableStates(unreachable));
    }

    Ok(())
}
