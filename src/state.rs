//! This module defines machine states and the transitions between them.
//!
//! A `State` owns its outgoing transitions and answers "which transition fires for this
//! symbol?". Transitions refer to their endpoints by `StateId`, never by reference.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{format_symbol, Direction, Symbol};

static NEXT_TRANSITION_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a state within a machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StateId(pub u64);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration identity of a transition. Clones of a transition share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId(u64);

/// A labeled edge from one state to another.
#[derive(Debug, Clone)]
pub struct Transition {
    id: TransitionId,
    from: StateId,
    to: StateId,
    read: HashSet<Symbol>,
    write: Symbol,
    direction: Direction,
}

impl Transition {
    /// Creates a transition that fires on any symbol in `read`.
    pub fn new(
        from: StateId,
        to: StateId,
        read: impl IntoIterator<Item = Symbol>,
        write: Symbol,
        direction: Direction,
    ) -> Self {
        Self {
            id: TransitionId(NEXT_TRANSITION_ID.fetch_add(1, Ordering::Relaxed)),
            from,
            to,
            read: read.into_iter().collect(),
            write,
            direction,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn origin(&self) -> StateId {
        self.from
    }

    pub fn destination(&self) -> StateId {
        self.to
    }

    pub fn read(&self) -> &HashSet<Symbol> {
        &self.read
    }

    pub fn write(&self) -> &Symbol {
        &self.write
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether this transition fires when `symbol` is under the head.
    pub fn accepts(&self, symbol: &Symbol) -> bool {
        self.read.contains(symbol)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut read: Vec<String> = self.read.iter().map(format_symbol).collect();
        read.sort();
        write!(
            f,
            "{} --[{}] / {}, {}--> {}",
            self.from,
            read.join("|"),
            format_symbol(&self.write),
            self.direction,
            self.to
        )
    }
}

/// A machine state with its outgoing transitions.
#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    name: String,
    accepting: bool,
    transitions: Vec<Transition>,
}

impl State {
    /// Creates a state with the given id and name.
    pub fn new(id: StateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            accepting: false,
            transitions: Vec::new(),
        }
    }

    /// Creates a state named `q<id>`.
    pub fn with_id(id: StateId) -> Self {
        Self::new(id, format!("q{id}"))
    }

    /// Marks the state as accepting (builder style).
    pub fn accepting(mut self, accepting: bool) -> Self {
        self.accepting = accepting;
        self
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Registers `transition` on this state.
    ///
    /// Returns `false` without changing anything if the same registration is already present.
    /// Transitions are compared by identity, two separately built transitions with equal
    /// contents are both kept.
    pub fn add_transition(&mut self, transition: Transition) -> bool {
        if self.transitions.iter().any(|t| t.id == transition.id) {
            return false;
        }
        self.transitions.push(transition);
        true
    }

    /// Removes the transition with the given identity.
    pub fn remove_transition(&mut self, id: TransitionId) -> bool {
        let before = self.transitions.len();
        self.transitions.retain(|t| t.id != id);
        self.transitions.len() != before
    }

    /// Removes every outgoing transition leading to `destination`. Returns how many went.
    pub fn remove_transitions_to(&mut self, destination: StateId) -> usize {
        let before = self.transitions.len();
        self.transitions.retain(|t| t.to != destination);
        before - self.transitions.len()
    }

    /// Returns the first registered transition that fires on `symbol`, or `None` to halt.
    pub fn transition_for(&self, symbol: &Symbol) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.accepts(symbol))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}::{})", self.name, self.id)
    }
}
