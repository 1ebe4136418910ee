//! This module defines the `TuringMachine` struct, the execution engine that owns a tape and a
//! state graph and executes exactly one transition per step.

use log::{debug, trace};
use std::collections::HashMap;

use crate::state::{State, StateId, Transition, TransitionId};
use crate::tape::Tape;
use crate::types::{
    format_symbol, Direction, Precondition, Program, Step, Symbol, TuringMachineError,
};

/// A single-tape Turing machine.
///
/// The machine holds at most one tape and any number of states, one of which is current.
/// The first state added becomes current unless another one is marked explicitly.
/// Halting is sticky: once `step` has returned `Step::Halt`, further steps are refused until
/// `clear_halt` is called.
#[derive(Debug, Clone, Default)]
pub struct TuringMachine {
    tape: Option<Tape>,
    states: Vec<State>,
    current: Option<StateId>,
    halted: bool,
    step_count: u64,
}

impl TuringMachine {
    /// Creates a machine with no tape and no states.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a machine with the given tape and no states.
    pub fn with_tape(tape: Tape) -> Self {
        Self {
            tape: Some(tape),
            ..Self::default()
        }
    }

    /// Builds a machine from a parsed `Program`.
    ///
    /// States get ids in declaration order starting at 0; the program's initial state becomes
    /// current and the states named in `accepting` are marked as such.
    ///
    /// # Returns
    ///
    /// * `Ok(TuringMachine)` ready to step.
    /// * `Err(TuringMachineError::InvalidConfiguration)` if the tape geometry is invalid.
    /// * `Err(TuringMachineError::ValidationError)` if a rule or the initial state refers to
    ///   a state that is not declared.
    pub fn from_program(program: &Program) -> Result<Self, TuringMachineError> {
        let tape = Tape::new(
            program.capacity.clone(),
            program.head.clone(),
            program.tape.clone(),
        )?;
        let mut machine = Self::with_tape(tape);

        let ids: HashMap<&str, StateId> = program
            .states
            .iter()
            .enumerate()
            .map(|(i, state)| (state.name.as_str(), StateId(i as u64)))
            .collect();
        let lookup = |name: &str| {
            ids.get(name).copied().ok_or_else(|| {
                TuringMachineError::ValidationError(format!("Undefined state: {name}"))
            })
        };

        for state in &program.states {
            let id = lookup(&state.name)?;
            let accepting = program.accepting.iter().any(|name| *name == state.name);
            machine.add_state(State::new(id, state.name.clone()).accepting(accepting));
        }

        for state in &program.states {
            let from = lookup(&state.name)?;
            for rule in &state.rules {
                let to = lookup(&rule.next_state)?;
                machine.connect(
                    from,
                    to,
                    rule.read.iter().cloned(),
                    rule.write.clone(),
                    rule.direction,
                )?;
            }
        }

        machine.set_current_state(lookup(&program.initial_state)?)?;

        Ok(machine)
    }

    /// Returns the machine's tape, if one is attached.
    pub fn tape(&self) -> Option<&Tape> {
        self.tape.as_ref()
    }

    /// Returns the machine's tape mutably, if one is attached.
    pub fn tape_mut(&mut self) -> Option<&mut Tape> {
        self.tape.as_mut()
    }

    /// Replaces the tape, returning the previous one.
    pub fn set_tape(&mut self, tape: Tape) -> Option<Tape> {
        self.tape.replace(tape)
    }

    /// Returns all states in insertion order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.iter().find(|state| state.id() == id)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.iter_mut().find(|state| state.id() == id)
    }

    /// Returns the state the machine is currently in.
    pub fn current_state(&self) -> Option<&State> {
        self.current.and_then(|id| self.state(id))
    }

    /// Adds a state. Returns `false` if a state with the same id is already present.
    ///
    /// The state becomes current if the machine had no current state.
    pub fn add_state(&mut self, state: State) -> bool {
        self.insert_state(state, false)
    }

    /// Adds a state (if its id is new) and makes it the current state.
    pub fn add_state_as_current(&mut self, state: State) -> bool {
        self.insert_state(state, true)
    }

    /// Creates a state with the next free id, named `q<id>`, and adds it.
    pub fn create_state(&mut self) -> StateId {
        let id = self
            .states
            .iter()
            .map(|state| state.id().0 + 1)
            .max()
            .map_or(StateId(0), StateId);
        self.add_state(State::with_id(id));
        id
    }

    /// Makes `id` the current state.
    pub fn set_current_state(&mut self, id: StateId) -> Result<(), TuringMachineError> {
        if self.state(id).is_none() {
            return Err(TuringMachineError::UnknownState(id));
        }
        self.current = Some(id);
        Ok(())
    }

    /// Removes a state and every transition from other states that leads to it.
    ///
    /// If the removed state was current, the first remaining state becomes current.
    pub fn remove_state(&mut self, id: StateId) -> Option<State> {
        let index = self.states.iter().position(|state| state.id() == id)?;
        let removed = self.states.remove(index);

        let dropped: usize = self
            .states
            .iter_mut()
            .map(|state| state.remove_transitions_to(id))
            .sum();
        debug!("removed state {removed}, dropped {dropped} transitions leading to it");

        if self.current == Some(id) {
            self.current = self.states.first().map(State::id);
        }

        Some(removed)
    }

    /// Registers a transition on its origin state.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the transition was added.
    /// * `Ok(false)` if this very transition was already registered.
    /// * `Err(TuringMachineError::UnknownState)` if either endpoint is not in the machine.
    pub fn add_transition(&mut self, transition: Transition) -> Result<bool, TuringMachineError> {
        if self.state(transition.destination()).is_none() {
            return Err(TuringMachineError::UnknownState(transition.destination()));
        }
        let origin = transition.origin();
        let state = self
            .state_mut(origin)
            .ok_or(TuringMachineError::UnknownState(origin))?;

        Ok(state.add_transition(transition))
    }

    /// Builds a transition and registers it on `from` in one call.
    pub fn connect(
        &mut self,
        from: StateId,
        to: StateId,
        read: impl IntoIterator<Item = Symbol>,
        write: Symbol,
        direction: Direction,
    ) -> Result<TransitionId, TuringMachineError> {
        let transition = Transition::new(from, to, read, write, direction);
        let id = transition.id();
        self.add_transition(transition)?;
        Ok(id)
    }

    /// Executes a single step of the machine.
    ///
    /// Reads the symbol under the head, looks up the matching transition on the current state,
    /// writes its output, moves the head and switches to its destination.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Continue)` if a transition fired.
    /// * `Ok(Step::Halt)` if no transition matched; the tape and state are left untouched.
    /// * `Err(TuringMachineError::PreconditionFailed)` if there is no tape, no current state,
    ///   or the machine already halted. Nothing is changed.
    /// * `Err(TuringMachineError::TapeCorruption)` if the tape's tile links are broken.
    pub fn step(&mut self) -> Result<Step, TuringMachineError> {
        if self.halted {
            return Err(TuringMachineError::PreconditionFailed(
                Precondition::AlreadyHalted,
            ));
        }
        let tape = self
            .tape
            .as_mut()
            .ok_or(TuringMachineError::PreconditionFailed(
                Precondition::MissingTape,
            ))?;
        let current = self
            .current
            .ok_or(TuringMachineError::PreconditionFailed(
                Precondition::NoCurrentState,
            ))?;
        let state = self
            .states
            .iter()
            .find(|state| state.id() == current)
            .ok_or(TuringMachineError::UnknownState(current))?;

        let symbol = tape.read();
        let Some(transition) = state.transition_for(symbol) else {
            debug!(
                "halted in {state} reading {} after {} steps",
                format_symbol(symbol),
                self.step_count
            );
            self.halted = true;
            return Ok(Step::Halt);
        };

        let next = transition.destination();
        if !self.states.iter().any(|state| state.id() == next) {
            return Err(TuringMachineError::UnknownState(next));
        }

        let input = format_symbol(symbol);
        let overwritten = symbol.clone();
        tape.write(transition.write().clone());
        let wrapped = match tape.move_head(transition.direction()) {
            Ok(wrapped) => wrapped,
            Err(e) => {
                // A failed move leaves the whole configuration as it was.
                tape.write(overwritten);
                return Err(e);
            }
        };
        trace!(
            "{} {} -> {} write {} move {}{}",
            current,
            input,
            next,
            format_symbol(transition.write()),
            transition.direction(),
            if wrapped { " (wrapped)" } else { "" }
        );

        self.current = Some(next);
        self.step_count += 1;

        Ok(Step::Continue)
    }

    /// Whether the machine has halted and not been cleared since.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Clears the halted flag so the machine may step again.
    pub fn clear_halt(&mut self) {
        self.halted = false;
    }

    /// Returns the number of transitions executed so far.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    fn insert_state(&mut self, state: State, make_current: bool) -> bool {
        let id = state.id();
        let added = self.state(id).is_none();
        if added {
            self.states.push(state);
        }
        if make_current || self.current.is_none() {
            self.current = Some(id);
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::types::symbol;
    use num_bigint::BigInt;

    fn tape_values(machine: &TuringMachine, capacity: i64) -> Vec<Symbol> {
        let tape = machine.tape().unwrap();
        (0..capacity)
            .map(|i| tape.value_at(&BigInt::from(i)).cloned())
            .collect()
    }

    /// Two states: state 1 flips 1s to 0s moving right, turns the first 0 into a 1 and
    /// switches to state 2, which has no transitions.
    fn create_flip_machine() -> TuringMachine {
        let tape = Tape::new(5, 0, vec![symbol(1), symbol(1), symbol(1), symbol(1), symbol(0)])
            .unwrap();
        let mut machine = TuringMachine::with_tape(tape);
        machine.add_state(State::with_id(StateId(1)));
        machine.add_state(State::with_id(StateId(2)));
        machine
            .connect(StateId(1), StateId(1), [symbol(1)], symbol(0), Direction::Right)
            .unwrap();
        machine
            .connect(StateId(1), StateId(2), [symbol(0)], symbol(1), Direction::Right)
            .unwrap();
        machine
    }

    #[test]
    fn test_first_state_becomes_current() {
        let mut machine = TuringMachine::new();
        assert!(machine.current_state().is_none());

        let first = machine.create_state();
        let second = machine.create_state();

        assert_eq!(first, StateId(0));
        assert_eq!(second, StateId(1));
        assert_eq!(machine.current_state().unwrap().id(), first);

        machine.add_state_as_current(State::with_id(StateId(9)));
        assert_eq!(machine.current_state().unwrap().id(), StateId(9));
    }

    #[test]
    fn test_add_state_rejects_duplicate_ids() {
        let mut machine = TuringMachine::new();
        assert!(machine.add_state(State::new(StateId(0), "a")));
        assert!(!machine.add_state(State::new(StateId(0), "b")));
        assert_eq!(machine.states().len(), 1);
        assert_eq!(machine.state(StateId(0)).unwrap().name(), "a");
    }

    #[test]
    fn test_single_step() {
        let mut machine = create_flip_machine();

        assert_eq!(machine.step().unwrap(), Step::Continue);
        assert_eq!(machine.current_state().unwrap().id(), StateId(1));
        assert_eq!(machine.tape().unwrap().head(), &BigInt::from(1));
        assert_eq!(machine.step_count(), 1);
        assert_eq!(tape_values(&machine, 5)[0], symbol(0));
    }

    #[test]
    fn test_run_flip_machine_to_halt() {
        let mut machine = create_flip_machine();

        let mut steps = 0;
        while machine.step().unwrap() == Step::Continue {
            steps += 1;
        }

        assert_eq!(steps, 5);
        assert_eq!(machine.step_count(), 5);
        assert!(machine.is_halted());
        assert_eq!(machine.current_state().unwrap().id(), StateId(2));
        assert_eq!(
            tape_values(&machine, 5),
            vec![symbol(0), symbol(0), symbol(0), symbol(0), symbol(1)]
        );
    }

    #[test]
    fn test_halt_does_not_mutate() {
        let tape = Tape::new(3, 1, vec![symbol(4), symbol(5)]).unwrap();
        let mut machine = TuringMachine::with_tape(tape);
        let q0 = machine.create_state();
        machine
            .connect(q0, q0, [symbol(9)], symbol(0), Direction::Left)
            .unwrap();

        let before = machine.tape().unwrap().canonical_fingerprint().unwrap();
        assert_eq!(machine.step().unwrap(), Step::Halt);

        assert_eq!(machine.tape().unwrap().canonical_fingerprint().unwrap(), before);
        assert_eq!(machine.current_state().unwrap().id(), q0);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_failed_move_leaves_configuration_untouched() {
        let mut machine = TuringMachine::with_tape(Tape::new(3, 1, vec![]).unwrap());
        let q0 = machine.create_state();
        let q1 = machine.create_state();
        machine
            .connect(q0, q1, [None], symbol(8), Direction::Right)
            .unwrap();
        machine.tape_mut().unwrap().detach_current();

        assert!(matches!(
            machine.step(),
            Err(TuringMachineError::TapeCorruption(_))
        ));
        assert_eq!(machine.tape().unwrap().read(), &None);
        assert_eq!(machine.tape().unwrap().head(), &BigInt::from(1));
        assert_eq!(machine.current_state().unwrap().id(), q0);
        assert_eq!(machine.step_count(), 0);
    }

    #[test]
    fn test_halt_is_sticky_until_cleared() {
        let mut machine = TuringMachine::with_tape(Tape::new(2, 0, vec![]).unwrap());
        machine.create_state();

        assert_eq!(machine.step().unwrap(), Step::Halt);
        assert_eq!(
            machine.step(),
            Err(TuringMachineError::PreconditionFailed(
                Precondition::AlreadyHalted
            ))
        );

        machine.clear_halt();
        assert!(!machine.is_halted());
        assert_eq!(machine.step().unwrap(), Step::Halt);
    }

    #[test]
    fn test_step_preconditions() {
        let mut machine = TuringMachine::new();
        machine.create_state();
        assert_eq!(
            machine.step(),
            Err(TuringMachineError::PreconditionFailed(
                Precondition::MissingTape
            ))
        );

        let mut machine = TuringMachine::with_tape(Tape::new(1, 0, vec![]).unwrap());
        assert_eq!(
            machine.step(),
            Err(TuringMachineError::PreconditionFailed(
                Precondition::NoCurrentState
            ))
        );
    }

    #[test]
    fn test_add_transition_requires_known_states() {
        let mut machine = TuringMachine::new();
        let q0 = machine.create_state();

        let result = machine.connect(q0, StateId(5), [None], None, Direction::Stay);
        assert_eq!(result, Err(TuringMachineError::UnknownState(StateId(5))));

        let result = machine.connect(StateId(6), q0, [None], None, Direction::Stay);
        assert_eq!(result, Err(TuringMachineError::UnknownState(StateId(6))));

        let transition = Transition::new(q0, q0, [None], None, Direction::Stay);
        assert_eq!(machine.add_transition(transition.clone()), Ok(true));
        assert_eq!(machine.add_transition(transition), Ok(false));
    }

    #[test]
    fn test_remove_state_cascades() {
        let mut machine = TuringMachine::with_tape(Tape::new(3, 0, vec![]).unwrap());
        let a = machine.create_state();
        let b = machine.create_state();
        let c = machine.create_state();
        machine.connect(a, b, [None], symbol(1), Direction::Right).unwrap();
        machine.connect(a, c, [symbol(1)], None, Direction::Right).unwrap();
        machine.connect(c, b, [None], None, Direction::Left).unwrap();
        machine.connect(b, a, [None], None, Direction::Left).unwrap();

        let removed = machine.remove_state(b).unwrap();
        assert_eq!(removed.id(), b);
        assert!(machine.remove_state(b).is_none());

        for state in machine.states() {
            assert!(state
                .transitions()
                .iter()
                .all(|transition| transition.destination() != b));
        }
        assert_eq!(machine.state(a).unwrap().transitions().len(), 1);
        assert!(machine.state(c).unwrap().transitions().is_empty());
    }

    #[test]
    fn test_remove_current_state_repoints_current() {
        let mut machine = TuringMachine::new();
        let a = machine.create_state();
        let b = machine.create_state();

        machine.remove_state(a);
        assert_eq!(machine.current_state().unwrap().id(), b);

        machine.remove_state(b);
        assert!(machine.current_state().is_none());
    }

    #[test]
    fn test_set_current_state_unknown() {
        let mut machine = TuringMachine::new();
        assert_eq!(
            machine.set_current_state(StateId(3)),
            Err(TuringMachineError::UnknownState(StateId(3)))
        );
    }

    #[test]
    fn test_set_tape_replaces() {
        let mut machine = TuringMachine::with_tape(Tape::new(2, 0, vec![symbol(1)]).unwrap());
        let old = machine.set_tape(Tape::new(4, 3, vec![]).unwrap()).unwrap();

        assert_eq!(old.read(), &symbol(1));
        assert_eq!(machine.tape().unwrap().head(), &BigInt::from(3));
    }

    #[test]
    fn test_from_program() {
        let program = parse(
            r#"
name: Flip ones
capacity: 5
tape: 1, 1, 1, 1, 0
accept: done
rules:
  scan:
    1 -> 0, R, scan
    0 -> 1, R, done
  done:
"#,
        )
        .unwrap();

        let mut machine = TuringMachine::from_program(&program).unwrap();
        assert_eq!(machine.states().len(), 2);
        assert_eq!(machine.current_state().unwrap().name(), "scan");
        assert!(machine.state(StateId(1)).unwrap().is_accepting());

        while machine.step().unwrap() == Step::Continue {}
        assert_eq!(machine.step_count(), 5);
        assert_eq!(machine.current_state().unwrap().name(), "done");
    }
}
