use crate::types::{format_symbol, Program, TuringMachineError};

use log::warn;
use std::sync::RwLock;

// Default embedded programs
const PROGRAM_TEXTS: [&str; 4] = [
    include_str!("../demos/flip-ones.tur"),
    include_str!("../demos/ring-walker.tur"),
    include_str!("../demos/busy-beaver-2.tur"),
    include_str!("../demos/even-ones.tur"),
];

lazy_static::lazy_static! {
    pub static ref PROGRAMS: RwLock<Vec<Program>> = RwLock::new(Vec::new());
}

pub struct ProgramManager;

impl ProgramManager {
    /// Parses the embedded demo programs into the shared catalogue.
    pub fn load() -> Result<(), TuringMachineError> {
        let mut programs = Vec::new();

        for (index, program_text) in PROGRAM_TEXTS.iter().enumerate() {
            match crate::parser::parse(program_text) {
                Ok(program) => programs.push(program),
                Err(e) => warn!("Failed to parse demo program {index}: {e}"),
            }
        }

        let mut write_guard = PROGRAMS.write().map_err(|_| {
            TuringMachineError::FileError("Failed to acquire write lock".to_string())
        })?;
        *write_guard = programs;

        Ok(())
    }

    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        Self::ensure_loaded();

        PROGRAMS.read().map(|programs| programs.len()).unwrap_or(0)
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<Program, TuringMachineError> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map_err(|_| TuringMachineError::FileError("Failed to acquire read lock".to_string()))?
            .get(index)
            .cloned()
            .ok_or_else(|| {
                TuringMachineError::ValidationError(format!("Program index {} out of range", index))
            })
    }

    /// Get a program by its name, ignoring case
    pub fn get_program_by_name(name: &str) -> Result<Program, TuringMachineError> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map_err(|_| TuringMachineError::FileError("Failed to acquire read lock".to_string()))?
            .iter()
            .find(|program| program.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| {
                TuringMachineError::ValidationError(format!("Program '{}' not found", name))
            })
    }

    /// List all program names
    pub fn list_program_names() -> Vec<String> {
        Self::ensure_loaded();

        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .map(|program| program.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get information about a program by its index
    pub fn get_program_info(index: usize) -> Result<ProgramInfo, TuringMachineError> {
        let program = Self::get_program_by_index(index)?;

        Ok(ProgramInfo {
            index,
            name: program.name.clone(),
            initial_state: program.initial_state.clone(),
            initial_tape: program
                .tape
                .iter()
                .map(format_symbol)
                .collect::<Vec<_>>()
                .join(", "),
            capacity: program.capacity.to_string(),
            state_count: program.states.len(),
            transition_count: program.rule_count(),
            accepting: !program.accepting.is_empty(),
        })
    }

    /// Search for programs by name
    pub fn search_programs(query: &str) -> Vec<usize> {
        Self::ensure_loaded();

        let query = query.to_lowercase();
        PROGRAMS
            .read()
            .map(|programs| {
                programs
                    .iter()
                    .enumerate()
                    .filter(|(_, program)| program.name.to_lowercase().contains(&query))
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the original text of a program by its index
    pub fn get_program_text_by_index(index: usize) -> Result<&'static str, TuringMachineError> {
        PROGRAM_TEXTS.get(index).copied().ok_or_else(|| {
            TuringMachineError::ValidationError(format!(
                "Program text index {} out of range",
                index
            ))
        })
    }

    fn ensure_loaded() {
        let empty = PROGRAMS.read().map(|programs| programs.is_empty()).unwrap_or(true);
        if empty {
            if let Err(e) = Self::load() {
                warn!("Failed to load demo programs: {e}");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub initial_state: String,
    pub initial_tape: String,
    pub capacity: String,
    pub state_count: usize,
    pub transition_count: usize,
    /// Whether the program declares accepting states.
    pub accepting: bool,
}
