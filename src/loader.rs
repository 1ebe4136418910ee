//! Reading `.tur` program text from disk or from memory.

use crate::parser::parse;
use crate::types::{Program, TuringMachineError, MAX_PROGRAM_SIZE};
use std::fs;
use std::path::{Path, PathBuf};

const PROGRAM_EXTENSION: &str = "tur";

/// Entry points that turn program text into a validated `Program`.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Reads and parses the program stored at `path`.
    ///
    /// I/O failures and oversized files surface as `FileError`; bad program text as the
    /// parser's or analyzer's error.
    pub fn load_program(path: &Path) -> Result<Program, TuringMachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Self::load_program_from_string(&content)
    }

    /// Parses program text that is already in memory, such as piped standard input.
    pub fn load_program_from_string(content: &str) -> Result<Program, TuringMachineError> {
        if content.len() > MAX_PROGRAM_SIZE {
            return Err(TuringMachineError::FileError(format!(
                "Program is {} bytes, the limit is {} bytes",
                content.len(),
                MAX_PROGRAM_SIZE
            )));
        }

        parse(content)
    }

    /// Loads every `.tur` file directly inside `directory`, ordered by path.
    ///
    /// Each file yields its own result, so one broken program does not hide the others.
    /// Subdirectories and files with other extensions are skipped. A directory that cannot
    /// be listed produces a single `FileError`.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), TuringMachineError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TuringMachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) if is_program_file(&entry.path()) => paths.push(entry.path()),
                Ok(_) => {}
                Err(e) => results.push(Err(TuringMachineError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        results.extend(paths.into_iter().map(|path| {
            Self::load_program(&path)
                .map(|program| (path.clone(), program))
                .map_err(|e| {
                    TuringMachineError::FileError(format!(
                        "Failed to load program from {}: {}",
                        path.display(),
                        e
                    ))
                })
        }));
        results
    }
}

fn is_program_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == PROGRAM_EXTENSION)
}
