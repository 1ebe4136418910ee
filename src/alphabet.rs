//! Translation between display symbols and tape values.
//!
//! Programs work on integers; humans like letters. An `Alphabet` pairs each display string
//! with exactly one integer and vice versa.

use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::collections::{BTreeMap, HashMap};

use crate::types::{Symbol, TuringMachineError, INPUT_BLANK_SYMBOL};

/// A one-to-one mapping between tape values and display strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alphabet {
    displays: BTreeMap<BigInt, String>,
    values: HashMap<String, BigInt>,
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an alphabet from the characters of `chars`, numbered from 0 in order.
    /// Repeated characters keep their first id.
    pub fn from_chars(chars: &str) -> Self {
        Self::from_symbols(chars.chars().map(String::from))
    }

    /// Builds an alphabet from display strings, numbered from 0 in order.
    pub fn from_symbols<I, S>(displays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut alphabet = Self::new();
        alphabet.autofill(displays);
        alphabet
    }

    /// Assigns ids to each display not yet present, counting up from 0 and skipping ids
    /// that are already taken.
    pub fn autofill<I, S>(&mut self, displays: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counter = BigInt::zero();
        for display in displays {
            let display = display.into();
            if self.values.contains_key(&display) {
                continue;
            }
            while self.displays.contains_key(&counter) {
                counter += BigInt::one();
            }
            self.insert(counter.clone(), display);
            counter += BigInt::one();
        }
    }

    /// Pairs `value` with `display`. Returns `false` if either side is already mapped.
    pub fn insert(&mut self, value: BigInt, display: impl Into<String>) -> bool {
        let display = display.into();
        if self.displays.contains_key(&value) || self.values.contains_key(&display) {
            return false;
        }
        self.values.insert(display.clone(), value.clone());
        self.displays.insert(value, display);
        true
    }

    pub fn symbol_for(&self, display: &str) -> Option<&BigInt> {
        self.values.get(display)
    }

    pub fn display_for(&self, value: &BigInt) -> Option<&str> {
        self.displays.get(value).map(String::as_str)
    }

    /// Turns a string of display characters into tape values.
    ///
    /// `_` is the empty marker; any other character must be in the alphabet.
    pub fn encode(&self, input: &str) -> Result<Vec<Symbol>, TuringMachineError> {
        input
            .chars()
            .map(|c| {
                if c == INPUT_BLANK_SYMBOL {
                    return Ok(None);
                }
                self.symbol_for(&c.to_string())
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| TuringMachineError::UnknownSymbol(c.to_string()))
            })
            .collect()
    }

    /// Formats a tape value with its display string, falling back to the number.
    pub fn render_symbol(&self, symbol: &Symbol) -> String {
        match symbol {
            Some(value) => self
                .display_for(value)
                .map_or_else(|| value.to_string(), str::to_string),
            None => " ".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }
}
