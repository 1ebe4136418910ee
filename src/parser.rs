//! This module provides the parser for machine definitions, utilizing the `pest` crate.
//! It turns `.tur` text into a `Program` and validates it with the analyzer.

use crate::{
    analyzer::analyze,
    types::{
        Direction, Program, ProgramRule, StateRules, Symbol, TuringMachineError,
        INPUT_BLANK_SYMBOL,
    },
};
use num_bigint::BigInt;
use num_traits::One;
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::HashSet;

/// Derives a `PestParser` for the machine grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct TuringMachineParser;

/// Parses the given input string into a `Program` struct.
///
/// The input is trimmed, parsed with `TuringMachineParser`, turned into a `Program` and
/// validated before being returned.
///
/// # Arguments
///
/// * `input` - A string slice containing the machine definition.
///
/// # Returns
///
/// * `Ok(Program)` if the input is successfully parsed and validated.
/// * `Err(TuringMachineError::ParseError)` if there are any syntax errors.
/// * `Err(TuringMachineError::ValidationError)` or
///   `Err(TuringMachineError::InvalidConfiguration)` if the program fails validation.
pub fn parse(input: &str) -> Result<Program, TuringMachineError> {
    let root = first_pair(TuringMachineParser::parse(Rule::program, input.trim()))?;

    let program = parse_program(root)?;

    analyze(&program)?;

    Ok(program)
}

/// Parses a comma-separated list of symbols such as `1, 0, _, 12`.
///
/// An empty or blank string yields an empty list.
pub fn parse_symbols(input: &str) -> Result<Vec<Symbol>, TuringMachineError> {
    let root = first_pair(TuringMachineParser::parse(Rule::symbol_list, input.trim()))?;

    root.into_inner()
        .filter(|p| p.as_rule() == Rule::symbols)
        .flat_map(|p| p.into_inner())
        .map(parse_symbol)
        .collect()
}

/// Unwraps the root pair of a successful parse.
fn first_pair(
    result: Result<Pairs<'_, Rule>, Error<Rule>>,
) -> Result<Pair<'_, Rule>, TuringMachineError> {
    let mut pairs = result.map_err(|e| TuringMachineError::ParseError(e.into()))?;
    pairs
        .next()
        .ok_or_else(|| TuringMachineError::ValidationError("Empty program".to_string()))
}

/// Parses the top-level structure of a program from a `Pair<Rule::program>`.
///
/// Sections may come in any order but each at most once. `name` and `rules` are required;
/// `head` defaults to 0 and `capacity` to the smallest tape that holds both the initial
/// contents and the head.
fn parse_program(pair: Pair<Rule>) -> Result<Program, TuringMachineError> {
    let mut name: Option<String> = None;
    let mut capacity: Option<BigInt> = None;
    let mut head: Option<BigInt> = None;
    let mut tape: Option<Vec<Symbol>> = None;
    let mut accepting: Option<Vec<String>> = None;
    let mut states: Option<Vec<StateRules>> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(parse_inner_string(p)?.trim().to_string()),
            Rule::capacity => capacity = Some(parse_number(p)?),
            Rule::head => head = Some(parse_number(p)?),
            Rule::tape => tape = Some(parse_tape(p)?),
            Rule::accept => accepting = Some(p.into_inner().map(|s| s.as_str().into()).collect()),
            Rule::rules => states = Some(parse_states(p)?),
            _ => {} // EOI
        }
    }

    let name = check_required_rule(name, vec!["name"])?;
    let states = check_required_rule(states, vec!["rules"])?;
    let tape = tape.unwrap_or_default();
    let head = head.unwrap_or_default();
    let capacity = capacity.unwrap_or_else(|| {
        let needed = BigInt::from(tape.len());
        let past_head = &head + BigInt::one();
        needed.max(past_head)
    });
    let initial_state = states
        .first()
        .map(|state| state.name.clone())
        .unwrap_or_default();

    Ok(Program {
        name,
        capacity,
        head,
        tape,
        initial_state,
        accepting: accepting.unwrap_or_default(),
        states,
    })
}

/// Parses the initial tape contents from a `Pair<Rule::tape>`.
fn parse_tape(pair: Pair<Rule>) -> Result<Vec<Symbol>, TuringMachineError> {
    // Rule: tape > symbols? > [symbol]
    pair.into_inner()
        .flat_map(|p| p.into_inner())
        .map(parse_symbol)
        .collect()
}

/// Parses the rules section into state blocks, keeping declaration order.
///
/// The first block declares the initial state. Declaring the same state twice is an error.
fn parse_states(pair: Pair<Rule>) -> Result<Vec<StateRules>, TuringMachineError> {
    let mut states: Vec<StateRules> = Vec::new();

    for block in pair.into_inner() {
        let span = block.as_span();
        let mut pairs = block.into_inner();
        let name = parse_string(&mut pairs, span)?;

        if states.iter().any(|state| state.name == name) {
            return Err(parse_error(
                &format!("Duplicate transition rule: {name}"),
                span,
            ));
        }

        let rules = pairs
            .filter(|p| p.as_rule() == Rule::transition)
            .map(parse_rule)
            .collect::<Result<Vec<_>, _>>()?;

        states.push(StateRules { name, rules });
    }

    Ok(states)
}

/// Parses a single rule line from a `Pair<Rule::transition>`.
///
/// If `write` is omitted the rule writes back what it read, which only makes sense for a
/// single input symbol.
fn parse_rule(pair: Pair<Rule>) -> Result<ProgramRule, TuringMachineError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();

    let inputs = pairs
        .next()
        .ok_or_else(|| parse_error("Missing input symbols", span))?;
    let read = inputs
        .into_inner()
        .map(parse_symbol)
        .collect::<Result<Vec<_>, _>>()?;

    let next = pairs
        .next()
        .ok_or_else(|| parse_error("Missing direction", span))?;
    let (write, direction) = match next.as_rule() {
        Rule::symbol => {
            let write = parse_symbol(next)?;
            let direction = pairs
                .next()
                .ok_or_else(|| parse_error("Missing direction", span))?;
            (write, parse_direction(direction)?)
        }
        _ => {
            if read.len() != 1 {
                return Err(parse_error(
                    "A rule with several input symbols must state the symbol to write",
                    span,
                ));
            }
            (read[0].clone(), parse_direction(next)?)
        }
    };

    let next_state = parse_string(&mut pairs, span)?;

    Ok(ProgramRule {
        read,
        write,
        direction,
        next_state,
    })
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports '<' or 'L' for Left, '>' or 'R' for Right, and 'S' or 'N' for Stay.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, TuringMachineError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        "S" | "N" => Ok(Direction::Stay),
        _ => Err(parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            span,
        )),
    }
}

/// Parses a symbol: `_` is the empty marker, anything else a decimal integer.
fn parse_symbol(pair: Pair<Rule>) -> Result<Symbol, TuringMachineError> {
    let text = pair.as_str();
    if text.len() == 1 && text.starts_with(INPUT_BLANK_SYMBOL) {
        return Ok(None);
    }
    text.parse::<BigInt>()
        .map(Some)
        .map_err(|e| parse_error(&format!("Invalid symbol {text}: {e}"), pair.as_span()))
}

/// Parses the number inside a `capacity` or `head` section.
fn parse_number(pair: Pair<Rule>) -> Result<BigInt, TuringMachineError> {
    let span = pair.as_span();
    let text = parse_inner_string(pair)?;
    text.parse::<BigInt>()
        .map_err(|e| parse_error(&format!("Invalid number {text}: {e}"), span))
}

/// Creates a `TuringMachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> TuringMachineError {
    TuringMachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Extracts the inner string content from a `Pair`.
fn parse_inner_string(pair: Pair<Rule>) -> Result<String, TuringMachineError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    parse_string(&mut pairs, span)
}

/// Extracts the string content from the current `Pair` in a `Pairs` iterator.
fn parse_string(pairs: &mut Pairs<Rule>, span: Span) -> Result<String, TuringMachineError> {
    pairs
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| parse_error("Unexpected end of section", span))
}

/// Checks if a given rule has already been declared, ensuring uniqueness for top-level sections.
fn check_unique_rule(
    rule: Rule,
    span: Span,
    seen: &mut HashSet<Rule>,
) -> Result<(), TuringMachineError> {
    if !matches!(
        rule,
        Rule::name | Rule::capacity | Rule::head | Rule::tape | Rule::accept | Rule::rules
    ) {
        return Ok(());
    };

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required rule is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, names: Vec<&str>) -> Result<T, TuringMachineError> {
    value.ok_or_else(|| {
        TuringMachineError::ValidationError(format!("Missing {} section", format_rules(names)))
    })
}

/// Formats a list of rule names into a human-readable string for error messages.
fn format_rules(names: Vec<&str>) -> String {
    names
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::symbol;

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
name: Simple Test
tape: 1, 0
rules:
  start:
    1 -> 0, R, halt
  halt:
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.name, "Simple Test");
        assert_eq!(program.tape, vec![symbol(1), symbol(0)]);
        assert_eq!(program.capacity, BigInt::from(2));
        assert_eq!(program.head, BigInt::from(0));
        assert_eq!(program.initial_state, "start");
        assert_eq!(program.state_names().collect::<Vec<_>>(), vec!["start", "halt"]);
        assert_eq!(
            program.rules("start").unwrap()[0],
            ProgramRule {
                read: vec![symbol(1)],
                write: symbol(0),
                direction: Direction::Right,
                next_state: "halt".into(),
            }
        );
        assert!(program.rules("halt").unwrap().is_empty());
    }

    #[test]
    fn test_parse_full_program() {
        let input = r#"
# Sections may come in any order.
name: Busy beaver 2   # two states
head: 4
capacity: 8
accept: halt
rules:
  A:
    _|0 -> 1, R, B
    1 -> 1, L, B
  B:
    _|0 -> 1, L, A

    1 -> 1, >, halt
  halt:
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.name, "Busy beaver 2");
        assert_eq!(program.capacity, BigInt::from(8));
        assert_eq!(program.head, BigInt::from(4));
        assert!(program.tape.is_empty());
        assert_eq!(program.accepting, vec!["halt".to_string()]);
        assert_eq!(program.rule_count(), 4);
        assert_eq!(program.rules("A").unwrap()[0].read, vec![None, symbol(0)]);
        assert_eq!(program.rules("B").unwrap()[1].direction, Direction::Right);
    }

    #[test]
    fn test_parse_default_capacity_covers_head() {
        let input = r#"
name: Head beyond tape
head: 3
tape: 1
rules:
  start:
"#;
        let program = parse(input).unwrap();
        assert_eq!(program.capacity, BigInt::from(4));
    }

    #[test]
    fn test_parse_duplicate_section() {
        let input = r#"
name: First Name
name: Second Name
rules:
  start:
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, TuringMachineError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate \"name:\" declaration"));
    }

    #[test]
    fn test_parse_missing_name() {
        let input = r#"
tape: 1
rules:
  start:
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, TuringMachineError::ValidationError(_)));
        assert_eq!(
            error.to_string(),
            "Program validation error: Missing 'name' section"
        );
    }

    #[test]
    fn test_parse_missing_rules() {
        let input = r#"
name: Missing Rules
tape: 1
"#;
        let error = parse(input).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Program validation error: Missing 'rules' section"
        );
    }

    #[test]
    fn test_parse_duplicate_state_block() {
        let input = r#"
name: Duplicate Transition
tape: 1
rules:
  start:
    1 -> 0, R, start
  start:
    0 -> 1, L, start
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, TuringMachineError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate transition rule: start"));
    }

    #[test]
    fn test_parse_unsupported_direction() {
        let input = r#"
name: Bad Direction
tape: 1
rules:
  start:
    1 -> 0, X, start
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, TuringMachineError::ParseError(_)));
    }

    #[test]
    fn test_parse_omitted_write_symbol() {
        let input = r#"
name: Omitted Write
tape: 7
rules:
  start:
    7 -> S, start
"#;
        let program = parse(input).unwrap();
        let rule = &program.rules("start").unwrap()[0];
        assert_eq!(rule.read, vec![symbol(7)]);
        assert_eq!(rule.write, symbol(7));
        assert_eq!(rule.direction, Direction::Stay);
    }

    #[test]
    fn test_parse_omitted_write_with_several_inputs() {
        let input = r#"
name: Ambiguous Write
tape: 1
rules:
  start:
    1|2 -> R, start
"#;
        let error = parse(input).unwrap_err();
        assert!(matches!(error, TuringMachineError::ParseError(_)));
        assert!(error.to_string().contains("must state the symbol to write"));
    }

    #[test]
    fn test_parse_negative_and_huge_symbols() {
        let input = r#"
name: Big Symbols
tape: -3, 123456789012345678901234567890, _
rules:
  start:
"#;
        let program = parse(input).unwrap();
        assert_eq!(program.tape[0], symbol(-3));
        assert_eq!(
            program.tape[1],
            Some("123456789012345678901234567890".parse::<BigInt>().unwrap())
        );
        assert_eq!(program.tape[2], None);
    }

    #[test]
    fn test_parse_malformed_symbol() {
        let input = r#"
name: Letters
tape: a
rules:
  start:
"#;
        assert!(matches!(
            parse(input),
            Err(TuringMachineError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(
            parse_symbols("1, _, -2").unwrap(),
            vec![symbol(1), None, symbol(-2)]
        );
        assert!(parse_symbols("").unwrap().is_empty());
        assert!(parse_symbols("1, x").is_err());
    }
}
