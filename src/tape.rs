//! This module defines the `Tape`, a fixed-capacity ring of tiles that are materialized lazily.
//!
//! Only positions the head has visited (plus both extremities) consume memory. Tiles live in an
//! arena and refer to their neighbours by `TileId`, so the ring carries no reference cycles.
//! Moving past either extremity wraps to the opposite one.

use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::fmt;

use crate::types::{Direction, Symbol, TuringMachineError};

const FILLER_TILE: &str = "[ ]";
const FILLER_TILE_SELECTED: &str = "[> <]";
const FINGERPRINT_DELIMITER: char = ';';
const FINGERPRINT_EMPTY_RUN: char = '_';

/// Index of a tile inside the tape's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileId(usize);

/// One materialized tape cell.
#[derive(Debug, Clone)]
struct Tile {
    position: BigInt,
    value: Symbol,
    left: Option<TileId>,
    right: Option<TileId>,
}

/// A single Turing machine tape with wrap-around at both ends.
#[derive(Debug, Clone)]
pub struct Tape {
    capacity: BigInt,
    head: BigInt,
    tiles: Vec<Tile>,
    first: TileId,
    last: TileId,
    current: TileId,
}

impl Tape {
    /// Creates a tape of `capacity` positions with the head at `head`.
    ///
    /// `values` are placed starting at position 0. The tiles at position 0, at the head and at
    /// the last position are always materialized, empty unless covered by `values`.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if the capacity is smaller than 1, the head lies outside
    /// `[0, capacity)`, or there are more values than positions.
    pub fn new(
        capacity: impl Into<BigInt>,
        head: impl Into<BigInt>,
        values: Vec<Symbol>,
    ) -> Result<Self, TuringMachineError> {
        let capacity = capacity.into();
        let head = head.into();

        if capacity < BigInt::one() {
            return Err(TuringMachineError::InvalidConfiguration(format!(
                "tape capacity must be at least 1, got {capacity}"
            )));
        }
        if head < BigInt::zero() {
            return Err(TuringMachineError::InvalidConfiguration(format!(
                "head position may not be negative, got {head}"
            )));
        }
        if head >= capacity {
            return Err(TuringMachineError::InvalidConfiguration(format!(
                "head position {head} must be smaller than the tape capacity {capacity}"
            )));
        }
        if BigInt::from(values.len()) > capacity {
            return Err(TuringMachineError::InvalidConfiguration(format!(
                "{} initial values do not fit on a tape of capacity {capacity}",
                values.len()
            )));
        }

        let covered = BigInt::from(values.len());
        let mut cells: Vec<(BigInt, Symbol)> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (BigInt::from(i), value))
            .collect();

        // Anchors beyond the initial values: first position, head, last position.
        let last_position = &capacity - BigInt::one();
        for anchor in [BigInt::zero(), head.clone(), last_position] {
            if anchor >= covered && !cells.iter().any(|(position, _)| *position == anchor) {
                cells.push((anchor, None));
            }
        }
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        let count = cells.len();
        let tiles: Vec<Tile> = cells
            .into_iter()
            .enumerate()
            .map(|(i, (position, value))| Tile {
                position,
                value,
                left: Some(TileId((i + count - 1) % count)),
                right: Some(TileId((i + 1) % count)),
            })
            .collect();

        let current = tiles
            .iter()
            .position(|tile| tile.position == head)
            .map(TileId)
            .ok_or_else(|| {
                TuringMachineError::TapeCorruption(format!("no tile materialized at head {head}"))
            })?;

        Ok(Self {
            capacity,
            head,
            tiles,
            first: TileId(0),
            last: TileId(count - 1),
            current,
        })
    }

    /// Returns the number of addressable positions.
    pub fn capacity(&self) -> &BigInt {
        &self.capacity
    }

    /// Returns the current head position.
    pub fn head(&self) -> &BigInt {
        &self.head
    }

    /// Returns the value under the head.
    pub fn read(&self) -> &Symbol {
        &self.tile(self.current).value
    }

    /// Overwrites the value under the head.
    pub fn write(&mut self, value: Symbol) {
        let current = self.current;
        self.tile_mut(current).value = value;
    }

    /// Moves the head according to `direction`. Returns whether the head wrapped around.
    pub fn move_head(&mut self, direction: Direction) -> Result<bool, TuringMachineError> {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Stay => Ok(false),
        }
    }

    /// Moves the head one position to the left, wrapping to the last position from 0.
    ///
    /// If the left neighbour in memory is not the adjacent position, an empty tile is spliced
    /// in at `head - 1`.
    pub fn move_left(&mut self) -> Result<bool, TuringMachineError> {
        if self.head.is_zero() {
            self.head = &self.capacity - BigInt::one();
            self.current = self.last;
            return Ok(true);
        }

        let target = &self.head - BigInt::one();
        let neighbour = self.tile(self.current).left.ok_or_else(|| {
            TuringMachineError::TapeCorruption(format!(
                "cannot move left from {}: no left tile",
                self.head
            ))
        })?;

        let neighbour_position = &self.tile(neighbour).position;
        if *neighbour_position > target {
            return Err(TuringMachineError::TapeCorruption(format!(
                "left tile of {} sits at {neighbour_position}",
                self.head
            )));
        }

        self.current = if *neighbour_position == target {
            neighbour
        } else {
            self.splice(target.clone(), neighbour, self.current)
        };
        self.head = target;

        Ok(false)
    }

    /// Moves the head one position to the right, wrapping to position 0 from the last one.
    ///
    /// If the right neighbour in memory is not the adjacent position, an empty tile is spliced
    /// in at `head + 1`.
    pub fn move_right(&mut self) -> Result<bool, TuringMachineError> {
        if self.head == &self.capacity - BigInt::one() {
            self.head = BigInt::zero();
            self.current = self.first;
            return Ok(true);
        }

        let target = &self.head + BigInt::one();
        let neighbour = self.tile(self.current).right.ok_or_else(|| {
            TuringMachineError::TapeCorruption(format!(
                "cannot move right from {}: no right tile",
                self.head
            ))
        })?;

        let neighbour_position = &self.tile(neighbour).position;
        if *neighbour_position < target {
            return Err(TuringMachineError::TapeCorruption(format!(
                "right tile of {} sits at {neighbour_position}",
                self.head
            )));
        }

        self.current = if *neighbour_position == target {
            neighbour
        } else {
            self.splice(target.clone(), self.current, neighbour)
        };
        self.head = target;

        Ok(false)
    }

    /// Serializes the head position and the contents of every position into a canonical string.
    ///
    /// Format: `<head>;<field>;<field>;...` walking positions 0 to capacity-1. A non-empty
    /// position is its decimal value. A maximal run of empty positions, materialized or not, is
    /// a single `_<n>` field. Two tapes of the same capacity produce the same string iff they
    /// have the same head and read the same symbol at every position. The walk visits each
    /// materialized tile once, so the cost does not depend on capacity.
    pub fn canonical_fingerprint(&self) -> Result<String, TuringMachineError> {
        let mut out = self.head.to_string();
        let mut empty_run = BigInt::zero();
        let mut id = self.first;

        loop {
            let tile = self.tile(id);
            match &tile.value {
                Some(value) => {
                    flush_empty_run(&mut out, &mut empty_run);
                    out.push(FINGERPRINT_DELIMITER);
                    out.push_str(&value.to_string());
                }
                None => empty_run += BigInt::one(),
            }

            let next = tile.right.ok_or_else(|| {
                TuringMachineError::TapeCorruption(format!(
                    "tile at {} has no right neighbour",
                    tile.position
                ))
            })?;
            let next_tile = self.tile(next);
            if next_tile.position <= tile.position {
                break;
            }

            empty_run += &next_tile.position - &tile.position - BigInt::one();
            id = next;
        }
        flush_empty_run(&mut out, &mut empty_run);

        Ok(out)
    }

    /// Renders the tape for humans, formatting symbols with `formatter`.
    ///
    /// The tile under the head is marked `[>x<]`; gaps longer than two positions are elided as
    /// `... n ...` with `n` the number of hidden positions.
    pub fn render_with<F>(&self, formatter: F) -> String
    where
        F: Fn(&Symbol) -> String,
    {
        let mut cells = Vec::new();
        let mut previous: Option<&BigInt> = None;

        for (position, value) in self.tiles() {
            if let Some(previous) = previous {
                let gap = position - previous - BigInt::one();
                let filler = |at: BigInt| {
                    if at == self.head {
                        FILLER_TILE_SELECTED.to_string()
                    } else {
                        FILLER_TILE.to_string()
                    }
                };

                if gap == BigInt::one() {
                    cells.push(filler(previous + BigInt::one()));
                } else if gap == BigInt::from(2) {
                    cells.push(filler(previous + BigInt::one()));
                    cells.push(filler(previous + BigInt::from(2)));
                } else if gap > BigInt::from(2) {
                    cells.push(filler(previous + BigInt::one()));
                    cells.push(format!("... {} ...", &gap - BigInt::from(2)));
                    cells.push(filler(position - BigInt::one()));
                }
            }

            if *position == self.head {
                cells.push(format!("[>{}<]", formatter(value)));
            } else {
                cells.push(format!("[{}]", formatter(value)));
            }
            previous = Some(position);
        }

        format!("{{ Head: {}, Tape: <{}> }}", self.head, cells.join(" "))
    }

    /// Renders the tape with decimal symbols and a blank for empty tiles.
    pub fn render(&self) -> String {
        self.render_with(|value| match value {
            Some(value) => value.to_string(),
            None => " ".to_string(),
        })
    }

    /// Iterates over the materialized tiles in ascending position order.
    pub fn tiles(&self) -> Tiles<'_> {
        Tiles {
            tape: self,
            next: Some(self.first),
        }
    }

    /// Returns the value at `position`; unmaterialized positions read as empty.
    pub fn value_at(&self, position: &BigInt) -> Option<&BigInt> {
        self.tiles()
            .find(|(at, _)| *at == position)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Number of tiles currently held in memory.
    pub fn materialized_len(&self) -> usize {
        self.tiles.len()
    }

    /// Drops the links of the current tile so moves fail.
    #[cfg(test)]
    pub(crate) fn detach_current(&mut self) {
        let current = self.current;
        let tile = self.tile_mut(current);
        tile.left = None;
        tile.right = None;
    }

    fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0]
    }

    /// Inserts an empty tile at `position` between `left` and `right` and returns its id.
    fn splice(&mut self, position: BigInt, left: TileId, right: TileId) -> TileId {
        let id = TileId(self.tiles.len());
        self.tiles.push(Tile {
            position,
            value: None,
            left: Some(left),
            right: Some(right),
        });
        self.tile_mut(left).right = Some(id);
        self.tile_mut(right).left = Some(id);
        id
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Iterator over the materialized tiles of a [`Tape`], see [`Tape::tiles`].
pub struct Tiles<'a> {
    tape: &'a Tape,
    next: Option<TileId>,
}

impl<'a> Iterator for Tiles<'a> {
    type Item = (&'a BigInt, &'a Symbol);

    fn next(&mut self) -> Option<Self::Item> {
        let tiles = &self.tape.tiles;
        let tile = &tiles[self.next?.0];

        // The ring closes from the last tile back to the first; stop there.
        self.next = tile
            .right
            .filter(|right| tiles[right.0].position > tile.position);

        Some((&tile.position, &tile.value))
    }
}

/// Appends a pending run of empty positions as one `_<n>` field and resets it.
fn flush_empty_run(out: &mut String, empty_run: &mut BigInt) {
    if empty_run.is_zero() {
        return;
    }
    out.push(FINGERPRINT_DELIMITER);
    out.push(FINGERPRINT_EMPTY_RUN);
    out.push_str(&empty_run.to_string());
    *empty_run = BigInt::zero();
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::ToPrimitive;
    use crate::types::symbol;

    fn values(tape: &Tape) -> Vec<(i64, Symbol)> {
        tape.tiles()
            .map(|(position, value)| (position.to_i64().unwrap(), value.clone()))
            .collect()
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        assert!(matches!(
            Tape::new(0, 0, vec![]),
            Err(TuringMachineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Tape::new(3, -1, vec![]),
            Err(TuringMachineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Tape::new(3, 3, vec![]),
            Err(TuringMachineError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Tape::new(2, 0, vec![symbol(1), symbol(2), symbol(3)]),
            Err(TuringMachineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_read_at_head_after_construction() {
        let initial = vec![symbol(5), None, symbol(7)];
        for head in 0..6 {
            let tape = Tape::new(6, head, initial.clone()).unwrap();
            let expected = initial.get(head as usize).cloned().flatten();
            assert_eq!(tape.read(), &expected, "head {head}");
        }
    }

    #[test]
    fn test_construction_materializes_anchors_only() {
        let tape = Tape::new(1000, 500, vec![symbol(1), symbol(2)]).unwrap();

        assert_eq!(tape.materialized_len(), 4);
        assert_eq!(
            values(&tape),
            vec![(0, symbol(1)), (1, symbol(2)), (500, None), (999, None)]
        );
    }

    #[test]
    fn test_single_cell_tape_wraps_onto_itself() {
        let mut tape = Tape::new(1, 0, vec![symbol(9)]).unwrap();

        assert!(tape.move_right().unwrap());
        assert_eq!(tape.head(), &BigInt::zero());
        assert!(tape.move_left().unwrap());
        assert_eq!(tape.read(), &symbol(9));
        assert_eq!(tape.materialized_len(), 1);
        assert_eq!(tape.canonical_fingerprint().unwrap(), "0;9");
    }

    #[test]
    fn test_write_then_read() {
        let mut tape = Tape::new(3, 1, vec![]).unwrap();
        assert_eq!(tape.read(), &None);

        tape.write(symbol(4));
        assert_eq!(tape.read(), &symbol(4));

        tape.write(None);
        assert_eq!(tape.read(), &None);
    }

    #[test]
    fn test_move_right_full_circle_wraps_once() {
        let capacity = 7;
        for start in 0..capacity {
            let mut tape = Tape::new(capacity, start, vec![symbol(1), symbol(2)]).unwrap();
            let mut wraps = 0;
            for _ in 0..capacity {
                if tape.move_right().unwrap() {
                    wraps += 1;
                }
            }
            assert_eq!(wraps, 1, "start {start}");
            assert_eq!(tape.head(), &BigInt::from(start));
        }
    }

    #[test]
    fn test_move_left_full_circle_wraps_once() {
        let mut tape = Tape::new(5, 2, vec![]).unwrap();
        let wraps = (0..5).filter(|_| tape.move_left().unwrap()).count();

        assert_eq!(wraps, 1);
        assert_eq!(tape.head(), &BigInt::from(2));
        assert_eq!(tape.materialized_len(), 5);
    }

    #[test]
    fn test_moves_splice_filler_tiles_in_order() {
        let mut tape = Tape::new(10, 5, vec![symbol(1)]).unwrap();

        tape.move_right().unwrap();
        tape.write(symbol(6));
        tape.move_left().unwrap();
        tape.move_left().unwrap();
        tape.write(symbol(4));

        assert_eq!(
            values(&tape),
            vec![
                (0, symbol(1)),
                (4, symbol(4)),
                (5, None),
                (6, symbol(6)),
                (9, None)
            ]
        );
    }

    #[test]
    fn test_move_head_stay_does_nothing() {
        let mut tape = Tape::new(3, 1, vec![]).unwrap();
        assert!(!tape.move_head(Direction::Stay).unwrap());
        assert_eq!(tape.head(), &BigInt::one());
        assert_eq!(tape.materialized_len(), 3);
    }

    #[test]
    fn test_fingerprint_format() {
        let tape = Tape::new(4, 0, vec![None, symbol(1), symbol(2), None]).unwrap();
        assert_eq!(tape.canonical_fingerprint().unwrap(), "0;_1;1;2;_1");

        let tape = Tape::new(6, 3, vec![symbol(-5)]).unwrap();
        assert_eq!(tape.canonical_fingerprint().unwrap(), "3;-5;_5");
    }

    #[test]
    fn test_fingerprint_ignores_materialization() {
        // Same contents, one tape has walked over the gap and materialized it.
        let quiet = Tape::new(6, 0, vec![symbol(1)]).unwrap();
        let mut walked = Tape::new(6, 0, vec![symbol(1)]).unwrap();
        for _ in 0..6 {
            walked.move_right().unwrap();
        }

        assert_ne!(quiet.materialized_len(), walked.materialized_len());
        assert_eq!(
            quiet.canonical_fingerprint().unwrap(),
            walked.canonical_fingerprint().unwrap()
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_configurations() {
        let base = Tape::new(5, 1, vec![symbol(1), symbol(2)]).unwrap();
        let moved = Tape::new(5, 2, vec![symbol(1), symbol(2)]).unwrap();
        let changed = Tape::new(5, 1, vec![symbol(1), symbol(3)]).unwrap();
        let shifted = Tape::new(5, 1, vec![symbol(1), None, symbol(2)]).unwrap();
        let empty_vs_zero = Tape::new(5, 1, vec![symbol(1), symbol(2), symbol(0)]).unwrap();

        let fingerprints = [&base, &moved, &changed, &shifted, &empty_vs_zero]
            .iter()
            .map(|tape| tape.canonical_fingerprint().unwrap())
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(fingerprints.len(), 5);
    }

    #[test]
    fn test_fingerprint_of_huge_sparse_tape_stays_small() {
        let capacity = BigInt::from(10).pow(30);
        let tape = Tape::new(capacity.clone(), 0, vec![symbol(1)]).unwrap();

        assert_eq!(tape.materialized_len(), 2);
        assert_eq!(
            tape.canonical_fingerprint().unwrap(),
            format!("0;1;_{}", capacity - BigInt::one())
        );
    }

    #[test]
    fn test_fingerprint_merges_empty_tiles_with_gaps() {
        let mut tape = Tape::new(8, 0, vec![symbol(1), None, None, symbol(2)]).unwrap();
        assert_eq!(tape.canonical_fingerprint().unwrap(), "0;1;_2;2;_4");

        // Materializing the gap as empty tiles leaves the fingerprint unchanged.
        for _ in 0..4 {
            tape.move_left().unwrap();
        }
        assert_eq!(tape.materialized_len(), 8);
        assert_eq!(tape.canonical_fingerprint().unwrap(), "4;1;_2;2;_4");

        tape.write(symbol(0));
        assert_eq!(tape.canonical_fingerprint().unwrap(), "4;1;_2;2;0;_3");
    }

    #[test]
    fn test_huge_tape_wraps_with_exact_positions() {
        let capacity = BigInt::from(u64::MAX) * BigInt::from(4);
        let mut tape = Tape::new(capacity.clone(), 0, vec![]).unwrap();

        assert!(tape.move_left().unwrap());
        assert_eq!(tape.head(), &(&capacity - BigInt::one()));
        tape.write(symbol(3));
        assert!(!tape.move_left().unwrap());
        assert_eq!(tape.head(), &(&capacity - BigInt::from(2)));
        assert!(!tape.move_right().unwrap());
        assert_eq!(tape.read(), &symbol(3));
    }

    #[test]
    fn test_value_at() {
        let tape = Tape::new(8, 0, vec![symbol(1), None, symbol(3)]).unwrap();

        assert_eq!(tape.value_at(&BigInt::from(0)), Some(&BigInt::from(1)));
        assert_eq!(tape.value_at(&BigInt::from(1)), None);
        assert_eq!(tape.value_at(&BigInt::from(2)), Some(&BigInt::from(3)));
        assert_eq!(tape.value_at(&BigInt::from(5)), None);
    }

    #[test]
    fn test_render() {
        let tape = Tape::new(10, 4, vec![symbol(1), symbol(2)]).unwrap();
        assert_eq!(
            tape.render(),
            "{ Head: 4, Tape: <[1] [2] [ ] [ ] [> <] [ ] ... 2 ... [ ] [ ]> }"
        );

        let tape = Tape::new(3, 1, vec![symbol(7)]).unwrap();
        assert_eq!(tape.to_string(), "{ Head: 1, Tape: <[7] [> <] [ ]> }");
    }

    #[test]
    fn test_render_with_custom_formatter() {
        let tape = Tape::new(2, 0, vec![symbol(0), symbol(1)]).unwrap();
        let rendered = tape.render_with(|value| match value {
            Some(v) if v.is_zero() => "a".to_string(),
            Some(_) => "b".to_string(),
            None => "_".to_string(),
        });
        assert_eq!(rendered, "{ Head: 0, Tape: <[>a<] [b]> }");
    }
}
