//! Square grid coordinate system.
//!
//! This module provides the coordinate types shared by boards, fleets and the
//! scripted opponent:
//! - `Coord`: a validated cell on the 10×10 grid
//! - `Orientation`: the axis a vessel runs along
//! - `Direction`: the four orthogonal steps used when hunting a vessel
//!
//! Rows grow downward and columns grow to the right, both starting at zero.

use crate::game::MatchError;
use serde::{Deserialize, Serialize};

/// Width and height of every board
pub const BOARD_SIZE: u8 = 10;

/// Axis a vessel runs along from its anchor cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Anchor is the leftmost cell, the vessel extends to the right
    Horizontal,
    /// Anchor is the topmost cell, the vessel extends downward
    Vertical,
}

impl Orientation {
    /// Both orientations, horizontal first
    pub const ALL: [Orientation; 2] = [Orientation::Horizontal, Orientation::Vertical];

    /// Unit step (row, col) along this axis
    pub const fn step(&self) -> (i8, i8) {
        match self {
            Orientation::Horizontal => (0, 1),
            Orientation::Vertical => (1, 0),
        }
    }
}

/// Orthogonal direction on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions in the order the opponent probes them
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row/column delta for one step in this direction
    pub const fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// A cell on the board.
///
/// Construct through [`Coord::new`] to get bounds checking; the fields stay
/// public so views and snapshots serialize as plain `{row, col}` objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    /// Create a coordinate, rejecting anything outside the grid
    pub fn new(row: u8, col: u8) -> Result<Self, MatchError> {
        if Self::in_bounds(i16::from(row), i16::from(col)) {
            Ok(Self { row, col })
        } else {
            Err(MatchError::InvalidCoordinate { row, col })
        }
    }

    /// Bounds check on signed values, used before narrowing offsets
    pub fn in_bounds(row: i16, col: i16) -> bool {
        let size = i16::from(BOARD_SIZE);
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    /// The cell `steps` away along the given delta, if it is still on the grid
    pub fn offset(&self, delta: (i8, i8), steps: i16) -> Option<Coord> {
        let row = i16::from(self.row) + i16::from(delta.0) * steps;
        let col = i16::from(self.col) + i16::from(delta.1) * steps;
        if Self::in_bounds(row, col) {
            Some(Coord {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Neighbor one step in a direction
    pub fn step(&self, direction: Direction) -> Option<Coord> {
        self.offset(direction.delta(), 1)
    }

    /// Up/down/left/right neighbors that lie on the grid
    pub fn orthogonal_neighbors(&self) -> impl Iterator<Item = Coord> + '_ {
        Direction::ALL.into_iter().filter_map(move |d| self.step(d))
    }

    /// This cell plus all eight surrounding cells that lie on the grid
    pub fn surrounding(&self) -> impl Iterator<Item = Coord> {
        let origin = *self;
        (-1i8..=1)
            .flat_map(|dr| (-1i8..=1).map(move |dc| (dr, dc)))
            .filter_map(move |delta| origin.offset(delta, 1))
    }

    /// Whether the cell lies on the checkerboard parity (row + col even)
    pub fn is_checkerboard(&self) -> bool {
        (self.row + self.col) % 2 == 0
    }

    /// Every cell of the grid in row-major order
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
