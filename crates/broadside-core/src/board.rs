//! Board representation: one seat's grid, fleet and received shots.
//!
//! Placement rules enforced here:
//! - every vessel lies entirely on the grid
//! - no two vessels share a cell
//! - no two vessels touch, diagonals included (one-cell buffer)

use crate::game::MatchError;
use crate::grid::{Coord, Orientation, BOARD_SIZE};
use crate::vessel::{Vessel, VesselId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Random draws per vessel before giving up on it
const DRAWS_PER_VESSEL: u32 = 100;

/// Whole-fleet attempts before random placement reports exhaustion
const RANDOM_FLEET_ROUNDS: u32 = 50;

/// Why a single vessel could not be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlacementError {
    #[error("vessel {0} is not part of the fleet")]
    UnknownVessel(VesselId),

    #[error("vessel does not fit on the board")]
    OutOfBounds,

    #[error("vessel overlaps vessel {0}")]
    Overlap(VesselId),

    #[error("vessel touches vessel {0}")]
    TooClose(VesselId),
}

/// A shot this board has received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedShot {
    pub row: u8,
    pub col: u8,
    pub hit: bool,
}

impl ReceivedShot {
    pub fn coord(&self) -> Coord {
        Coord {
            row: self.row,
            col: self.col,
        }
    }
}

/// Result of resolving one shot against the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotResolution {
    pub hit: bool,
    /// Set when this shot completed a vessel
    pub sunk: Option<VesselId>,
    /// The cell had already been shot; nothing was recorded
    pub already_shot: bool,
}

/// One seat's 10×10 board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    vessels: Vec<Vessel>,
    shots: Vec<ReceivedShot>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty board with the standard fleet unplaced
    pub fn new() -> Self {
        Self {
            vessels: Vessel::standard_fleet(),
            shots: Vec::new(),
        }
    }

    pub const fn size(&self) -> u8 {
        BOARD_SIZE
    }

    /// The fleet in fleet order
    pub fn vessels(&self) -> &[Vessel] {
        &self.vessels
    }

    /// Shots received, oldest first
    pub fn shots(&self) -> &[ReceivedShot] {
        &self.shots
    }

    pub fn vessel(&self, id: VesselId) -> Option<&Vessel> {
        self.vessels.iter().find(|v| v.id == id)
    }

    /// The placed vessel covering `coord`, if any
    pub fn vessel_at(&self, coord: Coord) -> Option<&Vessel> {
        self.vessels.iter().find(|v| v.occupies(coord))
    }

    /// Check whether a vessel of `length` could go at `anchor`, ignoring `exclude`
    pub fn check_placement(
        &self,
        anchor: Coord,
        length: u8,
        orientation: Orientation,
        exclude: Option<VesselId>,
    ) -> Result<(), PlacementError> {
        let cells = Vessel::footprint(anchor, length, orientation)
            .ok_or(PlacementError::OutOfBounds)?;

        let others: Vec<&Vessel> = self
            .vessels
            .iter()
            .filter(|v| v.is_placed() && Some(v.id) != exclude)
            .collect();

        for cell in &cells {
            if let Some(other) = others.iter().find(|v| v.occupies(*cell)) {
                return Err(PlacementError::Overlap(other.id));
            }
        }

        for cell in &cells {
            for near in cell.surrounding() {
                if let Some(other) = others.iter().find(|v| v.occupies(near)) {
                    return Err(PlacementError::TooClose(other.id));
                }
            }
        }

        Ok(())
    }

    /// Place a vessel. On failure nothing changes.
    pub fn place_vessel(
        &mut self,
        id: VesselId,
        anchor: Coord,
        orientation: Orientation,
    ) -> Result<(), PlacementError> {
        let length = self
            .vessel(id)
            .map(|v| v.length)
            .ok_or(PlacementError::UnknownVessel(id))?;

        self.check_placement(anchor, length, orientation, Some(id))?;

        if let Some(vessel) = self.vessels.iter_mut().find(|v| v.id == id) {
            vessel.place(anchor, orientation);
        }
        Ok(())
    }

    /// Single pass of random placement: each vessel in fleet order gets up to
    /// 100 in-bounds draws. Returns whether every vessel found a spot.
    fn try_random_fleet<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        for vessel in &mut self.vessels {
            vessel.clear();
        }
        self.shots.clear();

        let ids: Vec<(VesselId, u8)> = self.vessels.iter().map(|v| (v.id, v.length)).collect();
        let mut all_placed = true;

        for (id, length) in ids {
            let mut placed = false;
            for _ in 0..DRAWS_PER_VESSEL {
                let orientation = Orientation::ALL[rng.gen_range(0..2)];
                let (max_row, max_col) = match orientation {
                    Orientation::Horizontal => (BOARD_SIZE, BOARD_SIZE - length + 1),
                    Orientation::Vertical => (BOARD_SIZE - length + 1, BOARD_SIZE),
                };
                let anchor = Coord {
                    row: rng.gen_range(0..max_row),
                    col: rng.gen_range(0..max_col),
                };
                if self.place_vessel(id, anchor, orientation).is_ok() {
                    placed = true;
                    break;
                }
            }
            all_placed &= placed;
        }

        all_placed
    }

    /// Reset the fleet and place it randomly.
    ///
    /// A round can strand a vessel when earlier ones crowd it out; the whole
    /// fleet is then redrawn, up to a fixed number of rounds.
    pub fn place_random_fleet<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), MatchError> {
        for _ in 0..RANDOM_FLEET_ROUNDS {
            if self.try_random_fleet(rng) {
                return Ok(());
            }
        }
        Err(MatchError::PlacementExhausted)
    }

    /// Resolve a shot.
    ///
    /// Repeat coordinates return the recorded outcome with `already_shot`
    /// set and record nothing.
    pub fn receive_shot(&mut self, coord: Coord) -> ShotResolution {
        if let Some(previous) = self.shots.iter().find(|s| s.coord() == coord) {
            return ShotResolution {
                hit: previous.hit,
                sunk: None,
                already_shot: true,
            };
        }

        let mut hit = false;
        let mut sunk = None;
        for vessel in &mut self.vessels {
            if vessel.register_hit(coord) {
                hit = true;
                if vessel.is_sunk() {
                    sunk = Some(vessel.id);
                }
                break;
            }
        }

        self.shots.push(ReceivedShot {
            row: coord.row,
            col: coord.col,
            hit,
        });

        ShotResolution {
            hit,
            sunk,
            already_shot: false,
        }
    }

    /// Every vessel placed and fully hit
    pub fn all_sunk(&self) -> bool {
        self.vessels.iter().all(Vessel::is_sunk)
    }

    pub fn all_placed(&self) -> bool {
        self.vessels.iter().all(Vessel::is_placed)
    }

    pub fn placed_count(&self) -> usize {
        self.vessels.iter().filter(|v| v.is_placed()).count()
    }

    pub fn sunk_vessels(&self) -> impl Iterator<Item = &Vessel> {
        self.vessels.iter().filter(|v| v.is_sunk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(row: u8, col: u8) -> Coord {
        Coord::new(row, col).unwrap()
    }

    #[test]
    fn test_new_board_is_unplaced() {
        let board = Board::new();
        assert_eq!(board.vessels().len(), 5);
        assert_eq!(board.placed_count(), 0);
        assert!(!board.all_placed());
        assert!(!board.all_sunk());
    }

    #[test]
    fn test_place_vessel_in_bounds() {
        let mut board = Board::new();
        assert_eq!(
            board.place_vessel(1, at(0, 6), Orientation::Horizontal),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(board.placed_count(), 0);

        board.place_vessel(1, at(0, 5), Orientation::Horizontal).unwrap();
        assert_eq!(board.placed_count(), 1);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut board = Board::new();
        board.place_vessel(1, at(2, 2), Orientation::Horizontal).unwrap();
        assert_eq!(
            board.place_vessel(2, at(0, 4), Orientation::Vertical),
            Err(PlacementError::Overlap(1))
        );
        assert!(!board.vessel(2).unwrap().is_placed());
    }

    #[test]
    fn test_diagonal_contact_rejected() {
        let mut board = Board::new();
        board.place_vessel(4, at(3, 3), Orientation::Horizontal).unwrap();

        // Touches (3,4) diagonally from (4,5)
        assert_eq!(
            board.place_vessel(5, at(4, 5), Orientation::Vertical),
            Err(PlacementError::TooClose(4))
        );
        // One clear column is enough
        board.place_vessel(5, at(4, 6), Orientation::Vertical).unwrap();
    }

    #[test]
    fn test_replacing_a_vessel_ignores_its_old_position() {
        let mut board = Board::new();
        board.place_vessel(3, at(0, 0), Orientation::Horizontal).unwrap();
        board.place_vessel(3, at(0, 1), Orientation::Horizontal).unwrap();
        assert_eq!(board.vessel(3).unwrap().anchor, Some(at(0, 1)));
    }

    #[test]
    fn test_unknown_vessel() {
        let mut board = Board::new();
        assert_eq!(
            board.place_vessel(9, at(0, 0), Orientation::Horizontal),
            Err(PlacementError::UnknownVessel(9))
        );
    }

    #[test]
    fn test_receive_shot_hit_miss_and_repeat() {
        let mut board = Board::new();
        board.place_vessel(4, at(5, 5), Orientation::Horizontal).unwrap();

        let miss = board.receive_shot(at(0, 0));
        assert!(!miss.hit && !miss.already_shot);

        let hit = board.receive_shot(at(5, 5));
        assert!(hit.hit);
        assert_eq!(hit.sunk, None);

        let repeat = board.receive_shot(at(5, 5));
        assert!(repeat.hit && repeat.already_shot);
        assert_eq!(board.shots().len(), 2);

        let sinking = board.receive_shot(at(5, 6));
        assert_eq!(sinking.sunk, Some(4));
        assert_eq!(board.sunk_vessels().count(), 1);
    }

    #[test]
    fn test_random_fleet_satisfies_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut board = Board::new();
            board.place_random_fleet(&mut rng).unwrap();
            assert!(board.all_placed());

            let vessels = board.vessels().to_vec();
            for (i, a) in vessels.iter().enumerate() {
                for b in vessels.iter().skip(i + 1) {
                    for cell in a.cells() {
                        assert!(cell.surrounding().all(|near| !b.occupies(near)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_random_fleet_gives_up_when_nothing_fits() {
        // Every draw lands on (0, 0) horizontally, so only the first vessel fits
        let mut rng = StepRng::new(0, 0);
        let mut board = Board::new();
        assert_eq!(
            board.place_random_fleet(&mut rng),
            Err(MatchError::PlacementExhausted)
        );
        assert!(!board.all_placed());
        assert_eq!(board.vessel_at(at(0, 0)).map(|v| v.id), Some(1));
    }

    #[test]
    fn test_all_sunk_after_every_cell_hit() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut board = Board::new();
        board.place_random_fleet(&mut rng).unwrap();

        let cells: Vec<Coord> = board.vessels().iter().flat_map(Vessel::cells).collect();
        for cell in cells {
            assert!(!board.all_sunk());
            board.receive_shot(cell);
        }
        assert!(board.all_sunk());
    }
}
