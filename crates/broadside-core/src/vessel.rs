//! Vessels and the fixed fleet composition.
//!
//! This module contains:
//! - `Vessel`: one ship with its anchor, orientation and accumulated hits
//! - The standard fleet (lengths 5, 4, 3, 2, 2 with ids 1 through 5)
//! - `Placement`: a requested position for a vessel during setup

use crate::grid::{Coord, Orientation};
use serde::{Deserialize, Serialize};

/// Vessel identity, 1 through 5
pub type VesselId = u8;

/// Number of vessels in every fleet
pub const FLEET_SIZE: usize = 5;

/// Vessel lengths in fleet order; the vessel with id `i + 1` has length `FLEET_LENGTHS[i]`
pub const FLEET_LENGTHS: [u8; FLEET_SIZE] = [5, 4, 3, 2, 2];

/// Length of the vessel with the given id, if the id belongs to the fleet
pub fn length_of(id: VesselId) -> Option<u8> {
    let index = usize::from(id).checked_sub(1)?;
    FLEET_LENGTHS.get(index).copied()
}

/// A single ship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vessel {
    pub id: VesselId,
    pub length: u8,
    /// Top/left cell, `None` while unplaced
    pub anchor: Option<Coord>,
    pub orientation: Orientation,
    /// Cells that have registered a hit, in the order they were struck
    pub hits: Vec<Coord>,
}

impl Vessel {
    /// Create an unplaced vessel
    pub fn new(id: VesselId, length: u8) -> Self {
        Self {
            id,
            length,
            anchor: None,
            orientation: Orientation::Horizontal,
            hits: Vec::new(),
        }
    }

    /// The standard five-vessel fleet, all unplaced
    pub fn standard_fleet() -> Vec<Vessel> {
        FLEET_LENGTHS
            .iter()
            .zip(1..)
            .map(|(&length, id)| Vessel::new(id, length))
            .collect()
    }

    pub fn is_placed(&self) -> bool {
        self.anchor.is_some()
    }

    /// Cells covered when anchored at `anchor`, or `None` if any would leave the grid
    pub fn footprint(anchor: Coord, length: u8, orientation: Orientation) -> Option<Vec<Coord>> {
        (0..i16::from(length))
            .map(|i| anchor.offset(orientation.step(), i))
            .collect()
    }

    /// Occupied cells; empty while unplaced
    pub fn cells(&self) -> Vec<Coord> {
        self.anchor
            .and_then(|anchor| Self::footprint(anchor, self.length, self.orientation))
            .unwrap_or_default()
    }

    pub fn occupies(&self, coord: Coord) -> bool {
        self.cells().contains(&coord)
    }

    /// Set the position. Legality is the board's concern.
    pub fn place(&mut self, anchor: Coord, orientation: Orientation) {
        self.anchor = Some(anchor);
        self.orientation = orientation;
    }

    /// Return to the unplaced state, discarding any damage
    pub fn clear(&mut self) {
        self.anchor = None;
        self.orientation = Orientation::Horizontal;
        self.hits.clear();
    }

    /// Register a hit if the vessel covers `coord`.
    ///
    /// Returns whether the vessel was struck. Striking an already-hit cell
    /// reports a hit but records nothing new.
    pub fn register_hit(&mut self, coord: Coord) -> bool {
        if !self.occupies(coord) {
            return false;
        }
        if !self.hits.contains(&coord) {
            self.hits.push(coord);
        }
        true
    }

    /// Sunk once every cell has been hit
    pub fn is_sunk(&self) -> bool {
        self.is_placed() && self.hits.len() == usize::from(self.length)
    }
}

/// A requested vessel position submitted during setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: VesselId,
    /// Length the caller believes the vessel has; checked against the fleet
    pub length: u8,
    pub row: u8,
    pub col: u8,
    pub orientation: Orientation,
}

impl Placement {
    pub fn new(id: VesselId, row: u8, col: u8, orientation: Orientation) -> Self {
        Self {
            id,
            length: length_of(id).unwrap_or(0),
            row,
            col,
            orientation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: u8, col: u8) -> Coord {
        Coord::new(row, col).unwrap()
    }

    #[test]
    fn test_standard_fleet_composition() {
        let fleet = Vessel::standard_fleet();
        let ids: Vec<_> = fleet.iter().map(|v| v.id).collect();
        let lengths: Vec<_> = fleet.iter().map(|v| v.length).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(lengths, vec![5, 4, 3, 2, 2]);
        assert!(fleet.iter().all(|v| !v.is_placed()));
    }

    #[test]
    fn test_length_of() {
        assert_eq!(length_of(1), Some(5));
        assert_eq!(length_of(5), Some(2));
        assert_eq!(length_of(0), None);
        assert_eq!(length_of(6), None);
    }

    #[test]
    fn test_cells_follow_orientation() {
        let mut vessel = Vessel::new(3, 3);
        assert!(vessel.cells().is_empty());

        vessel.place(at(4, 4), Orientation::Vertical);
        assert_eq!(vessel.cells(), vec![at(4, 4), at(5, 4), at(6, 4)]);

        vessel.place(at(4, 4), Orientation::Horizontal);
        assert_eq!(vessel.cells(), vec![at(4, 4), at(4, 5), at(4, 6)]);
    }

    #[test]
    fn test_footprint_rejects_overhang() {
        assert!(Vessel::footprint(at(0, 6), 5, Orientation::Horizontal).is_none());
        assert!(Vessel::footprint(at(0, 5), 5, Orientation::Horizontal).is_some());
    }

    #[test]
    fn test_repeat_hit_does_not_double_count() {
        let mut vessel = Vessel::new(4, 2);
        vessel.place(at(0, 0), Orientation::Horizontal);

        assert!(vessel.register_hit(at(0, 0)));
        assert!(vessel.register_hit(at(0, 0)));
        assert_eq!(vessel.hits.len(), 1);
        assert!(!vessel.is_sunk());

        assert!(!vessel.register_hit(at(1, 0)));
        assert!(vessel.register_hit(at(0, 1)));
        assert!(vessel.is_sunk());
    }

    #[test]
    fn test_unplaced_vessel_is_never_sunk() {
        let vessel = Vessel::new(5, 2);
        assert!(!vessel.is_sunk());
    }

    #[test]
    fn test_placement_new_fills_length() {
        let placement = Placement::new(2, 1, 5, Orientation::Vertical);
        assert_eq!(placement.length, 4);
    }
}
