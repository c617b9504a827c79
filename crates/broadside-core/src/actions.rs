//! Shot outcomes, move history and match events.
//!
//! This module defines what a resolved shot looks like and the events the
//! match engine emits as a result of accepted operations.

use crate::board::ShotResolution;
use crate::game::SeatId;
use crate::grid::Coord;
use crate::vessel::VesselId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one accepted shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotOutcome {
    /// Seat that fired
    pub seat: SeatId,
    pub row: u8,
    pub col: u8,
    pub hit: bool,
    /// Vessel sunk by this shot, if any
    pub sunk: Option<VesselId>,
    pub already_shot: bool,
}

impl ShotOutcome {
    pub fn new(seat: SeatId, coord: Coord, resolution: ShotResolution) -> Self {
        Self {
            seat,
            row: coord.row,
            col: coord.col,
            hit: resolution.hit,
            sunk: resolution.sunk,
            already_shot: resolution.already_shot,
        }
    }

    pub fn coord(&self) -> Coord {
        Coord {
            row: self.row,
            col: self.col,
        }
    }
}

/// Entry in the match's chronological move log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub seat: SeatId,
    pub row: u8,
    pub col: u8,
    pub hit: bool,
    pub sunk: Option<VesselId>,
    pub timestamp: DateTime<Utc>,
}

impl MoveRecord {
    pub fn from_outcome(outcome: &ShotOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            seat: outcome.seat,
            row: outcome.row,
            col: outcome.col,
            hit: outcome.hit,
            sunk: outcome.sunk,
            timestamp,
        }
    }
}

/// Events that occur as a result of accepted operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Seat two was claimed by a joining player
    SeatClaimed { seat: SeatId, name: String },

    /// A seat's fleet was accepted
    FleetPlaced { seat: SeatId },

    /// Both fleets are down and play begins
    MatchStarted { first_turn: SeatId },

    /// A shot was resolved
    ShotFired(ShotOutcome),

    /// A shot completed a vessel
    VesselSunk { owner: SeatId, vessel: VesselId },

    /// A miss handed the turn over
    TurnPassed { from: SeatId, to: SeatId },

    /// Every vessel of the losing seat is sunk
    MatchWon { winner: SeatId },
}
