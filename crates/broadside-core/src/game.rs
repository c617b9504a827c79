//! Core match state machine.
//!
//! This module contains the `Match` struct and all rule enforcement:
//! seat claiming, fleet submission, turn order, shot resolution and win
//! detection. A match moves `Setup -> Playing -> Finished` and never back.

use crate::actions::{MatchEvent, MoveRecord, ShotOutcome};
use crate::board::{Board, PlacementError};
use crate::bot::Bot;
use crate::grid::Coord;
use crate::view::{MatchSummary, MatchView};
use crate::vessel::{length_of, Placement, VesselId, FLEET_LENGTHS, FLEET_SIZE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Seat number, 1 or 2
pub type SeatId = u8;

pub type MatchId = Uuid;

/// The seat that creates the match and always moves first
pub const SEAT_ONE: SeatId = 1;

/// The joining or scripted seat
pub const SEAT_TWO: SeatId = 2;

/// Display name given to the scripted seat
pub const SCRIPTED_NAME: &str = "Computer";

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Fleets are being placed
    Setup,
    /// Shots are being exchanged
    Playing,
    /// One fleet is sunk
    Finished,
}

/// Who occupies seat two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Seat two is the scripted opponent
    Scripted,
    /// Seat two is claimed by a second player
    DualSeat,
}

/// Broad class of a rejected call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input
    Validation,
    /// Well-formed input the rules do not allow right now
    RuleViolation,
    /// Unknown match or seat
    NotFound,
}

/// Errors that can occur when operating on a match.
///
/// A rejected call never changes the match.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MatchError {
    #[error("Player name is required")]
    MissingName,

    #[error("Coordinate ({row}, {col}) is off the board")]
    InvalidCoordinate { row: u8, col: u8 },

    #[error("Must provide exactly {expected} vessels, got {got}")]
    WrongVesselCount { expected: usize, got: usize },

    #[error("Invalid vessel lengths")]
    WrongVesselLengths,

    #[error("Vessel {0} listed more than once")]
    DuplicateVessel(VesselId),

    #[error("Unknown vessel {0}")]
    UnknownVessel(VesselId),

    #[error("Cannot place vessel {vessel}: {cause}")]
    PlacementConflict {
        vessel: VesselId,
        cause: PlacementError,
    },

    #[error("Could not find a legal random layout")]
    PlacementExhausted,

    #[error("Match is not in setup")]
    NotInSetup,

    #[error("Match is not in playing state")]
    NotPlaying,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Already shot at ({row}, {col})")]
    AlreadyFired { row: u8, col: u8 },

    #[error("Match is full")]
    MatchFull,

    #[error("Cannot join a match against the computer")]
    ScriptedMatch,

    #[error("Seat {0} has not been claimed")]
    SeatUnclaimed(SeatId),

    #[error("The computer places its own fleet")]
    ScriptedSeat,

    #[error("Seat {0} not found")]
    UnknownSeat(SeatId),

    #[error("No untried cells remain")]
    BoardExhausted,

    #[error("Not the computer's turn")]
    NotScriptedTurn,
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchError::MissingName
            | MatchError::InvalidCoordinate { .. }
            | MatchError::WrongVesselCount { .. }
            | MatchError::WrongVesselLengths
            | MatchError::DuplicateVessel(_)
            | MatchError::UnknownVessel(_) => ErrorKind::Validation,
            MatchError::UnknownSeat(_) => ErrorKind::NotFound,
            _ => ErrorKind::RuleViolation,
        }
    }
}

/// A shot this seat has fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredShot {
    pub row: u8,
    pub col: u8,
    pub hit: bool,
    pub timestamp: DateTime<Utc>,
}

impl FiredShot {
    pub fn coord(&self) -> Coord {
        Coord {
            row: self.row,
            col: self.col,
        }
    }
}

/// One of the two match participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    /// `None` until claimed in a dual-seat match
    pub name: Option<String>,
    pub scripted: bool,
    board: Board,
    shots_fired: Vec<FiredShot>,
}

impl Seat {
    fn new(id: SeatId, name: Option<String>, scripted: bool) -> Self {
        Self {
            id,
            name,
            scripted,
            board: Board::new(),
            shots_fired: Vec::new(),
        }
    }

    /// The board this seat owns, unsunk vessels included
    pub(crate) fn board(&self) -> &Board {
        &self.board
    }

    /// Shots this seat has fired, oldest first
    pub fn shots_fired(&self) -> &[FiredShot] {
        &self.shots_fired
    }

    pub fn has_fired_at(&self, coord: Coord) -> bool {
        self.shots_fired.iter().any(|s| s.coord() == coord)
    }
}

/// Result of an accepted shot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReport {
    pub outcome: ShotOutcome,
    pub events: Vec<MatchEvent>,
    /// The scripted seat now owes a reply
    pub scripted_turn_due: bool,
}

/// Number of moves included in a view
const RECENT_MOVES: usize = 10;

/// The complete match state.
///
/// Each seat's target board is the other seat's board; it is derived on
/// demand rather than stored, so it can never go stale after a rebuild or
/// a snapshot reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub mode: MatchMode,
    status: MatchStatus,
    current_turn: SeatId,
    winner: Option<SeatId>,
    seats: [Seat; 2],
    moves: Vec<MoveRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Targeting state of the scripted seat; reset on reload
    #[serde(skip)]
    opponent: Bot,
}

impl Match {
    /// Create a new match with `seat_one_name` in seat one
    pub fn new(seat_one_name: impl Into<String>, mode: MatchMode) -> Result<Self, MatchError> {
        Self::with_bot(seat_one_name, mode, Bot::new())
    }

    /// Create a match whose scripted seat draws from a seeded generator
    pub fn with_seed(
        seat_one_name: impl Into<String>,
        mode: MatchMode,
        seed: u64,
    ) -> Result<Self, MatchError> {
        Self::with_bot(seat_one_name, mode, Bot::with_seed(seed))
    }

    fn with_bot(
        seat_one_name: impl Into<String>,
        mode: MatchMode,
        opponent: Bot,
    ) -> Result<Self, MatchError> {
        let name = seat_one_name.into();
        if name.trim().is_empty() {
            return Err(MatchError::MissingName);
        }

        let seat_two = match mode {
            MatchMode::Scripted => Seat::new(SEAT_TWO, Some(SCRIPTED_NAME.to_string()), true),
            MatchMode::DualSeat => Seat::new(SEAT_TWO, None, false),
        };
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            mode,
            status: MatchStatus::Setup,
            current_turn: SEAT_ONE,
            winner: None,
            seats: [Seat::new(SEAT_ONE, Some(name), false), seat_two],
            moves: Vec::new(),
            created_at: now,
            updated_at: now,
            opponent,
        })
    }

    /// Restore a match from a snapshot produced by [`Match::snapshot`].
    ///
    /// The scripted seat starts over with fresh targeting state.
    pub fn restore(snapshot: &str) -> serde_json::Result<Self> {
        serde_json::from_str(snapshot)
    }

    /// Serialize the full match, both fleets and shot histories included
    pub fn snapshot(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn current_turn(&self) -> SeatId {
        self.current_turn
    }

    pub fn winner(&self) -> Option<SeatId> {
        self.winner
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Chronological move log
    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// The last few moves, oldest first
    pub fn recent_moves(&self) -> &[MoveRecord] {
        let start = self.moves.len().saturating_sub(RECENT_MOVES);
        &self.moves[start..]
    }

    pub fn opponent(&self) -> &Bot {
        &self.opponent
    }

    fn seat_index(seat: SeatId) -> Result<usize, MatchError> {
        match seat {
            SEAT_ONE => Ok(0),
            SEAT_TWO => Ok(1),
            other => Err(MatchError::UnknownSeat(other)),
        }
    }

    /// The other seat's number
    pub fn opponent_of(seat: SeatId) -> SeatId {
        if seat == SEAT_ONE {
            SEAT_TWO
        } else {
            SEAT_ONE
        }
    }

    pub fn seat(&self, seat: SeatId) -> Result<&Seat, MatchError> {
        Self::seat_index(seat).map(|i| &self.seats[i])
    }

    /// Display name of a seat, if claimed
    pub fn seat_name(&self, seat: SeatId) -> Option<&str> {
        self.seat(seat).ok().and_then(|s| s.name.as_deref())
    }

    /// Whether a second player may still claim seat two
    pub fn is_joinable(&self) -> bool {
        self.mode == MatchMode::DualSeat
            && self.seats[1].name.is_none()
            && self.status != MatchStatus::Finished
    }

    /// Claim seat two in a dual-seat match
    pub fn claim_seat(&mut self, name: impl Into<String>) -> Result<MatchEvent, MatchError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MatchError::MissingName);
        }
        if self.mode == MatchMode::Scripted {
            return Err(MatchError::ScriptedMatch);
        }
        if !self.is_joinable() {
            return Err(MatchError::MatchFull);
        }

        self.seats[1].name = Some(name.clone());
        self.updated_at = Utc::now();

        Ok(MatchEvent::SeatClaimed {
            seat: SEAT_TWO,
            name,
        })
    }

    /// Check the shape of a fleet submission: count, lengths, ids and coordinates
    fn validate_fleet(placements: &[Placement]) -> Result<Vec<(VesselId, Coord)>, MatchError> {
        if placements.len() != FLEET_SIZE {
            return Err(MatchError::WrongVesselCount {
                expected: FLEET_SIZE,
                got: placements.len(),
            });
        }

        let mut lengths: Vec<u8> = placements.iter().map(|p| p.length).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        if lengths != FLEET_LENGTHS {
            return Err(MatchError::WrongVesselLengths);
        }

        let mut seen = Vec::with_capacity(FLEET_SIZE);
        let mut anchors = Vec::with_capacity(FLEET_SIZE);
        for placement in placements {
            let expected = length_of(placement.id).ok_or(MatchError::UnknownVessel(placement.id))?;
            if seen.contains(&placement.id) {
                return Err(MatchError::DuplicateVessel(placement.id));
            }
            if expected != placement.length {
                return Err(MatchError::WrongVesselLengths);
            }
            seen.push(placement.id);
            anchors.push((placement.id, Coord::new(placement.row, placement.col)?));
        }

        Ok(anchors)
    }

    /// Replace a seat's fleet.
    ///
    /// The new board is built off to the side and only installed once every
    /// vessel is placed, so a rejected submission leaves the old board intact.
    /// In a scripted match, seat one's submission also places the scripted
    /// fleet and starts play. In a dual-seat match play starts once both
    /// fleets are down.
    pub fn set_fleet(
        &mut self,
        seat: SeatId,
        placements: &[Placement],
    ) -> Result<Vec<MatchEvent>, MatchError> {
        self.set_fleet_with(seat, placements, |opponent, board| {
            opponent.place_fleet(board)
        })
    }

    /// `set_fleet` with the scripted fleet laid out by `place_scripted`
    fn set_fleet_with<F>(
        &mut self,
        seat: SeatId,
        placements: &[Placement],
        place_scripted: F,
    ) -> Result<Vec<MatchEvent>, MatchError>
    where
        F: FnOnce(&mut Bot, &mut Board) -> Result<(), MatchError>,
    {
        let index = Self::seat_index(seat)?;
        if self.status != MatchStatus::Setup {
            return Err(MatchError::NotInSetup);
        }
        if self.seats[index].scripted {
            return Err(MatchError::ScriptedSeat);
        }
        if self.seats[index].name.is_none() {
            return Err(MatchError::SeatUnclaimed(seat));
        }

        let anchors = Self::validate_fleet(placements)?;

        let mut board = Board::new();
        for (placement, (id, anchor)) in placements.iter().zip(anchors) {
            board
                .place_vessel(id, anchor, placement.orientation)
                .map_err(|cause| MatchError::PlacementConflict { vessel: id, cause })?;
        }

        let scripted_board = if self.mode == MatchMode::Scripted {
            let mut scripted = Board::new();
            place_scripted(&mut self.opponent, &mut scripted)?;
            Some(scripted)
        } else {
            None
        };

        let mut events = vec![MatchEvent::FleetPlaced { seat }];

        self.seats[index].board = board;
        if let Some(scripted) = scripted_board {
            self.seats[1].board = scripted;
            events.push(MatchEvent::FleetPlaced { seat: SEAT_TWO });
        }

        if self.seats.iter().all(|s| s.board.all_placed()) {
            self.status = MatchStatus::Playing;
            self.current_turn = SEAT_ONE;
            self.opponent.reset();
            events.push(MatchEvent::MatchStarted {
                first_turn: SEAT_ONE,
            });
        }

        self.updated_at = Utc::now();
        Ok(events)
    }

    /// Whether the scripted seat is due to act
    pub fn scripted_turn_due(&self) -> bool {
        self.mode == MatchMode::Scripted
            && self.status == MatchStatus::Playing
            && self.current_turn == SEAT_TWO
    }

    /// Fire at `(row, col)` on the opponent's board.
    ///
    /// A hit keeps the turn; a miss passes it.
    pub fn fire_shot(&mut self, seat: SeatId, row: u8, col: u8) -> Result<ShotReport, MatchError> {
        let index = Self::seat_index(seat)?;
        let coord = Coord::new(row, col)?;
        self.fire_at(index, coord)
    }

    /// Let the scripted seat choose and fire one shot
    pub fn play_scripted_turn(&mut self) -> Result<ShotReport, MatchError> {
        if !self.scripted_turn_due() {
            return Err(MatchError::NotScriptedTurn);
        }

        let coord = self
            .opponent
            .choose_target(&self.seats[1].shots_fired, &self.seats[0].board)
            .ok_or(MatchError::BoardExhausted)?;

        let report = self.fire_at(1, coord)?;
        self.opponent
            .observe(&report.outcome, &self.seats[1].shots_fired);
        Ok(report)
    }

    fn fire_at(&mut self, index: usize, coord: Coord) -> Result<ShotReport, MatchError> {
        let seat = self.seats[index].id;
        if self.status != MatchStatus::Playing {
            return Err(MatchError::NotPlaying);
        }
        if seat != self.current_turn {
            return Err(MatchError::NotYourTurn);
        }
        if self.seats[index].has_fired_at(coord) {
            return Err(MatchError::AlreadyFired {
                row: coord.row,
                col: coord.col,
            });
        }

        let target = 1 - index;
        let resolution = self.seats[target].board.receive_shot(coord);
        let now = Utc::now();

        self.seats[index].shots_fired.push(FiredShot {
            row: coord.row,
            col: coord.col,
            hit: resolution.hit,
            timestamp: now,
        });

        let outcome = ShotOutcome::new(seat, coord, resolution);
        self.moves.push(MoveRecord::from_outcome(&outcome, now));

        let mut events = vec![MatchEvent::ShotFired(outcome)];
        if let Some(vessel) = outcome.sunk {
            events.push(MatchEvent::VesselSunk {
                owner: self.seats[target].id,
                vessel,
            });
        }

        // The firing seat's target is checked first
        let loser = [target, index]
            .into_iter()
            .find(|&i| self.seats[i].board.all_sunk());
        if let Some(loser) = loser {
            let winner = self.seats[1 - loser].id;
            self.status = MatchStatus::Finished;
            self.winner = Some(winner);
            events.push(MatchEvent::MatchWon { winner });
        }

        if !outcome.hit {
            let next = Self::opponent_of(seat);
            self.current_turn = next;
            events.push(MatchEvent::TurnPassed {
                from: seat,
                to: next,
            });
        }

        self.updated_at = now;

        Ok(ShotReport {
            outcome,
            events,
            scripted_turn_due: self.scripted_turn_due(),
        })
    }

    /// Seat-scoped projection of the match
    pub fn view(&self, seat: SeatId) -> Result<MatchView, MatchError> {
        let index = Self::seat_index(seat)?;
        Ok(MatchView::project(self, &self.seats[index], &self.seats[1 - index]))
    }

    /// Listing entry for lobbies
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            id: self.id,
            status: self.status,
            mode: self.mode,
            seat_one: self.seats[0].name.clone(),
            seat_two: self.seats[1].name.clone(),
            created_at: self.created_at,
        }
    }
}
