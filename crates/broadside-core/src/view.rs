//! Seat-scoped projections of a match.
//!
//! A view is the only form in which match state leaves the engine. The
//! requesting seat sees its own fleet in full; of the opponent's fleet it
//! sees only the shots it has landed and any vessel that is already sunk.

use crate::actions::MoveRecord;
use crate::board::{Board, ReceivedShot};
use crate::game::{FiredShot, Match, MatchId, MatchMode, MatchStatus, Seat, SeatId};
use crate::grid::{Coord, Orientation, BOARD_SIZE};
use crate::vessel::{Vessel, VesselId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full detail of one vessel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselView {
    pub id: VesselId,
    pub length: u8,
    pub row: Option<u8>,
    pub col: Option<u8>,
    pub orientation: Orientation,
    pub hits: Vec<Coord>,
    pub placed: bool,
    pub sunk: bool,
}

impl From<&Vessel> for VesselView {
    fn from(vessel: &Vessel) -> Self {
        Self {
            id: vessel.id,
            length: vessel.length,
            row: vessel.anchor.map(|a| a.row),
            col: vessel.anchor.map(|a| a.col),
            orientation: vessel.orientation,
            hits: vessel.hits.clone(),
            placed: vessel.is_placed(),
            sunk: vessel.is_sunk(),
        }
    }
}

/// What the opponent board shows at one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TargetCell {
    Unknown,
    Miss,
    Hit,
    Sunk { vessel: VesselId },
}

/// The viewer's own board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnBoardView {
    pub vessels: Vec<VesselView>,
    pub shots: Vec<ReceivedShot>,
}

/// The opponent's board as the viewer may see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBoardView {
    pub shots: Vec<ReceivedShot>,
    pub sunk_vessels: Vec<VesselView>,
    /// Row-major damage map
    pub cells: Vec<Vec<TargetCell>>,
}

impl TargetBoardView {
    fn project(board: &Board) -> Self {
        let mut cells = vec![vec![TargetCell::Unknown; usize::from(BOARD_SIZE)]; usize::from(BOARD_SIZE)];

        for shot in board.shots() {
            cells[usize::from(shot.row)][usize::from(shot.col)] = if shot.hit {
                TargetCell::Hit
            } else {
                TargetCell::Miss
            };
        }

        let sunk: Vec<&Vessel> = board.sunk_vessels().collect();
        for vessel in &sunk {
            for cell in vessel.cells() {
                cells[usize::from(cell.row)][usize::from(cell.col)] =
                    TargetCell::Sunk { vessel: vessel.id };
            }
        }

        Self {
            shots: board.shots().to_vec(),
            sunk_vessels: sunk.into_iter().map(VesselView::from).collect(),
            cells,
        }
    }
}

/// Shot statistics for one seat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotStats {
    pub total: usize,
    pub hits: usize,
    pub misses: usize,
    /// Hits over total, zero before the first shot
    pub accuracy: f64,
}

impl ShotStats {
    pub fn from_shots(shots: &[FiredShot]) -> Self {
        let total = shots.len();
        let hits = shots.iter().filter(|s| s.hit).count();
        let accuracy = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            total,
            hits,
            misses: total - hits,
            accuracy,
        }
    }
}

/// Everything one seat may know about a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub seat: SeatId,
    pub mode: MatchMode,
    pub status: MatchStatus,
    pub current_turn: SeatId,
    pub is_your_turn: bool,
    pub winner: Option<SeatId>,
    pub your_name: Option<String>,
    pub opponent_name: Option<String>,
    pub your_board: OwnBoardView,
    pub opponent_board: TargetBoardView,
    pub your_stats: ShotStats,
    pub opponent_stats: ShotStats,
    pub recent_moves: Vec<MoveRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchView {
    pub(crate) fn project(game: &Match, own: &Seat, other: &Seat) -> Self {
        Self {
            match_id: game.id,
            seat: own.id,
            mode: game.mode,
            status: game.status(),
            current_turn: game.current_turn(),
            is_your_turn: game.current_turn() == own.id,
            winner: game.winner(),
            your_name: own.name.clone(),
            opponent_name: other.name.clone(),
            your_board: OwnBoardView {
                vessels: own.board().vessels().iter().map(VesselView::from).collect(),
                shots: own.board().shots().to_vec(),
            },
            opponent_board: TargetBoardView::project(other.board()),
            your_stats: ShotStats::from_shots(own.shots_fired()),
            opponent_stats: ShotStats::from_shots(other.shots_fired()),
            recent_moves: game.recent_moves().to_vec(),
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

/// Lobby listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: MatchId,
    pub status: MatchStatus,
    pub mode: MatchMode,
    pub seat_one: Option<String>,
    pub seat_two: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{SEAT_ONE, SEAT_TWO};
    use crate::grid::Orientation;
    use crate::vessel::Placement;

    fn fleet() -> Vec<Placement> {
        vec![
            Placement::new(1, 0, 0, Orientation::Horizontal),
            Placement::new(2, 2, 0, Orientation::Horizontal),
            Placement::new(3, 4, 0, Orientation::Horizontal),
            Placement::new(4, 6, 0, Orientation::Horizontal),
            Placement::new(5, 8, 0, Orientation::Horizontal),
        ]
    }

    fn playing_match() -> Match {
        let mut game = Match::with_seed("Alice", MatchMode::DualSeat, 1).unwrap();
        game.claim_seat("Bob").unwrap();
        game.set_fleet(SEAT_ONE, &fleet()).unwrap();
        game.set_fleet(SEAT_TWO, &fleet()).unwrap();
        game
    }

    #[test]
    fn test_unsunk_vessels_are_hidden() {
        let mut game = playing_match();
        game.fire_shot(SEAT_ONE, 0, 0).unwrap();
        game.fire_shot(SEAT_ONE, 8, 0).unwrap();

        let view = game.view(SEAT_ONE).unwrap();
        assert!(view.opponent_board.sunk_vessels.is_empty());
        assert_eq!(view.opponent_board.cells[0][0], TargetCell::Hit);
        assert_eq!(view.opponent_board.cells[0][1], TargetCell::Unknown);
        assert_eq!(view.opponent_board.cells[8][0], TargetCell::Hit);
        assert_eq!(view.your_board.vessels.len(), 5);
        assert!(view.is_your_turn);
    }

    #[test]
    fn test_sunk_vessel_revealed_in_full() {
        let mut game = playing_match();
        game.fire_shot(SEAT_ONE, 8, 0).unwrap();
        game.fire_shot(SEAT_ONE, 8, 1).unwrap();

        let view = game.view(SEAT_ONE).unwrap();
        assert_eq!(view.opponent_board.sunk_vessels.len(), 1);
        assert_eq!(view.opponent_board.sunk_vessels[0].id, 5);
        assert_eq!(view.opponent_board.cells[8][1], TargetCell::Sunk { vessel: 5 });

        let other = game.view(SEAT_TWO).unwrap();
        assert_eq!(other.your_board.shots.len(), 2);
        assert_eq!(other.opponent_stats.hits, 2);
        assert!(!other.is_your_turn);
    }

    #[test]
    fn test_stats_accuracy() {
        let mut game = playing_match();
        let before = game.view(SEAT_ONE).unwrap();
        assert_eq!(before.your_stats.accuracy, 0.0);

        game.fire_shot(SEAT_ONE, 0, 0).unwrap();
        game.fire_shot(SEAT_ONE, 1, 0).unwrap();

        let stats = game.view(SEAT_ONE).unwrap().your_stats;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.accuracy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_target_cell_serialization() {
        let json = serde_json::to_string(&TargetCell::Sunk { vessel: 3 }).unwrap();
        assert_eq!(json, r#"{"state":"sunk","vessel":3}"#);
    }
}
