//! WebSocket protocol messages for Broadside.

use broadside_core::{
    ErrorKind, MatchEvent, MatchId, MatchMode, MatchSummary, MatchView, Placement, SeatId,
    ShotOutcome,
};
use crate::store::SaveListing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new match and take seat one
    CreateMatch { player_name: String, mode: MatchMode },

    /// Take seat two of a dual-seat match by id
    JoinMatch { match_id: MatchId, player_name: String },

    /// Take seat two of a dual-seat match by its join code
    JoinByCode { code: String, player_name: String },

    /// Place (or replace) this seat's fleet
    SubmitFleet { vessels: Vec<Placement> },

    /// Fire at the opponent's board
    Fire { row: u8, col: u8 },

    /// Request the current view
    QueryView,

    /// Store a named save of the current match
    SaveMatch { name: String },

    /// Host a stored match and take seat one; the autosave unless `name` is given
    LoadMatch {
        match_id: MatchId,
        #[serde(default)]
        name: Option<String>,
    },

    /// Request the saves stored for a match
    ListSaves { match_id: MatchId },

    /// Give up the seat
    LeaveMatch,

    /// Remove the match for both seats
    DeleteMatch,

    /// Request open matches
    ListMatches,

    /// Request server statistics
    GetStats,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { connection_id: Uuid },

    /// Match created; `code` is set for dual-seat matches
    MatchCreated {
        match_id: MatchId,
        code: Option<String>,
        view: MatchView,
    },

    /// Seat two taken successfully
    JoinedMatch { view: MatchView },

    /// Someone took the other seat
    PlayerJoined { player_name: String, view: MatchView },

    /// Fleet accepted
    FleetAccepted { events: Vec<MatchEvent>, view: MatchView },

    /// Both fleets are down and shots may be fired
    MatchReady { current_turn: SeatId, view: MatchView },

    /// A shot was resolved, from either seat
    ShotResult {
        seat: SeatId,
        player_name: String,
        outcome: ShotOutcome,
        view: MatchView,
    },

    /// Current view on request
    View { view: MatchView },

    /// Named save written
    MatchSaved { name: String },

    /// A stored match is hosted again; `code` lets seat two rejoin
    MatchLoaded {
        match_id: MatchId,
        code: Option<String>,
        view: MatchView,
    },

    /// Saves stored for a match
    SaveList { match_id: MatchId, saves: SaveListing },

    /// Left the match
    LeftMatch,

    /// The match was removed
    MatchDeleted { match_id: MatchId },

    /// The other seat's connection went away
    OpponentDisconnected { player_name: String },

    /// Open matches
    MatchList { matches: Vec<MatchSummary> },

    /// Server statistics
    Stats { stats: ServerStats },

    /// Request rejected
    Error {
        kind: Option<ErrorKind>,
        message: String,
    },

    /// Pong response
    Pong,

    /// Match finished
    GameOver { winner: SeatId, winner_name: String },
}

/// Aggregate counters across the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub total_matches: usize,
    pub setup: usize,
    pub playing: usize,
    pub finished: usize,
    /// Dual-seat matches with seat two still open
    pub waiting: usize,
    pub connected_clients: usize,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}
