//! Broadside - a two-seat naval combat game engine
//!
//! This crate provides the core game logic for Broadside, including:
//! - Square grid coordinates and orientations
//! - Vessels and the fixed five-vessel fleet
//! - Boards with placement rules and shot resolution
//! - The match state machine with full rule enforcement
//! - Seat-scoped views that never leak unsunk enemy vessels
//! - A hunt/target scripted opponent
//!
//! # Architecture
//!
//! The engine is synchronous and platform-agnostic. It can be compiled to:
//! - Native Rust for server-side match hosting
//! - WebAssembly for client-side play against the scripted opponent
//!
//! Callers serialize access to a given match; pacing of the scripted seat's
//! replies is left to whoever hosts the match.
//!
//! # Modules
//!
//! - [`grid`]: Coordinates, orientations and directions
//! - [`vessel`]: Vessels, fleet composition and placements
//! - [`board`]: One seat's board
//! - [`game`]: Match state machine
//! - [`view`]: Seat-scoped projections
//! - [`bot`]: Scripted opponent

pub mod actions;
pub mod board;
pub mod bot;
pub mod game;
pub mod grid;
pub mod vessel;
pub mod view;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{MatchEvent, MoveRecord, ShotOutcome};
pub use board::{Board, PlacementError, ReceivedShot, ShotResolution};
pub use bot::{Bot, Targeting};
pub use game::{
    ErrorKind, FiredShot, Match, MatchError, MatchId, MatchMode, MatchStatus, Seat, SeatId,
    ShotReport, SCRIPTED_NAME, SEAT_ONE, SEAT_TWO,
};
pub use grid::{Coord, Direction, Orientation, BOARD_SIZE};
pub use vessel::{Placement, Vessel, VesselId, FLEET_LENGTHS};
pub use view::{MatchSummary, MatchView, ShotStats, TargetCell};
