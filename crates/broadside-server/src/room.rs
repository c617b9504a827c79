//! Match room management.
//!
//! A room wraps one core `Match` with the transport-side state the engine
//! does not know about: which connection sits in which seat, the join code,
//! the pending scripted-turn task and the listeners for scripted moves.

use crate::store::StoreError;
use broadside_core::{
    ErrorKind, Match, MatchError, MatchEvent, MatchId, MatchSummary, MatchView, Placement,
    SeatId, ShotReport, SEAT_ONE, SEAT_TWO,
};
use rand::Rng;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use uuid::Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 6;

/// Buffered scripted moves per listener before it starts lagging
const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Match not found")]
    MatchNotFound,

    #[error("No match with code {0}")]
    UnknownCode(String),

    #[error("Not seated in a match")]
    NotSeated,

    #[error("Already seated in a match")]
    AlreadySeated,

    #[error("Snapshot store is disabled")]
    PersistenceDisabled,

    #[error("Match {0} is already being hosted")]
    AlreadyHosted(MatchId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to serialize match: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Match(#[from] MatchError),
}

impl RegistryError {
    /// Taxonomy class; `None` for server-side failures
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RegistryError::MatchNotFound
            | RegistryError::UnknownCode(_)
            | RegistryError::NotSeated => Some(ErrorKind::NotFound),
            RegistryError::AlreadySeated
            | RegistryError::PersistenceDisabled
            | RegistryError::AlreadyHosted(_) => Some(ErrorKind::RuleViolation),
            RegistryError::Match(e) => Some(e.kind()),
            RegistryError::Store(StoreError::InvalidName(_)) => Some(ErrorKind::Validation),
            RegistryError::Store(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Some(ErrorKind::NotFound)
            }
            RegistryError::Store(_) | RegistryError::Snapshot(_) => None,
        }
    }
}

/// Generate a join code such as `K7Q2ZD`
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// A shot taken by the scripted seat, with seat one's fresh view.
#[derive(Debug, Clone)]
pub struct ScriptedMove {
    pub match_id: MatchId,
    pub report: ShotReport,
    pub view: MatchView,
}

/// A hosted match.
pub struct MatchRoom {
    pub game: Match,
    /// Join code while seat two is open
    pub code: Option<String>,
    /// Connection in each seat, seat one first
    connections: [Option<Uuid>; 2],
    events: broadcast::Sender<ScriptedMove>,
    scripted_task: Option<AbortHandle>,
}

impl MatchRoom {
    pub fn new(game: Match, host: Uuid, code: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            game,
            code,
            connections: [Some(host), None],
            events,
            scripted_task: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.game.id
    }

    /// Resolve a connection to the seat it holds
    pub fn seat_of(&self, connection: Uuid) -> Option<SeatId> {
        match self.connections {
            [Some(c), _] if c == connection => Some(SEAT_ONE),
            [_, Some(c)] if c == connection => Some(SEAT_TWO),
            _ => None,
        }
    }

    fn require_seat(&self, connection: Uuid) -> Result<SeatId, RegistryError> {
        self.seat_of(connection).ok_or(RegistryError::NotSeated)
    }

    /// Connection currently in `seat`
    pub fn connection(&self, seat: SeatId) -> Option<Uuid> {
        match seat {
            SEAT_ONE => self.connections[0],
            SEAT_TWO => self.connections[1],
            _ => None,
        }
    }

    /// Every seated connection with its seat
    pub fn connections(&self) -> impl Iterator<Item = (SeatId, Uuid)> + '_ {
        [SEAT_ONE, SEAT_TWO]
            .into_iter()
            .filter_map(|seat| self.connection(seat).map(|c| (seat, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.connections.iter().all(Option::is_none)
    }

    /// Seat `connection` in seat two.
    ///
    /// A reloaded match whose seat two already has a name keeps its join
    /// code open; whoever uses it takes the seat back under the saved name.
    pub fn claim(&mut self, connection: Uuid, name: String) -> Result<MatchView, RegistryError> {
        let reopened = self.code.is_some()
            && self.connections[1].is_none()
            && self.game.seat_name(SEAT_TWO).is_some();
        if !reopened {
            self.game.claim_seat(name)?;
        }
        self.connections[1] = Some(connection);
        self.code = None;
        Ok(self.game.view(SEAT_TWO)?)
    }

    /// Vacate whatever seat `connection` holds; returns the seat it held
    pub fn release(&mut self, connection: Uuid) -> Option<SeatId> {
        let seat = self.seat_of(connection)?;
        self.connections[usize::from(seat - 1)] = None;
        Some(seat)
    }

    pub fn submit_fleet(
        &mut self,
        connection: Uuid,
        placements: &[Placement],
    ) -> Result<(SeatId, Vec<MatchEvent>), RegistryError> {
        let seat = self.require_seat(connection)?;
        let events = self.game.set_fleet(seat, placements)?;
        Ok((seat, events))
    }

    pub fn fire(
        &mut self,
        connection: Uuid,
        row: u8,
        col: u8,
    ) -> Result<(SeatId, ShotReport), RegistryError> {
        let seat = self.require_seat(connection)?;
        let report = self.game.fire_shot(seat, row, col)?;
        Ok((seat, report))
    }

    pub fn view_for(&self, connection: Uuid) -> Result<MatchView, RegistryError> {
        let seat = self.require_seat(connection)?;
        Ok(self.game.view(seat)?)
    }

    /// Listen for scripted moves in this match
    pub fn subscribe(&self) -> broadcast::Receiver<ScriptedMove> {
        self.events.subscribe()
    }

    /// Take the scripted seat's shot and notify listeners
    pub fn run_scripted_turn(&mut self) -> Result<ScriptedMove, MatchError> {
        let report = self.game.play_scripted_turn()?;
        let scripted = ScriptedMove {
            match_id: self.game.id,
            report,
            view: self.game.view(SEAT_ONE)?,
        };
        // No listeners is fine; the move is already applied
        let _ = self.events.send(scripted.clone());
        Ok(scripted)
    }

    /// Store the handle of a newly scheduled scripted turn
    pub fn arm(&mut self, task: AbortHandle) {
        if let Some(previous) = self.scripted_task.replace(task) {
            previous.abort();
        }
    }

    /// Forget the pending task without aborting it; called by the task itself
    pub fn disarm(&mut self) {
        self.scripted_task = None;
    }

    pub fn has_pending_scripted_turn(&self) -> bool {
        self.scripted_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn cancel_scripted_turn(&mut self) {
        if let Some(task) = self.scripted_task.take() {
            task.abort();
        }
    }

    pub fn to_summary(&self) -> MatchSummary {
        self.game.summary()
    }
}

impl Drop for MatchRoom {
    fn drop(&mut self) {
        self.cancel_scripted_turn();
    }
}
