//! WebSocket server, match registry and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, ServerMessage, ServerStats};
use crate::room::{generate_code, MatchRoom, RegistryError, ScriptedMove};
use crate::scripted::schedule_scripted_turn;
use crate::store::{SaveListing, SnapshotStore};
use broadside_core::{
    ErrorKind, Match, MatchEvent, MatchId, MatchMode, MatchStatus, MatchSummary, MatchView,
    Placement, SeatId, ShotReport, SCRIPTED_NAME, SEAT_ONE,
};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A view addressed to one seated connection.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub connection: Uuid,
    pub view: MatchView,
}

#[derive(Debug, Clone)]
pub struct Created {
    pub match_id: MatchId,
    pub code: Option<String>,
    pub view: MatchView,
}

#[derive(Debug, Clone)]
pub struct Joined {
    pub view: MatchView,
    /// Seat one, told about the newcomer
    pub host: Option<Delivery>,
}

#[derive(Debug, Clone)]
pub struct FleetSubmitted {
    pub events: Vec<MatchEvent>,
    pub view: MatchView,
    /// Set once both fleets are down; one entry per seated connection
    pub started: Option<Vec<Delivery>>,
}

#[derive(Debug, Clone)]
pub struct ShotFired {
    pub match_id: MatchId,
    pub seat: SeatId,
    pub player_name: String,
    pub report: ShotReport,
    pub deliveries: Vec<Delivery>,
    pub winner: Option<(SeatId, String)>,
}

#[derive(Debug, Clone)]
pub struct Restored {
    pub code: Option<String>,
    pub view: MatchView,
    pub scripted_turn_due: bool,
}

#[derive(Debug, Clone)]
pub struct Left {
    pub match_id: MatchId,
    pub player_name: String,
    /// The connection still seated, if any
    pub remaining: Option<Uuid>,
    pub removed: bool,
}

/// Server state shared across all connections.
///
/// Owns the match registry; every component that needs a match looks it up
/// through this value.
pub struct ServerState {
    pub config: ServerConfig,
    /// All hosted matches
    pub rooms: DashMap<MatchId, MatchRoom>,
    /// Open join codes, uppercase
    pub codes: DashMap<String, MatchId>,
    /// Mapping from connection ID to its match
    pub player_matches: DashMap<Uuid, MatchId>,
    /// Mapping from connection ID to its message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    store: Option<SnapshotStore>,
    /// Source of snapshot revisions; taken while the room is locked
    revisions: AtomicU64,
    started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let store = config
            .persist
            .then(|| SnapshotStore::new(config.data_dir.clone()));
        Self {
            config,
            rooms: DashMap::new(),
            codes: DashMap::new(),
            player_matches: DashMap::new(),
            player_senders: DashMap::new(),
            store,
            revisions: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// Send a message to a specific connection.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    pub fn send_error(&self, player_id: Uuid, err: &RegistryError) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        );
    }

    /// Reserve a fresh join code for `match_id`
    fn allocate_code(&self, match_id: MatchId) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_code(&mut rng);
            if let Entry::Vacant(slot) = self.codes.entry(code.clone()) {
                slot.insert(match_id);
                return code;
            }
        }
    }

    fn release_code(&self, room: &mut MatchRoom) {
        if let Some(code) = room.code.take() {
            self.codes.remove(&code);
        }
    }

    fn deliveries(room: &MatchRoom) -> Vec<Delivery> {
        room.connections()
            .filter_map(|(seat, connection)| {
                room.game
                    .view(seat)
                    .ok()
                    .map(|view| Delivery { connection, view })
            })
            .collect()
    }

    /// Write the match to the snapshot store off the request path.
    ///
    /// Must be called with the room locked so revisions follow the order
    /// in which the match changed.
    pub(crate) fn persist(&self, room: &MatchRoom) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let match_id = room.id();
        let revision = self.revisions.fetch_add(1, Ordering::Relaxed) + 1;
        let finished = room.game.is_finished();
        let snapshot = match room.game.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to serialize match {}: {}", match_id, e);
                return;
            }
        };

        tokio::spawn(async move {
            let written = if finished {
                store.archive(match_id, revision, &snapshot).await
            } else {
                store.autosave(match_id, revision, &snapshot).await
            };
            match written {
                Ok(Some(path)) => debug!("Saved match {} to {}", match_id, path.display()),
                Ok(None) => debug!("Skipped superseded snapshot {} of match {}", revision, match_id),
                Err(e) => warn!("Failed to save match {}: {}", match_id, e),
            }
        });
    }

    pub fn create_match(
        &self,
        player_id: Uuid,
        player_name: String,
        mode: MatchMode,
    ) -> Result<Created, RegistryError> {
        if self.player_matches.contains_key(&player_id) {
            return Err(RegistryError::AlreadySeated);
        }

        let game = Match::new(player_name, mode)?;
        let match_id = game.id;
        let view = game.view(SEAT_ONE)?;
        let code = match mode {
            MatchMode::DualSeat => Some(self.allocate_code(match_id)),
            MatchMode::Scripted => None,
        };

        self.rooms
            .insert(match_id, MatchRoom::new(game, player_id, code.clone()));
        self.player_matches.insert(player_id, match_id);

        info!("Match {} created ({:?}) by {}", match_id, mode, player_id);
        Ok(Created {
            match_id,
            code,
            view,
        })
    }

    pub fn join_match(
        &self,
        player_id: Uuid,
        match_id: MatchId,
        player_name: String,
    ) -> Result<Joined, RegistryError> {
        if self.player_matches.contains_key(&player_id) {
            return Err(RegistryError::AlreadySeated);
        }

        let mut room = self
            .rooms
            .get_mut(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;
        let code = room.code.clone();
        let view = room.claim(player_id, player_name)?;
        if let Some(code) = code {
            self.codes.remove(&code);
        }

        let host = Self::deliveries(&room)
            .into_iter()
            .find(|d| d.connection != player_id);
        drop(room);

        self.player_matches.insert(player_id, match_id);
        info!("{} joined match {}", player_id, match_id);
        Ok(Joined { view, host })
    }

    /// Join by the six-character code; case does not matter
    pub fn join_by_code(
        &self,
        player_id: Uuid,
        code: &str,
        player_name: String,
    ) -> Result<Joined, RegistryError> {
        let code = code.trim().to_ascii_uppercase();
        let match_id = self
            .codes
            .get(&code)
            .map(|entry| *entry.value())
            .ok_or(RegistryError::UnknownCode(code))?;
        self.join_match(player_id, match_id, player_name)
    }

    fn seated_match(&self, player_id: Uuid) -> Result<MatchId, RegistryError> {
        self.player_matches
            .get(&player_id)
            .map(|entry| *entry.value())
            .ok_or(RegistryError::NotSeated)
    }

    pub fn submit_fleet(
        &self,
        player_id: Uuid,
        placements: &[Placement],
    ) -> Result<FleetSubmitted, RegistryError> {
        let match_id = self.seated_match(player_id)?;
        let mut room = self
            .rooms
            .get_mut(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;

        let (seat, events) = room.submit_fleet(player_id, placements)?;
        let view = room.game.view(seat)?;
        let started = events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchStarted { .. }))
            .then(|| Self::deliveries(&room));
        self.persist(&room);

        info!("Seat {} of match {} placed its fleet", seat, match_id);
        Ok(FleetSubmitted {
            events,
            view,
            started,
        })
    }

    pub fn fire(&self, player_id: Uuid, row: u8, col: u8) -> Result<ShotFired, RegistryError> {
        let match_id = self.seated_match(player_id)?;
        let mut room = self
            .rooms
            .get_mut(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;

        let (seat, report) = room.fire(player_id, row, col)?;
        let player_name = room.game.seat_name(seat).unwrap_or_default().to_string();
        let winner = room.game.winner().map(|winner| {
            let name = room.game.seat_name(winner).unwrap_or_default().to_string();
            (winner, name)
        });
        if winner.is_some() {
            self.release_code(&mut room);
        }
        let deliveries = Self::deliveries(&room);
        self.persist(&room);

        debug!(
            "Seat {} fired at ({}, {}) in match {}: hit={}",
            seat, row, col, match_id, report.outcome.hit
        );
        if let Some((winner, name)) = &winner {
            info!("Match {} won by seat {} ({})", match_id, winner, name);
        }

        Ok(ShotFired {
            match_id,
            seat,
            player_name,
            report,
            deliveries,
            winner,
        })
    }

    pub fn query_view(&self, player_id: Uuid) -> Result<MatchView, RegistryError> {
        let match_id = self.seated_match(player_id)?;
        let room = self
            .rooms
            .get(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;
        room.view_for(player_id)
    }

    /// Snapshot the caller's match for a named save
    pub fn snapshot_for_save(
        &self,
        player_id: Uuid,
    ) -> Result<(MatchId, String, SnapshotStore), RegistryError> {
        let store = self
            .store
            .clone()
            .ok_or(RegistryError::PersistenceDisabled)?;
        let match_id = self.seated_match(player_id)?;
        let room = self
            .rooms
            .get(&match_id)
            .ok_or(RegistryError::MatchNotFound)?;
        let snapshot = room.game.snapshot()?;
        Ok((match_id, snapshot, store))
    }

    /// Host a match from the snapshot store with the caller in seat one.
    ///
    /// `name` picks a named save; otherwise the autosave is loaded. A
    /// dual-seat match gets a fresh join code so seat two can come back.
    pub async fn restore_match(
        &self,
        player_id: Uuid,
        match_id: MatchId,
        name: Option<&str>,
    ) -> Result<Restored, RegistryError> {
        let store = self
            .store
            .clone()
            .ok_or(RegistryError::PersistenceDisabled)?;
        if self.player_matches.contains_key(&player_id) {
            return Err(RegistryError::AlreadySeated);
        }
        if self.rooms.contains_key(&match_id) {
            return Err(RegistryError::AlreadyHosted(match_id));
        }

        let game = match name {
            Some(name) => store.load_named(match_id, name).await?,
            None => store.load(match_id).await?,
        };
        let view = game.view(SEAT_ONE)?;
        let scripted_turn_due = game.scripted_turn_due();
        let code = (game.mode == MatchMode::DualSeat && !game.is_finished())
            .then(|| self.allocate_code(match_id));

        // Another load of the same match may have finished while this one read
        let hosted = match self.rooms.entry(match_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(MatchRoom::new(game, player_id, code.clone()));
                true
            }
        };
        if !hosted {
            if let Some(code) = &code {
                self.codes.remove(code);
            }
            return Err(RegistryError::AlreadyHosted(match_id));
        }

        let seated = match self.player_matches.entry(player_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(match_id);
                true
            }
        };
        if !seated {
            if let Some((_, mut room)) = self.rooms.remove(&match_id) {
                self.release_code(&mut room);
            }
            return Err(RegistryError::AlreadySeated);
        }

        info!(
            "Match {} loaded from {} by {}",
            match_id,
            name.unwrap_or("autosave"),
            player_id
        );
        Ok(Restored {
            code,
            view,
            scripted_turn_due,
        })
    }

    /// Saves on disk for `match_id`
    pub async fn list_saves(&self, match_id: MatchId) -> Result<SaveListing, RegistryError> {
        let store = self
            .store
            .as_ref()
            .ok_or(RegistryError::PersistenceDisabled)?;
        Ok(store.list_saves(match_id).await?)
    }

    /// Matches that are not finished
    pub fn list_open_matches(&self) -> Vec<MatchSummary> {
        let mut matches: Vec<MatchSummary> = self
            .rooms
            .iter()
            .filter(|room| !room.game.is_finished())
            .map(|room| room.to_summary())
            .collect();
        matches.sort_by_key(|m| m.created_at);
        matches
    }

    pub fn stats(&self) -> ServerStats {
        let mut stats = ServerStats {
            connected_clients: self.player_senders.len(),
            started_at: self.started_at,
            uptime_secs: u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0),
            ..ServerStats::default()
        };
        for room in self.rooms.iter() {
            stats.total_matches += 1;
            match room.game.status() {
                MatchStatus::Setup => stats.setup += 1,
                MatchStatus::Playing => stats.playing += 1,
                MatchStatus::Finished => stats.finished += 1,
            }
            if room.game.is_joinable() {
                stats.waiting += 1;
            }
        }
        stats
    }

    /// Drop a match from the registry; returns the connections that were seated
    pub fn remove_match(&self, match_id: MatchId) -> Option<Vec<Uuid>> {
        let (_, mut room) = self.rooms.remove(&match_id)?;
        self.release_code(&mut room);
        let connections: Vec<Uuid> = room.connections().map(|(_, c)| c).collect();
        for connection in &connections {
            self.player_matches.remove(connection);
        }
        info!("Match {} removed", match_id);
        // Dropping the room cancels any pending scripted turn
        drop(room);
        Some(connections)
    }

    /// Delete the caller's match for everyone in it
    pub fn delete_match(&self, player_id: Uuid) -> Result<(MatchId, Vec<Uuid>), RegistryError> {
        let match_id = self.seated_match(player_id)?;
        let connections = self
            .remove_match(match_id)
            .ok_or(RegistryError::MatchNotFound)?;
        Ok((match_id, connections))
    }

    /// Vacate the caller's seat; a match nobody is connected to is removed
    pub fn leave_match(&self, player_id: Uuid) -> Option<Left> {
        let (_, match_id) = self.player_matches.remove(&player_id)?;

        let (player_name, remaining, empty) = {
            let mut room = self.rooms.get_mut(&match_id)?;
            let seat = room.release(player_id);
            let player_name = seat
                .and_then(|s| room.game.seat_name(s))
                .unwrap_or_default()
                .to_string();
            self.release_code(&mut room);
            let remaining = room.connections().map(|(_, c)| c).next();
            (player_name, remaining, room.is_empty())
        };

        if empty {
            self.remove_match(match_id);
        }

        Some(Left {
            match_id,
            player_name,
            remaining,
            removed: empty,
        })
    }
}

/// Run the WebSocket server.
pub async fn run_server(state: Arc<ServerState>) -> anyhow::Result<()> {
    let addr = state.config.addr;
    let listener = TcpListener::bind(addr).await?;
    info!("Broadside server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = ServerMessage::Welcome {
        connection_id: player_id,
    };
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?))
        .await?;

    // Forward messages from the channel to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, e);
                    state.send_to_player(
                        player_id,
                        ServerMessage::Error {
                            kind: Some(ErrorKind::Validation),
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Relay the scripted seat's moves in `match_id` to the human in seat one.
///
/// Ends when the room is dropped and the channel closes.
fn forward_scripted_moves(state: &Arc<ServerState>, player_id: Uuid, match_id: MatchId) {
    let Some(moves) = state.rooms.get(&match_id).map(|room| room.subscribe()) else {
        return;
    };
    relay_scripted_moves(Arc::clone(state), player_id, moves);
}

fn relay_scripted_moves(
    state: Arc<ServerState>,
    player_id: Uuid,
    mut moves: broadcast::Receiver<ScriptedMove>,
) {
    tokio::spawn(async move {
        loop {
            match moves.recv().await {
                Ok(scripted) => {
                    debug!(
                        "Relaying computer shot in match {} to {}",
                        scripted.match_id, player_id
                    );
                    let winner = scripted.view.winner.map(|winner| {
                        let name = if winner == scripted.view.seat {
                            scripted.view.your_name.clone()
                        } else {
                            scripted.view.opponent_name.clone()
                        };
                        (winner, name.unwrap_or_default())
                    });
                    state.send_to_player(
                        player_id,
                        ServerMessage::ShotResult {
                            seat: scripted.report.outcome.seat,
                            player_name: SCRIPTED_NAME.to_string(),
                            outcome: scripted.report.outcome,
                            view: scripted.view,
                        },
                    );
                    if let Some((winner, winner_name)) = winner {
                        state.send_to_player(
                            player_id,
                            ServerMessage::GameOver {
                                winner,
                                winner_name,
                            },
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} missed {} scripted moves", player_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateMatch { player_name, mode } => {
            match state.create_match(player_id, player_name, mode) {
                Ok(created) => {
                    if mode == MatchMode::Scripted {
                        forward_scripted_moves(state, player_id, created.match_id);
                    }
                    state.send_to_player(
                        player_id,
                        ServerMessage::MatchCreated {
                            match_id: created.match_id,
                            code: created.code,
                            view: created.view,
                        },
                    );
                }
                Err(e) => state.send_error(player_id, &e),
            }
        }

        ClientMessage::JoinMatch {
            match_id,
            player_name,
        } => {
            let joined = state.join_match(player_id, match_id, player_name);
            announce_join(player_id, joined, state);
        }

        ClientMessage::JoinByCode { code, player_name } => {
            let joined = state.join_by_code(player_id, &code, player_name);
            announce_join(player_id, joined, state);
        }

        ClientMessage::SubmitFleet { vessels } => match state.submit_fleet(player_id, &vessels) {
            Ok(submitted) => {
                state.send_to_player(
                    player_id,
                    ServerMessage::FleetAccepted {
                        events: submitted.events,
                        view: submitted.view,
                    },
                );
                for delivery in submitted.started.unwrap_or_default() {
                    state.send_to_player(
                        delivery.connection,
                        ServerMessage::MatchReady {
                            current_turn: delivery.view.current_turn,
                            view: delivery.view,
                        },
                    );
                }
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::Fire { row, col } => match state.fire(player_id, row, col) {
            Ok(fired) => {
                for delivery in &fired.deliveries {
                    state.send_to_player(
                        delivery.connection,
                        ServerMessage::ShotResult {
                            seat: fired.seat,
                            player_name: fired.player_name.clone(),
                            outcome: fired.report.outcome,
                            view: delivery.view.clone(),
                        },
                    );
                }
                if let Some((winner, winner_name)) = &fired.winner {
                    for delivery in &fired.deliveries {
                        state.send_to_player(
                            delivery.connection,
                            ServerMessage::GameOver {
                                winner: *winner,
                                winner_name: winner_name.clone(),
                            },
                        );
                    }
                }
                if fired.report.scripted_turn_due {
                    schedule_scripted_turn(state, fired.match_id);
                }
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::QueryView => match state.query_view(player_id) {
            Ok(view) => state.send_to_player(player_id, ServerMessage::View { view }),
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::SaveMatch { name } => match state.snapshot_for_save(player_id) {
            Ok((match_id, snapshot, store)) => {
                let state = Arc::clone(state);
                tokio::spawn(async move {
                    match store.save_named(match_id, &name, &snapshot).await {
                        Ok(path) => {
                            info!("Saved match {} as {}", match_id, path.display());
                            state.send_to_player(player_id, ServerMessage::MatchSaved { name });
                        }
                        Err(e) => {
                            warn!("Failed to save match {}: {}", match_id, e);
                            state.send_to_player(
                                player_id,
                                ServerMessage::Error {
                                    kind: None,
                                    message: e.to_string(),
                                },
                            );
                        }
                    }
                });
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::LoadMatch { match_id, name } => {
            let state = Arc::clone(state);
            tokio::spawn(async move {
                match state.restore_match(player_id, match_id, name.as_deref()).await {
                    Ok(restored) => {
                        if restored.view.mode == MatchMode::Scripted {
                            forward_scripted_moves(&state, player_id, match_id);
                        }
                        state.send_to_player(
                            player_id,
                            ServerMessage::MatchLoaded {
                                match_id,
                                code: restored.code,
                                view: restored.view,
                            },
                        );
                        // Saved while the computer owed a shot
                        if restored.scripted_turn_due {
                            schedule_scripted_turn(&state, match_id);
                        }
                    }
                    Err(e) => state.send_error(player_id, &e),
                }
            });
        }

        ClientMessage::ListSaves { match_id } => {
            let state = Arc::clone(state);
            tokio::spawn(async move {
                match state.list_saves(match_id).await {
                    Ok(saves) => {
                        state.send_to_player(player_id, ServerMessage::SaveList { match_id, saves })
                    }
                    Err(e) => state.send_error(player_id, &e),
                }
            });
        }

        ClientMessage::LeaveMatch => match state.leave_match(player_id) {
            Some(left) => {
                if let Some(other) = left.remaining {
                    state.send_to_player(
                        other,
                        ServerMessage::OpponentDisconnected {
                            player_name: left.player_name,
                        },
                    );
                }
                state.send_to_player(player_id, ServerMessage::LeftMatch);
            }
            None => state.send_error(player_id, &RegistryError::NotSeated),
        },

        ClientMessage::DeleteMatch => match state.delete_match(player_id) {
            Ok((match_id, connections)) => {
                for connection in connections {
                    state.send_to_player(connection, ServerMessage::MatchDeleted { match_id });
                }
            }
            Err(e) => state.send_error(player_id, &e),
        },

        ClientMessage::ListMatches => {
            let matches = state.list_open_matches();
            state.send_to_player(player_id, ServerMessage::MatchList { matches });
        }

        ClientMessage::GetStats => {
            let stats = state.stats();
            state.send_to_player(player_id, ServerMessage::Stats { stats });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

fn announce_join(player_id: Uuid, joined: Result<Joined, RegistryError>, state: &ServerState) {
    match joined {
        Ok(joined) => {
            let player_name = joined.view.your_name.clone().unwrap_or_default();
            state.send_to_player(player_id, ServerMessage::JoinedMatch { view: joined.view });
            if let Some(host) = joined.host {
                state.send_to_player(
                    host.connection,
                    ServerMessage::PlayerJoined {
                        player_name,
                        view: host.view,
                    },
                );
            }
        }
        Err(e) => state.send_error(player_id, &e),
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    if let Some(left) = state.leave_match(player_id) {
        if let Some(other) = left.remaining {
            state.send_to_player(
                other,
                ServerMessage::OpponentDisconnected {
                    player_name: left.player_name,
                },
            );
        }
        if left.removed {
            debug!("Match {} emptied by disconnect of {}", left.match_id, player_id);
        }
    }
}
