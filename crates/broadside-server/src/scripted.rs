//! Delayed turns for the scripted seat.
//!
//! After a human miss hands the turn to the computer, the reply is taken on
//! a spawned task after `scripted_delay`. The task handle is owned by the
//! match room, so removing the match aborts it. A task that wakes up to a
//! missing match, or one that no longer owes a scripted shot, does nothing.

use crate::server::ServerState;
use broadside_core::MatchId;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Schedule the scripted seat's next shot in `match_id`
pub fn schedule_scripted_turn(state: &Arc<ServerState>, match_id: MatchId) {
    let Some(mut room) = state.rooms.get_mut(&match_id) else {
        debug!("Not scheduling scripted turn for missing match {}", match_id);
        return;
    };
    if room.has_pending_scripted_turn() {
        debug!("Scripted turn already pending in match {}", match_id);
        return;
    }

    let delay = state.config.scripted_delay;
    let task_state = Arc::clone(state);
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        take_scripted_turn(&task_state, match_id);
    });
    // Armed while the room is still locked, so the task cannot run first
    room.arm(task.abort_handle());
}

fn take_scripted_turn(state: &Arc<ServerState>, match_id: MatchId) {
    let scripted = {
        let Some(mut room) = state.rooms.get_mut(&match_id) else {
            debug!("Scripted turn skipped: match {} is gone", match_id);
            return;
        };
        room.disarm();
        if !room.game.scripted_turn_due() {
            debug!("Scripted turn skipped: match {} is not waiting on it", match_id);
            return;
        }

        match room.run_scripted_turn() {
            Ok(scripted) => {
                state.persist(&room);
                scripted
            }
            Err(e) => {
                error!("Scripted turn failed in match {}: {}", match_id, e);
                return;
            }
        }
    };

    let outcome = scripted.report.outcome;
    info!(
        "Computer fired at ({}, {}) in match {}: hit={}",
        outcome.row, outcome.col, match_id, outcome.hit
    );

    // A hit keeps the turn
    if scripted.report.scripted_turn_due {
        schedule_scripted_turn(state, match_id);
    }
}
