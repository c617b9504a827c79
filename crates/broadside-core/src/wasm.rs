//! WebAssembly bindings for the Broadside engine.
//!
//! Exposes a match against the scripted opponent to JavaScript. The page is
//! responsible for pacing: after a shot reports `scripted_turn_due`, it waits
//! as long as it likes and then calls `playScriptedTurn`.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::game::{Match, MatchMode, SEAT_ONE};
#[cfg(feature = "wasm")]
use crate::vessel::Placement;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed match against the computer
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmMatch {
    state: Match,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmMatch {
    /// Create a new match for the named player
    #[wasm_bindgen(constructor)]
    pub fn new(player_name: &str) -> Result<WasmMatch, JsValue> {
        let state = Match::new(player_name, MatchMode::Scripted)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmMatch { state })
    }

    /// Submit the player's fleet from a JSON array of placements
    #[wasm_bindgen(js_name = submitFleet)]
    pub fn submit_fleet(&mut self, placements_json: &str) -> Result<String, JsValue> {
        let placements: Vec<Placement> = serde_json::from_str(placements_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid placements: {}", e)))?;

        match self.state.set_fleet(SEAT_ONE, &placements) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Fire at a cell, returns the shot report JSON or an error
    #[wasm_bindgen(js_name = fire)]
    pub fn fire(&mut self, row: u8, col: u8) -> Result<String, JsValue> {
        match self.state.fire_shot(SEAT_ONE, row, col) {
            Ok(report) => Ok(serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Whether the computer owes a shot
    #[wasm_bindgen(js_name = isScriptedTurnDue)]
    pub fn is_scripted_turn_due(&self) -> bool {
        self.state.scripted_turn_due()
    }

    /// Let the computer take one shot
    #[wasm_bindgen(js_name = playScriptedTurn)]
    pub fn play_scripted_turn(&mut self) -> Result<String, JsValue> {
        match self.state.play_scripted_turn() {
            Ok(report) => Ok(serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// The player's view as JSON
    #[wasm_bindgen(js_name = getView)]
    pub fn get_view(&self) -> String {
        self.state
            .view(SEAT_ONE)
            .ok()
            .and_then(|view| serde_json::to_string(&view).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winning seat (if the match is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.state.winner()
    }

    /// Full snapshot for local save slots
    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> String {
        self.state.snapshot().unwrap_or_else(|_| "{}".to_string())
    }
}
