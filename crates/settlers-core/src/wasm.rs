//! WebAssembly bindings for the browser client.
//!
//! The client renders the board itself; these bindings let it ask the same
//! questions the server asks of a game document.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::document::Game;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Read-only view of a game document
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmGame {
    game: Game,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmGame {
    /// Load a game document from its JSON text
    #[wasm_bindgen(constructor)]
    pub fn new(document_json: &str) -> Result<WasmGame, JsValue> {
        let game = Game::from_json(document_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid game document: {}", e)))?;
        Ok(WasmGame { game })
    }

    /// `init1`, `init2` or `play`
    #[wasm_bindgen(js_name = getStage)]
    pub fn get_stage(&self) -> String {
        self.game.stage().to_string()
    }

    /// The active player as JSON
    #[wasm_bindgen(js_name = getActivePlayer)]
    pub fn get_active_player(&self) -> String {
        self.game
            .active_player()
            .and_then(|p| serde_json::to_string(p).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    #[wasm_bindgen(js_name = isActivePlayer)]
    pub fn is_active_player(&self, user_id: i64) -> bool {
        self.game.is_active_player(user_id)
    }

    /// Roll the next turn must carry, if dice are involved
    #[wasm_bindgen(js_name = getNextRoll)]
    pub fn get_next_roll(&self) -> Option<u8> {
        self.game.expected_roll().flatten()
    }

    #[wasm_bindgen(js_name = hasTradeOffer)]
    pub fn has_trade_offer(&self) -> bool {
        self.game.has_trade_offer()
    }

    #[wasm_bindgen(js_name = getTurnCount)]
    pub fn get_turn_count(&self) -> usize {
        self.game.turn_count()
    }

    /// The document as JSON
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.game).unwrap_or_else(|_| "{}".to_string())
    }
}
