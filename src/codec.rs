//! State codec: export and import of complete game states as a stable,
//! self-describing document.
//!
//! Import validates the schema version and runs the integrity checker before
//! handing the game back; any violation fails with `CorruptState`.

use serde::{Deserialize, Serialize};

use crate::domain::integrity::validate_integrity;
use crate::domain::state::GameState;
use crate::errors::domain::EngineError;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    pub schema_version: u32,
    pub game: GameState,
}

pub fn export_state(game: &GameState) -> GameDocument {
    GameDocument {
        schema_version: SCHEMA_VERSION,
        game: game.clone(),
    }
}

pub fn export_json(game: &GameState) -> Result<String, EngineError> {
    serde_json::to_string_pretty(&export_state(game)).map_err(|e| EngineError::Unavailable {
        detail: format!("serialization failed: {e}"),
    })
}

pub fn import_state(doc: GameDocument) -> Result<GameState, EngineError> {
    if doc.schema_version != SCHEMA_VERSION {
        return Err(EngineError::CorruptState {
            violations: vec![format!(
                "unsupported schema version {} (expected {SCHEMA_VERSION})",
                doc.schema_version
            )],
        });
    }
    let violations = validate_integrity(&doc.game);
    if !violations.is_empty() {
        return Err(EngineError::CorruptState { violations });
    }
    Ok(doc.game)
}

pub fn import_json(json: &str) -> Result<GameState, EngineError> {
    let doc: GameDocument = serde_json::from_str(json).map_err(|e| EngineError::CorruptState {
        violations: vec![format!("undecodable document: {e}")],
    })?;
    import_state(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deck::{canonical_deck, deal};
    use crate::domain::state::{
        GameSettings, MatchStatus, PlayerState, TurnPhase, TurnScratch,
    };
    use crate::rng::{RngSource, SeededRng};
    use time::OffsetDateTime;

    fn playing_game() -> GameState {
        let mut stock = canonical_deck();
        SeededRng::from_seed(21).shuffle_in_place(&mut stock);
        let (hands, first_discard) = deal(&mut stock, 2).unwrap();
        let mut players = vec![PlayerState::new("a"), PlayerState::new("b")];
        for (p, h) in players.iter_mut().zip(hands) {
            p.hand = h;
        }
        GameState {
            game_id: "g-codec".into(),
            lobby_code: "ABCDEF".into(),
            players,
            stock,
            discard_pile: vec![first_discard],
            table_melds: Vec::new(),
            current_turn_user_id: "a".into(),
            turn_phase: TurnPhase::AwaitDraw,
            round_number: 1,
            first_round_complete: false,
            round_starter_user_id: "a".into(),
            dealer_user_id: "a".into(),
            hand_number: 1,
            status: MatchStatus::Playing,
            settings: GameSettings::default(),
            rng_seed: 21,
            shuffle_count: 1,
            meld_seq: 0,
            scratch: TurnScratch::default(),
            last_nonce: None,
            last_outcome: None,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn export_import_is_identity() {
        let game = playing_game();
        let json = export_json(&game).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back, game);
    }

    #[test]
    fn import_rejects_wrong_schema_version() {
        let mut doc = export_state(&playing_game());
        doc.schema_version = 99;
        assert!(matches!(
            import_state(doc),
            Err(EngineError::CorruptState { .. })
        ));
    }

    #[test]
    fn import_rejects_broken_conservation() {
        let mut game = playing_game();
        game.stock.pop();
        let doc = export_state(&game);
        match import_state(doc) {
            Err(EngineError::CorruptState { violations }) => {
                assert!(violations.iter().any(|v| v.contains("card count")));
            }
            other => panic!("expected CorruptState, got {other:?}"),
        }
    }

    #[test]
    fn import_rejects_garbage_json() {
        assert!(matches!(
            import_json("{\"nope\": true}"),
            Err(EngineError::CorruptState { .. })
        ));
    }

    #[test]
    fn document_is_self_describing() {
        let json = export_json(&playing_game()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schemaVersion"], 1);
        assert!(value["game"]["players"].is_array());
        assert!(value["game"]["discardPile"].is_array());
    }
}
