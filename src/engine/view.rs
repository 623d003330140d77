//! Public and private projections of a game state.

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::state::{GameState, MatchStatus, TableMeld, TurnPhase, UserId};

/// What every player in the game may see about a seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub user_id: UserId,
    pub hand_size: usize,
    pub has_opened: bool,
    pub is_eliminated: bool,
    pub score: u32,
}

/// Everything visible to all players: hands stay hidden, only their sizes
/// and the table itself are shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicView {
    pub game_id: String,
    pub status: MatchStatus,
    pub hand_number: u32,
    pub round_number: u32,
    pub first_round_complete: bool,
    pub current_turn_user_id: UserId,
    pub turn_phase: TurnPhase,
    pub players: Vec<SeatView>,
    pub table_melds: Vec<TableMeld>,
    pub discard_top: Option<Card>,
    pub stock_size: usize,
}

/// Visible only to the requesting player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateView {
    pub user_id: UserId,
    pub hand: Vec<Card>,
}

pub fn public_view(game: &GameState) -> PublicView {
    PublicView {
        game_id: game.game_id.clone(),
        status: game.status,
        hand_number: game.hand_number,
        round_number: game.round_number,
        first_round_complete: game.first_round_complete,
        current_turn_user_id: game.current_turn_user_id.clone(),
        turn_phase: game.turn_phase,
        players: game
            .players
            .iter()
            .map(|p| SeatView {
                user_id: p.user_id.clone(),
                hand_size: p.hand.len(),
                has_opened: p.has_opened,
                is_eliminated: p.is_eliminated,
                score: p.score,
            })
            .collect(),
        table_melds: game.table_melds.clone(),
        discard_top: game.discard_top(),
        stock_size: game.stock.len(),
    }
}

pub fn private_view(game: &GameState, user_id: &str) -> PrivateView {
    PrivateView {
        user_id: user_id.to_string(),
        hand: game
            .get_player(user_id)
            .map(|p| p.hand.clone())
            .unwrap_or_default(),
    }
}
