//! Action requests and responses at the engine boundary.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::cards::Card;
use crate::domain::events::GameEvent;
use crate::domain::state::{MatchStatus, TurnPhase, UserId};
use crate::engine::view::{PrivateView, PublicView};

/// One player action. Meld definitions are lists of card references; a card
/// reference names the exact physical card (suit, rank, deck index).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum Action {
    DrawStock,
    DrawDiscard,
    Open { melds: Vec<Vec<Card>> },
    LayMeld { cards: Vec<Card> },
    Attach { card: Card, meld_id: String },
    SubstituteJoker { meld_id: String, card: Card },
    Discard { card: Card },
    AutoPlay,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::DrawStock => "draw_stock",
            Action::DrawDiscard => "draw_discard",
            Action::Open { .. } => "open",
            Action::LayMeld { .. } => "lay_meld",
            Action::Attach { .. } => "attach",
            Action::SubstituteJoker { .. } => "substitute_joker",
            Action::Discard { .. } => "discard",
            Action::AutoPlay => "auto_play",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub game_id: String,
    pub player_id: UserId,
    /// Client-supplied nonce; duplicate deliveries short-circuit to the
    /// previously stored result.
    pub nonce: String,
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub declare_duplicate: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
}

impl ActionRequest {
    pub fn new(
        game_id: impl Into<String>,
        player_id: impl Into<UserId>,
        nonce: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            player_id: player_id.into(),
            nonce: nonce.into(),
            action,
            declare_duplicate: false,
            deadline: None,
        }
    }

    pub fn with_declare_duplicate(mut self) -> Self {
        self.declare_duplicate = true;
        self
    }

    pub fn with_deadline(mut self, deadline: OffsetDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub new_phase: TurnPhase,
    pub status: MatchStatus,
    pub public_view: PublicView,
    pub private_view: PrivateView,
    pub events: Vec<GameEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Suit;

    #[test]
    fn action_serializes_with_tag_and_payload() {
        let req = ActionRequest::new(
            "g1",
            "p1",
            "n1",
            Action::Discard {
                card: Card::new(Suit::Hearts, 8, 0),
            },
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "discard");
        assert_eq!(json["payload"]["card"], "8h0");
        assert_eq!(json["declareDuplicate"], false);

        let back: ActionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn unit_actions_roundtrip() {
        let req = ActionRequest::new("g1", "p1", "n2", Action::DrawStock);
        let json = serde_json::to_string(&req).unwrap();
        let back: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.action, Action::DrawStock);
    }
}
