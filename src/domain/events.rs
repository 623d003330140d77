//! Structured events emitted by committed actions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::state::UserId;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawSource {
    Stock,
    Discard,
}

/// One entry of the per-action event log. Serialized with a fixed `event`
/// tag so external consumers can dispatch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    HandStart {
        hand_number: u32,
        dealer: UserId,
        first_player: UserId,
        hand_sizes: BTreeMap<UserId, usize>,
    },
    Draw {
        user_id: UserId,
        source: DrawSource,
        /// Only present for discard draws; stock draws stay hidden.
        card: Option<Card>,
        stock_remaining: usize,
    },
    Reshuffle {
        cards_reshuffled: usize,
    },
    Open {
        user_id: UserId,
        melds: usize,
        points: u16,
        cards_remaining: usize,
    },
    LayMeld {
        user_id: UserId,
        meld_id: String,
        cards: Vec<Card>,
    },
    Attach {
        user_id: UserId,
        meld_id: String,
        card: Card,
    },
    SubstituteJoker {
        user_id: UserId,
        meld_id: String,
        card: Card,
    },
    Discard {
        user_id: UserId,
        card: Card,
        hand_remaining: usize,
    },
    Closure {
        user_id: UserId,
        hand_number: u32,
        in_hand: bool,
    },
    Elimination {
        user_id: UserId,
        total_score: u32,
        threshold: u32,
    },
    HandEnd {
        hand_number: u32,
        hand_scores: BTreeMap<UserId, u32>,
        total_scores: BTreeMap<UserId, u32>,
    },
    MatchEnd {
        winner: UserId,
        final_scores: BTreeMap<UserId, u32>,
    },
    InvalidAction {
        user_id: UserId,
        reason: String,
    },
}

impl GameEvent {
    /// The stable tag, for log filtering and tests.
    pub fn tag(&self) -> &'static str {
        match self {
            GameEvent::HandStart { .. } => "hand_start",
            GameEvent::Draw { .. } => "draw",
            GameEvent::Reshuffle { .. } => "reshuffle",
            GameEvent::Open { .. } => "open",
            GameEvent::LayMeld { .. } => "lay_meld",
            GameEvent::Attach { .. } => "attach",
            GameEvent::SubstituteJoker { .. } => "substitute_joker",
            GameEvent::Discard { .. } => "discard",
            GameEvent::Closure { .. } => "closure",
            GameEvent::Elimination { .. } => "elimination",
            GameEvent::HandEnd { .. } => "hand_end",
            GameEvent::MatchEnd { .. } => "match_end",
            GameEvent::InvalidAction { .. } => "invalid_action",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_tag() {
        let ev = GameEvent::Reshuffle {
            cards_reshuffled: 13,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "reshuffle");
        assert_eq!(json["cards_reshuffled"], 13);
        assert_eq!(ev.tag(), "reshuffle");
    }
}
