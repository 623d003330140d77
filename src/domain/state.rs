//! Game state containers and seat helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::cards::Card;
use crate::domain::events::GameEvent;
use crate::domain::melds::MeldKind;
use crate::domain::rules::{DEFAULT_ELIMINATION_SCORE, OPENING_THRESHOLD};

pub type UserId = String;

/// States of the turn state machine. `TURN_END` is transient and never
/// persisted: a successful discard either advances the turn back to
/// `AwaitDraw` for the next seat or closes the hand.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Initial state on entering a turn.
    AwaitDraw,
    /// Optional play actions may be chained here; only reachable once the
    /// acting player has opened (or opens this turn).
    AwaitPlay,
    /// Mandatory terminal-of-turn state.
    AwaitDiscard,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Playing,
    HandEnd,
    Finished,
}

/// Per-game variant settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub elimination_score: u32,
    pub opening_threshold: u16,
    /// Permits drawing from discard before opening when the card is used in
    /// the opening move of the same turn.
    pub open_with_discard: bool,
    /// Doubles opponents' hand scores when the closer lays down everything
    /// in a single turn; opponents who never opened pay a fixed 100.
    pub close_in_hand_bonus: bool,
    /// Jokers may not contribute to the opening unless clean melds alone
    /// already reach the threshold.
    pub opening_without_joker: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            elimination_score: DEFAULT_ELIMINATION_SCORE,
            opening_threshold: OPENING_THRESHOLD,
            open_with_discard: false,
            close_in_hand_bonus: false,
            opening_without_joker: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub user_id: UserId,
    /// Ordered hand; the order is the player's preferred display order and
    /// is preserved across actions.
    pub hand: Vec<Card>,
    pub has_opened: bool,
    pub is_eliminated: bool,
    /// Cumulative score across hands.
    pub score: u32,
}

impl PlayerState {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            hand: Vec::new(),
            has_opened: false,
            is_eliminated: false,
            score: 0,
        }
    }
}

/// A meld on the table. The owner is the player who first laid it down and
/// is used only for display; anybody who has opened may attach to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeld {
    pub meld_id: String,
    pub owner: UserId,
    pub kind: MeldKind,
    pub cards: Vec<Card>,
}

impl TableMeld {
    pub fn has_joker(&self) -> bool {
        self.cards.iter().any(|c| c.is_joker())
    }
}

/// Per-turn scratch: "must be used this turn" obligations and phase-entry
/// facts. Cleared on turn end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnScratch {
    /// The card just drawn from the discard pile this turn, if any.
    pub drawn_from_discard: Option<Card>,
    /// A joker withdrawn from a table meld, to be consumed by a lay or
    /// attach before the turn can end.
    pub pending_joker: Option<Card>,
    pub has_drawn: bool,
    pub opened_this_turn: bool,
    /// True while the opening action itself left exactly one card, i.e. the
    /// next discard would be a closure "in hand".
    pub in_hand_closure_ready: bool,
}

impl TurnScratch {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Result of the last applied action, kept on the document so duplicate
/// deliveries with the same nonce can be answered without re-applying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOutcome {
    pub new_phase: TurnPhase,
    pub events: Vec<GameEvent>,
}

/// Complete state of one Scala 40 match; maps to a single stored document.
/// The opaque version token lives beside the document in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: String,
    pub lobby_code: String,
    /// Seating order, fixed for the duration of the match.
    pub players: Vec<PlayerState>,
    /// Draw stock; top = last element.
    pub stock: Vec<Card>,
    /// Discard pile; top = last element, only the top is accessible.
    pub discard_pile: Vec<Card>,
    pub table_melds: Vec<TableMeld>,
    pub current_turn_user_id: UserId,
    pub turn_phase: TurnPhase,
    /// Full trips around the table within the current hand, 1-based.
    pub round_number: u32,
    pub first_round_complete: bool,
    /// Who acted first this hand; the wrap back to this seat sets
    /// `first_round_complete`.
    pub round_starter_user_id: UserId,
    pub dealer_user_id: UserId,
    /// Deal-to-closure cycles played so far, 1-based.
    pub hand_number: u32,
    pub status: MatchStatus,
    pub settings: GameSettings,
    /// Per-game seed; every shuffle consumes a sub-seed derived from it so
    /// the whole history is reproducible.
    pub rng_seed: u64,
    /// Shuffles performed so far (deals and reshuffles).
    pub shuffle_count: u32,
    /// Monotonic counter behind table-meld ids, so replays of the same
    /// action history produce identical documents.
    #[serde(default)]
    pub meld_seq: u32,
    pub scratch: TurnScratch,
    pub last_nonce: Option<String>,
    pub last_outcome: Option<StoredOutcome>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl GameState {
    pub fn new_game_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn get_player(&self, user_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn get_player_mut(&mut self, user_id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| !p.is_eliminated)
    }

    pub fn active_ids(&self) -> Vec<UserId> {
        self.active_players().map(|p| p.user_id.clone()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    /// Next non-eliminated seat after `user_id` in seating order.
    pub fn next_active_after(&self, user_id: &str) -> Option<UserId> {
        let start = self.players.iter().position(|p| p.user_id == user_id)?;
        let n = self.players.len();
        (1..=n)
            .map(|step| &self.players[(start + step) % n])
            .find(|p| !p.is_eliminated)
            .map(|p| p.user_id.clone())
    }

    pub fn find_meld(&self, meld_id: &str) -> Option<&TableMeld> {
        self.table_melds.iter().find(|m| m.meld_id == meld_id)
    }

    pub fn find_meld_mut(&mut self, meld_id: &str) -> Option<&mut TableMeld> {
        self.table_melds.iter_mut().find(|m| m.meld_id == meld_id)
    }

    pub fn discard_top(&self) -> Option<Card> {
        self.discard_pile.last().copied()
    }

    /// Cumulative scores keyed by player id.
    pub fn scores(&self) -> BTreeMap<UserId, u32> {
        self.players
            .iter()
            .map(|p| (p.user_id.clone(), p.score))
            .collect()
    }

    pub fn next_meld_id(&mut self) -> String {
        self.meld_seq += 1;
        format!("m{}", self.meld_seq)
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}
