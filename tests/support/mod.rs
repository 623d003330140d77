//! Test helpers: a game-state builder that allocates cards out of the
//! canonical deck (whatever is left becomes the stock, so conservation holds
//! by construction) and engine wiring over in-memory stores.

use std::sync::Arc;

use time::OffsetDateTime;

use scala_quaranta::domain::cards::{Card, Suit};
use scala_quaranta::domain::deck::canonical_deck;
use scala_quaranta::domain::melds::validate_meld;
use scala_quaranta::domain::state::{
    GameSettings, GameState, MatchStatus, PlayerState, TableMeld, TurnPhase, TurnScratch,
};
use scala_quaranta::domain::users::UserProfile;
use scala_quaranta::engine::actions::{Action, ActionRequest};
use scala_quaranta::engine::{seed_game, GameEngine};
use scala_quaranta::store::InMemoryStore;

pub fn c(suit: Suit, rank: u8) -> Card {
    Card::new(suit, rank, 0)
}

pub fn c1(suit: Suit, rank: u8) -> Card {
    Card::new(suit, rank, 1)
}

/// A run of consecutive ranks in one suit and deck.
pub fn run(suit: Suit, deck: u8, ranks: std::ops::RangeInclusive<u8>) -> Vec<Card> {
    ranks.map(|r| Card::new(suit, r, deck)).collect()
}

pub fn req(game_id: &str, player: &str, nonce: &str, action: Action) -> ActionRequest {
    ActionRequest::new(game_id, player, nonce, action)
}

struct SeatSpec {
    user_id: String,
    hand: Vec<Card>,
    opened: bool,
    eliminated: bool,
    score: u32,
}

pub struct StateBuilder {
    seats: Vec<SeatSpec>,
    melds: Vec<(String, Vec<Card>)>,
    discard: Vec<Card>,
    current: String,
    phase: TurnPhase,
    first_round_complete: bool,
    settings: GameSettings,
    drawn_from_discard: Option<Card>,
    seed: u64,
}

impl StateBuilder {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            seats: ids
                .iter()
                .map(|id| SeatSpec {
                    user_id: id.to_string(),
                    hand: Vec::new(),
                    opened: false,
                    eliminated: false,
                    score: 0,
                })
                .collect(),
            melds: Vec::new(),
            discard: Vec::new(),
            current: ids[0].to_string(),
            phase: TurnPhase::AwaitDraw,
            first_round_complete: true,
            settings: GameSettings::default(),
            drawn_from_discard: None,
            seed: 7,
        }
    }

    fn seat_mut(&mut self, id: &str) -> &mut SeatSpec {
        self.seats
            .iter_mut()
            .find(|s| s.user_id == id)
            .expect("unknown seat in builder")
    }

    pub fn hand(mut self, id: &str, cards: Vec<Card>) -> Self {
        self.seat_mut(id).hand = cards;
        self
    }

    pub fn opened(mut self, id: &str) -> Self {
        self.seat_mut(id).opened = true;
        self
    }

    pub fn eliminated(mut self, id: &str) -> Self {
        self.seat_mut(id).eliminated = true;
        self
    }

    pub fn score(mut self, id: &str, score: u32) -> Self {
        self.seat_mut(id).score = score;
        self
    }

    pub fn meld(mut self, owner: &str, cards: Vec<Card>) -> Self {
        self.melds.push((owner.to_string(), cards));
        self
    }

    /// Discard pile from bottom to top.
    pub fn discard_pile(mut self, cards: Vec<Card>) -> Self {
        self.discard = cards;
        self
    }

    pub fn current(mut self, id: &str) -> Self {
        self.current = id.to_string();
        self
    }

    pub fn phase(mut self, phase: TurnPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn first_round_complete(mut self, value: bool) -> Self {
        self.first_round_complete = value;
        self
    }

    pub fn settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Mark `card` as drawn from the discard pile this turn. The card must
    /// also be placed in the drawing player's hand.
    pub fn drawn_from_discard(mut self, card: Card) -> Self {
        self.drawn_from_discard = Some(card);
        self
    }

    pub fn build(self) -> GameState {
        let mut pool = canonical_deck();
        let mut take = |card: &Card| {
            let pos = pool
                .iter()
                .position(|c| c == card)
                .unwrap_or_else(|| panic!("card {card} allocated twice or unknown"));
            pool.remove(pos);
        };

        for seat in &self.seats {
            for card in &seat.hand {
                take(card);
            }
        }
        for (_, cards) in &self.melds {
            for card in cards {
                take(card);
            }
        }
        for card in &self.discard {
            take(card);
        }

        let mut meld_seq = 0u32;
        let table_melds: Vec<TableMeld> = self
            .melds
            .iter()
            .map(|(owner, cards)| {
                meld_seq += 1;
                let kind = validate_meld(cards).expect("builder meld must be valid").kind;
                TableMeld {
                    meld_id: format!("m{meld_seq}"),
                    owner: owner.clone(),
                    kind,
                    cards: cards.clone(),
                }
            })
            .collect();

        let players: Vec<PlayerState> = self
            .seats
            .into_iter()
            .map(|s| PlayerState {
                user_id: s.user_id,
                hand: s.hand,
                has_opened: s.opened,
                is_eliminated: s.eliminated,
                score: s.score,
            })
            .collect();

        let scratch = TurnScratch {
            drawn_from_discard: self.drawn_from_discard,
            pending_joker: None,
            has_drawn: self.phase != TurnPhase::AwaitDraw,
            opened_this_turn: false,
            in_hand_closure_ready: false,
        };

        GameState {
            game_id: "g-test".into(),
            lobby_code: "TEST".into(),
            players,
            stock: pool,
            discard_pile: self.discard,
            table_melds,
            current_turn_user_id: self.current.clone(),
            turn_phase: self.phase,
            round_number: if self.first_round_complete { 2 } else { 1 },
            first_round_complete: self.first_round_complete,
            round_starter_user_id: self.current,
            dealer_user_id: "never-used".into(),
            hand_number: 1,
            status: MatchStatus::Playing,
            settings: self.settings,
            rng_seed: self.seed,
            shuffle_count: 1,
            meld_seq,
            scratch,
            last_nonce: None,
            last_outcome: None,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

pub struct TestHarness {
    pub engine: GameEngine,
    pub users: Arc<InMemoryStore<UserProfile>>,
    pub game_id: String,
}

/// Seed an engine over fresh in-memory stores with a prepared game.
pub async fn harness_with(mut game: GameState) -> TestHarness {
    // The builder leaves the dealer seat as a placeholder.
    game.dealer_user_id = game.players[0].user_id.clone();
    let games: Arc<InMemoryStore<GameState>> = Arc::new(InMemoryStore::new());
    let users: Arc<InMemoryStore<UserProfile>> = Arc::new(InMemoryStore::new());
    let game_id = game.game_id.clone();
    seed_game(games.as_ref(), game).await.expect("seed game");
    TestHarness {
        engine: GameEngine::new(games, users.clone()),
        users,
        game_id,
    }
}
