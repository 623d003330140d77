//! Deterministic baseline bot and simulation driver.
//!
//! The bot is deliberately simple: draw from stock, open greedily as soon as
//! 40 points of melds exist in hand, lay and attach whatever fits, discard
//! the first legal card in a seeded shuffle order. Together with a seeded
//! engine this makes whole matches reproducible.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::cards::Card;
use crate::domain::integrity::validate_integrity;
use crate::domain::melds::{can_attach, validate_meld};
use crate::domain::state::{GameSettings, MatchStatus, TurnPhase, UserId};
use crate::engine::actions::{Action, ActionRequest, ActionResponse};
use crate::engine::GameEngine;
use crate::errors::domain::{EngineError, NotFoundKind};
use crate::rng::{RngSource, SeededRng};

/// All k-element index subsets of `0..n` in lexicographic order.
fn index_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if idx[i] != i + n - k {
                break;
            }
        }
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Every valid 3- or 4-card meld in the hand, as (indices, points).
fn valid_melds_in_hand(hand: &[Card]) -> Vec<(Vec<usize>, u16)> {
    let mut found = Vec::new();
    for size in [3usize, 4] {
        for combo in index_combinations(hand.len(), size) {
            let cards: Vec<Card> = combo.iter().map(|&i| hand[i]).collect();
            if let Ok(value) = validate_meld(&cards) {
                found.push((combo, value.points));
            }
        }
    }
    found
}

/// Greedy opening search: pick non-overlapping melds by descending points
/// until the threshold is met, keeping at least `keep_min` cards in hand for
/// the rest of the turn.
fn find_opening(hand: &[Card], threshold: u16, keep_min: usize) -> Option<Vec<Vec<Card>>> {
    let mut melds = valid_melds_in_hand(hand);
    melds.sort_by_key(|(_, points)| std::cmp::Reverse(*points));

    let mut used = vec![false; hand.len()];
    let mut selected: Vec<Vec<Card>> = Vec::new();
    let mut used_count = 0usize;
    let mut total: u16 = 0;

    for (indices, points) in melds {
        if indices.iter().any(|&i| used[i]) {
            continue;
        }
        if hand.len() - used_count - indices.len() < keep_min {
            continue;
        }
        for &i in &indices {
            used[i] = true;
        }
        used_count += indices.len();
        total += points;
        selected.push(indices.iter().map(|&i| hand[i]).collect());
        if total >= threshold {
            return Some(selected);
        }
    }
    None
}

pub struct BaselineBot {
    rng: SeededRng,
    nonce: u64,
}

impl BaselineBot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SeededRng::from_seed(seed),
            nonce: 0,
        }
    }

    async fn submit(
        &mut self,
        engine: &GameEngine,
        game_id: &str,
        user_id: &str,
        action: Action,
    ) -> Result<ActionResponse, EngineError> {
        self.nonce += 1;
        let req = ActionRequest::new(game_id, user_id, format!("bot-{}-{}", user_id, self.nonce), action);
        engine.submit(&req).await
    }

    /// Play one full turn for whoever is to act.
    pub async fn take_turn(
        &mut self,
        engine: &GameEngine,
        game_id: &str,
    ) -> Result<(), EngineError> {
        let mut game = engine.get_game(game_id).await?;
        let user_id = game.current_turn_user_id.clone();

        if game.turn_phase == TurnPhase::AwaitDraw {
            self.submit(engine, game_id, &user_id, Action::DrawStock).await?;
            game = engine.get_game(game_id).await?;
        }

        // Before the first round completes a closure is forbidden, so leave
        // enough cards that the discard cannot empty the hand.
        let keep_min = if game.first_round_complete { 1 } else { 2 };
        let threshold = game.settings.opening_threshold;

        let me = game
            .get_player(&user_id)
            .ok_or(EngineError::not_found(NotFoundKind::Player))?
            .clone();
        if !me.has_opened {
            if let Some(melds) = find_opening(&me.hand, threshold, keep_min) {
                self.submit(engine, game_id, &user_id, Action::Open { melds })
                    .await?;
                game = engine.get_game(game_id).await?;
            }
        }

        if game.turn_phase == TurnPhase::AwaitPlay {
            // Lay further melds while enough cards remain.
            loop {
                let hand = match game.get_player(&user_id) {
                    Some(p) => p.hand.clone(),
                    None => break,
                };
                let candidate = valid_melds_in_hand(&hand)
                    .into_iter()
                    .find(|(indices, _)| hand.len() - indices.len() >= keep_min);
                let Some((indices, _)) = candidate else { break };
                let cards: Vec<Card> = indices.iter().map(|&i| hand[i]).collect();
                self.submit(engine, game_id, &user_id, Action::LayMeld { cards })
                    .await?;
                game = engine.get_game(game_id).await?;
            }

            // Attach singles wherever they fit.
            loop {
                let hand = match game.get_player(&user_id) {
                    Some(p) => p.hand.clone(),
                    None => break,
                };
                if hand.len() <= keep_min {
                    break;
                }
                let candidate = hand.iter().find_map(|&card| {
                    game.table_melds
                        .iter()
                        .find(|meld| can_attach(card, meld).is_ok())
                        .map(|meld| (card, meld.meld_id.clone()))
                });
                let Some((card, meld_id)) = candidate else { break };
                self.submit(engine, game_id, &user_id, Action::Attach { card, meld_id })
                    .await?;
                game = engine.get_game(game_id).await?;
            }
        }

        // Discard: first legal card in a seeded shuffle order.
        let mut order = game
            .get_player(&user_id)
            .ok_or(EngineError::not_found(NotFoundKind::Player))?
            .hand
            .clone();
        self.rng.shuffle_in_place(&mut order);
        for card in order {
            match self
                .submit(engine, game_id, &user_id, Action::Discard { card })
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if e.is_validation() => {
                    debug!(card = %card, error = %e, "discard rejected, trying next");
                }
                Err(e) => return Err(e),
            }
        }

        // Every card was rejected (e.g. everything attaches): let the
        // engine's auto-play fallback force a discard.
        self.submit(engine, game_id, &user_id, Action::AutoPlay).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub winner: Option<UserId>,
    pub turns: u32,
    pub hands: u32,
    pub final_scores: BTreeMap<UserId, u32>,
}

/// Run one seeded match to completion (or the turn cap) over an in-memory
/// store, validating integrity after every turn.
pub async fn simulate_match(
    num_players: usize,
    seed: u64,
    max_turns: u32,
) -> Result<SimulationOutcome, EngineError> {
    let engine = GameEngine::in_memory();
    let player_ids: Vec<UserId> = (1..=num_players).map(|i| format!("p{i}")).collect();
    let game = engine
        .create_game(&player_ids, "sim", GameSettings::default(), Some(seed))
        .await?;
    let game_id = game.game_id.clone();
    let mut bot = BaselineBot::new(seed ^ 0x5EED_BA5E);

    let mut turns = 0u32;
    loop {
        let game = engine.get_game(&game_id).await?;
        if game.status == MatchStatus::Finished || turns >= max_turns {
            break;
        }
        let violations = validate_integrity(&game);
        if !violations.is_empty() {
            return Err(EngineError::CorruptState { violations });
        }
        bot.take_turn(&engine, &game_id).await?;
        turns += 1;
    }

    let game = engine.get_game(&game_id).await?;
    let winner = (game.status == MatchStatus::Finished)
        .then(|| game.active_players().map(|p| p.user_id.clone()).next())
        .flatten();
    Ok(SimulationOutcome {
        winner,
        turns,
        hands: game.hand_number,
        final_scores: game.scores(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Suit;
    use crate::domain::rules::KING;

    fn c(suit: Suit, rank: u8) -> Card {
        Card::new(suit, rank, 0)
    }

    #[test]
    fn index_combinations_counts() {
        assert_eq!(index_combinations(5, 3).len(), 10);
        assert_eq!(index_combinations(4, 4).len(), 1);
        assert_eq!(index_combinations(3, 4).len(), 0);
    }

    #[test]
    fn finds_a_simple_opening() {
        // K K K (30) + 10 J Q (30), plus filler
        let hand = vec![
            c(Suit::Hearts, KING),
            c(Suit::Diamonds, KING),
            c(Suit::Clubs, KING),
            c(Suit::Spades, 10),
            c(Suit::Spades, 11),
            c(Suit::Spades, 12),
            c(Suit::Hearts, 2),
            c(Suit::Diamonds, 5),
        ];
        let opening = find_opening(&hand, 40, 2).unwrap();
        let total: u16 = opening
            .iter()
            .map(|m| validate_meld(m).unwrap().points)
            .sum();
        assert!(total >= 40);
        let used: usize = opening.iter().map(Vec::len).sum();
        assert!(hand.len() - used >= 2);
    }

    #[test]
    fn respects_keep_min() {
        // Exactly two melds worth 60 but only 6 cards: keep_min 2 blocks one.
        let hand = vec![
            c(Suit::Hearts, KING),
            c(Suit::Diamonds, KING),
            c(Suit::Clubs, KING),
            c(Suit::Spades, 10),
            c(Suit::Spades, 11),
            c(Suit::Spades, 12),
        ];
        assert!(find_opening(&hand, 40, 2).is_none());
        assert!(find_opening(&hand, 30, 2).is_some());
    }

    #[test]
    fn no_opening_below_threshold() {
        let hand = vec![
            c(Suit::Hearts, 2),
            c(Suit::Diamonds, 2),
            c(Suit::Clubs, 2),
            c(Suit::Spades, 5),
            c(Suit::Hearts, 9),
        ];
        assert!(find_opening(&hand, 40, 1).is_none());
    }
}
