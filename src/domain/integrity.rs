//! Structural invariant checks over a full game state.
//!
//! Pure function returning a possibly-empty list of violations. Called after
//! every mutation in tests and simulation, and by the state codec on import.

use std::collections::HashMap;

use crate::domain::cards::{Card, Suit};
use crate::domain::deck::canonical_deck;
use crate::domain::melds::validate_meld;
use crate::domain::rules::TOTAL_CARDS;
use crate::domain::state::{GameState, MatchStatus, TurnPhase};

type CardKey = (Suit, u8, u8);

fn count_cards<'a>(cards: impl Iterator<Item = &'a Card>) -> HashMap<CardKey, usize> {
    let mut counts = HashMap::new();
    for c in cards {
        *counts.entry((c.suit, c.rank, c.deck)).or_insert(0usize) += 1;
    }
    counts
}

/// Validate all game-state invariants. Empty result means the state is sound.
pub fn validate_integrity(game: &GameState) -> Vec<String> {
    let mut violations = Vec::new();

    if game.status != MatchStatus::Playing {
        // Between hands or after the match, piles are in flux; only the
        // playing state is checked structurally.
        return violations;
    }

    // Card conservation: hands + stock + discard + table melds + the pending
    // joker in the turn scratch must form exactly the canonical multiset.
    let all_cards: Vec<&Card> = game
        .players
        .iter()
        .flat_map(|p| p.hand.iter())
        .chain(game.stock.iter())
        .chain(game.discard_pile.iter())
        .chain(game.table_melds.iter().flat_map(|m| m.cards.iter()))
        .chain(game.scratch.pending_joker.iter())
        .collect();

    if all_cards.len() != TOTAL_CARDS {
        violations.push(format!(
            "card count is {}, expected {TOTAL_CARDS}",
            all_cards.len()
        ));
    }

    let canonical = canonical_deck();
    let expected = count_cards(canonical.iter());
    let actual = count_cards(all_cards.into_iter());
    for (key, want) in &expected {
        let got = actual.get(key).copied().unwrap_or(0);
        if got != *want {
            violations.push(format!(
                "card ({:?},{},{}) appears {got} times, expected {want}",
                key.0, key.1, key.2
            ));
        }
    }
    for key in actual.keys() {
        if !expected.contains_key(key) {
            violations.push(format!(
                "unknown card ({:?},{},{}) in play",
                key.0, key.1, key.2
            ));
        }
    }

    // Every table meld must still be a valid sequence or combination.
    for meld in &game.table_melds {
        if let Err(code) = validate_meld(&meld.cards) {
            violations.push(format!("table meld {} is invalid: {code:?}", meld.meld_id));
        }
    }

    // Turn well-formedness.
    match game.get_player(&game.current_turn_user_id) {
        None => violations.push(format!(
            "current player {} is not seated",
            game.current_turn_user_id
        )),
        Some(p) if p.is_eliminated => violations.push(format!(
            "current player {} is eliminated",
            game.current_turn_user_id
        )),
        Some(_) => {}
    }

    // Phase must agree with whether a draw has happened this turn.
    match game.turn_phase {
        TurnPhase::AwaitDraw if game.scratch.has_drawn => {
            violations.push("awaiting draw but a draw was already taken".into());
        }
        TurnPhase::AwaitPlay | TurnPhase::AwaitDiscard if !game.scratch.has_drawn => {
            violations.push(format!(
                "phase {:?} reached without a draw this turn",
                game.turn_phase
            ));
        }
        _ => {}
    }

    // A withdrawn joker must be resolved before the discard.
    if game.scratch.pending_joker.is_some() && game.turn_phase != TurnPhase::AwaitPlay {
        violations.push("pending joker outside the play phase".into());
    }

    // Players who never opened cannot own table melds.
    for meld in &game.table_melds {
        if let Some(owner) = game.get_player(&meld.owner) {
            if !owner.has_opened && !owner.is_eliminated {
                violations.push(format!(
                    "player {} owns meld {} without having opened",
                    meld.owner, meld.meld_id
                ));
            }
        }
    }

    // Eliminated players hold no cards.
    for p in &game.players {
        if p.is_eliminated && !p.hand.is_empty() {
            violations.push(format!("eliminated player {} still holds cards", p.user_id));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::deck::deal;
    use crate::domain::state::{
        GameSettings, PlayerState, TurnScratch,
    };
    use crate::rng::{RngSource, SeededRng};

    fn dealt_game(players: &[&str]) -> GameState {
        let mut stock = canonical_deck();
        SeededRng::from_seed(11).shuffle_in_place(&mut stock);
        let (hands, first_discard) = deal(&mut stock, players.len()).unwrap();
        let mut seats: Vec<PlayerState> =
            players.iter().map(|id| PlayerState::new(*id)).collect();
        for (seat, hand) in seats.iter_mut().zip(hands) {
            seat.hand = hand;
        }
        GameState {
            game_id: "g".into(),
            lobby_code: String::new(),
            players: seats,
            stock,
            discard_pile: vec![first_discard],
            table_melds: Vec::new(),
            current_turn_user_id: players[0].to_string(),
            turn_phase: TurnPhase::AwaitDraw,
            round_number: 1,
            first_round_complete: false,
            round_starter_user_id: players[0].to_string(),
            dealer_user_id: players[0].to_string(),
            hand_number: 1,
            status: MatchStatus::Playing,
            settings: GameSettings::default(),
            rng_seed: 11,
            shuffle_count: 1,
            meld_seq: 0,
            scratch: TurnScratch::default(),
            last_nonce: None,
            last_outcome: None,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn fresh_deal_is_sound() {
        let game = dealt_game(&["a", "b", "c"]);
        assert_eq!(validate_integrity(&game), Vec::<String>::new());
    }

    #[test]
    fn losing_a_card_is_detected() {
        let mut game = dealt_game(&["a", "b"]);
        game.stock.pop();
        let violations = validate_integrity(&game);
        assert!(violations.iter().any(|v| v.contains("card count")));
    }

    #[test]
    fn duplicating_a_card_is_detected() {
        let mut game = dealt_game(&["a", "b"]);
        let dup = game.stock[0];
        game.get_player_mut("a").unwrap().hand[0] = dup;
        let violations = validate_integrity(&game);
        assert!(!violations.is_empty());
    }

    #[test]
    fn eliminated_current_player_is_detected() {
        let mut game = dealt_game(&["a", "b"]);
        let hand = std::mem::take(&mut game.get_player_mut("a").unwrap().hand);
        game.stock.extend(hand);
        game.get_player_mut("a").unwrap().is_eliminated = true;
        let violations = validate_integrity(&game);
        assert!(violations.iter().any(|v| v.contains("eliminated")));
    }

    #[test]
    fn phase_without_draw_is_detected() {
        let mut game = dealt_game(&["a", "b"]);
        game.turn_phase = TurnPhase::AwaitPlay;
        let violations = validate_integrity(&game);
        assert!(violations.iter().any(|v| v.contains("without a draw")));
    }
}
