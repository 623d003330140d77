//! Hand lifecycle: dealing, turn advancement and closure handling.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::deck::{canonical_deck, deal};
use crate::domain::events::GameEvent;
use crate::domain::scoring::{apply_hand_scores, check_eliminations, check_winner};
use crate::domain::seed_derivation::derive_shuffle_seed;
use crate::domain::state::{GameState, MatchStatus, TurnPhase};
use crate::errors::domain::EngineError;
use crate::rng::{RngSource, SeededRng};

/// Deal the next hand: fresh shuffled deck, reset per-hand player state,
/// rotate the dealer past eliminated seats, hand the first turn to the seat
/// left of the dealer.
pub(super) fn start_hand(game: &mut GameState) -> Result<Vec<GameEvent>, EngineError> {
    let seed = derive_shuffle_seed(game.rng_seed, game.shuffle_count);
    game.shuffle_count += 1;
    let mut rng = SeededRng::from_seed(seed);
    let mut stock = canonical_deck();
    rng.shuffle_in_place(&mut stock);

    for p in game.players.iter_mut() {
        p.hand.clear();
        p.has_opened = false;
    }
    game.table_melds.clear();

    let num_active = game.active_count();
    let (hands, first_discard) = deal(&mut stock, num_active)?;
    let mut hands = hands.into_iter();
    for p in game.players.iter_mut().filter(|p| !p.is_eliminated) {
        if let Some(hand) = hands.next() {
            p.hand = hand;
        }
    }
    game.stock = stock;
    game.discard_pile = vec![first_discard];
    game.hand_number += 1;

    if game.hand_number > 1 {
        if let Some(next_dealer) = game.next_active_after(&game.dealer_user_id) {
            game.dealer_user_id = next_dealer;
        }
    }
    let first_player = game
        .next_active_after(&game.dealer_user_id)
        .unwrap_or_else(|| game.dealer_user_id.clone());
    game.current_turn_user_id = first_player.clone();
    game.round_starter_user_id = first_player.clone();
    game.round_number = 1;
    game.first_round_complete = false;
    game.turn_phase = TurnPhase::AwaitDraw;
    game.scratch.clear();
    game.status = MatchStatus::Playing;

    let hand_sizes: BTreeMap<_, _> = game
        .active_players()
        .map(|p| (p.user_id.clone(), p.hand.len()))
        .collect();
    info!(
        game_id = %game.game_id,
        hand_number = game.hand_number,
        dealer = %game.dealer_user_id,
        first_player = %first_player,
        "hand dealt"
    );
    Ok(vec![GameEvent::HandStart {
        hand_number: game.hand_number,
        dealer: game.dealer_user_id.clone(),
        first_player,
        hand_sizes,
    }])
}

/// Move the turn to the next non-eliminated seat. Wrapping back through the
/// seat that opened the hand completes a round; the first wrap sets
/// `first_round_complete`.
pub(super) fn advance_turn(game: &mut GameState) {
    game.scratch.clear();
    if let Some(next) = game.next_active_after(&game.current_turn_user_id) {
        game.current_turn_user_id = next;
    }
    game.turn_phase = TurnPhase::AwaitDraw;
    if game.current_turn_user_id == game.round_starter_user_id {
        game.round_number += 1;
        game.first_round_complete = true;
    }
}

/// The closing discard just emptied the closer's hand: score the hand, mark
/// eliminations, and either finish the match or deal the next hand.
pub(super) fn handle_closure(
    game: &mut GameState,
    closer_id: &str,
    events: &mut Vec<GameEvent>,
) -> Result<(), EngineError> {
    let in_hand = game.settings.close_in_hand_bonus && game.scratch.opened_this_turn;
    events.push(GameEvent::Closure {
        user_id: closer_id.to_string(),
        hand_number: game.hand_number,
        in_hand,
    });

    let hand_scores = apply_hand_scores(game, closer_id, in_hand);
    let threshold = game.settings.elimination_score;
    for user_id in check_eliminations(game) {
        let total_score = game.get_player(&user_id).map(|p| p.score).unwrap_or(0);
        events.push(GameEvent::Elimination {
            user_id,
            total_score,
            threshold,
        });
    }
    events.push(GameEvent::HandEnd {
        hand_number: game.hand_number,
        hand_scores,
        total_scores: game.scores(),
    });

    if let Some(winner) = check_winner(game) {
        game.status = MatchStatus::Finished;
        game.scratch.clear();
        info!(game_id = %game.game_id, winner = %winner, "match finished");
        events.push(GameEvent::MatchEnd {
            winner,
            final_scores: game.scores(),
        });
    } else {
        // `hand_end` is transient: the next hand is dealt within the same
        // commit, dealer rotated one seat.
        game.status = MatchStatus::HandEnd;
        events.extend(start_hand(game)?);
    }
    Ok(())
}
