//! End-of-hand scoring, elimination detection and match-winner detection.

use std::collections::BTreeMap;

use crate::domain::cards::Card;
use crate::domain::state::{GameState, UserId};

/// Fixed penalty for an opponent who never opened when someone closes in
/// hand (variant).
const NEVER_OPENED_PENALTY: u32 = 100;

/// Sum of card values remaining in a hand. The ace always counts 11 here.
pub fn hand_points(hand: &[Card]) -> u32 {
    hand.iter().map(|c| c.points(false)).sum()
}

/// Apply scores after a closure. The closer receives 0; everyone else pays
/// the sum of their remaining cards. With `in_hand` (close-in-hand bonus
/// variant), opponents pay double, and an opponent who never opened pays a
/// fixed 100 instead. Returns the per-player hand scores just added.
pub fn apply_hand_scores(
    game: &mut GameState,
    closer_id: &str,
    in_hand: bool,
) -> BTreeMap<UserId, u32> {
    let mut added = BTreeMap::new();
    for player in game.players.iter_mut() {
        if player.is_eliminated {
            continue;
        }
        let hand_score = if player.user_id == closer_id {
            0
        } else if in_hand && !player.has_opened {
            NEVER_OPENED_PENALTY
        } else {
            let base = hand_points(&player.hand);
            if in_hand {
                base * 2
            } else {
                base
            }
        };
        player.score += hand_score;
        added.insert(player.user_id.clone(), hand_score);
    }
    added
}

/// Mark players whose cumulative score reached the elimination threshold.
/// Returns the newly eliminated ids in seating order.
pub fn check_eliminations(game: &mut GameState) -> Vec<UserId> {
    let threshold = game.settings.elimination_score;
    let mut newly = Vec::new();
    for player in game.players.iter_mut() {
        if !player.is_eliminated && player.score >= threshold {
            player.is_eliminated = true;
            newly.push(player.user_id.clone());
        }
    }
    newly
}

/// If exactly one non-eliminated player remains, the match is over.
pub fn check_winner(game: &GameState) -> Option<UserId> {
    let mut actives = game.active_players();
    let first = actives.next()?;
    if actives.next().is_none() {
        Some(first.user_id.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::cards::Suit;
    use crate::domain::rules::{ACE, KING};
    use crate::domain::state::{
        GameSettings, MatchStatus, PlayerState, TurnPhase, TurnScratch,
    };

    fn base_game(ids: &[&str]) -> GameState {
        GameState {
            game_id: "g".into(),
            lobby_code: String::new(),
            players: ids.iter().map(|id| PlayerState::new(*id)).collect(),
            stock: Vec::new(),
            discard_pile: Vec::new(),
            table_melds: Vec::new(),
            current_turn_user_id: ids[0].to_string(),
            turn_phase: TurnPhase::AwaitDraw,
            round_number: 1,
            first_round_complete: true,
            round_starter_user_id: ids[0].to_string(),
            dealer_user_id: ids[0].to_string(),
            hand_number: 1,
            status: MatchStatus::Playing,
            settings: GameSettings::default(),
            rng_seed: 0,
            shuffle_count: 0,
            meld_seq: 0,
            scratch: TurnScratch::default(),
            last_nonce: None,
            last_outcome: None,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn hand_points_values() {
        let hand = vec![
            Card::new(Suit::Spades, ACE, 0),
            Card::new(Suit::Hearts, KING, 0),
            Card::new(Suit::Clubs, 7, 1),
            Card::joker(0),
        ];
        assert_eq!(hand_points(&hand), 11 + 10 + 7 + 25);
    }

    #[test]
    fn closer_scores_zero_others_pay_their_hands() {
        let mut game = base_game(&["a", "b"]);
        game.get_player_mut("b").unwrap().hand = vec![
            Card::new(Suit::Hearts, KING, 0),
            Card::new(Suit::Hearts, 5, 0),
        ];
        let added = apply_hand_scores(&mut game, "a", false);
        assert_eq!(added["a"], 0);
        assert_eq!(added["b"], 15);
        assert_eq!(game.get_player("b").unwrap().score, 15);
    }

    #[test]
    fn in_hand_closure_doubles_and_penalises_unopened() {
        let mut game = base_game(&["a", "b", "c"]);
        {
            let b = game.get_player_mut("b").unwrap();
            b.has_opened = true;
            b.hand = vec![Card::new(Suit::Hearts, 9, 0)];
        }
        game.get_player_mut("c").unwrap().hand = vec![Card::new(Suit::Hearts, 2, 0)];
        let added = apply_hand_scores(&mut game, "a", true);
        assert_eq!(added["b"], 18); // doubled
        assert_eq!(added["c"], 100); // never opened
    }

    #[test]
    fn elimination_and_winner_detection() {
        let mut game = base_game(&["a", "b", "c"]);
        game.get_player_mut("a").unwrap().score = 101;
        game.get_player_mut("b").unwrap().score = 100;
        game.get_player_mut("c").unwrap().score = 120;

        let out = check_eliminations(&mut game);
        assert_eq!(out, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(check_winner(&game).unwrap(), "b");
    }

    #[test]
    fn no_winner_while_two_remain() {
        let mut game = base_game(&["a", "b", "c"]);
        game.get_player_mut("c").unwrap().is_eliminated = true;
        assert_eq!(check_winner(&game), None);
    }

    #[test]
    fn scores_never_decrease() {
        let mut game = base_game(&["a", "b"]);
        game.get_player_mut("a").unwrap().score = 40;
        game.get_player_mut("b").unwrap().score = 55;
        apply_hand_scores(&mut game, "a", false);
        assert_eq!(game.get_player("a").unwrap().score, 40);
        assert!(game.get_player("b").unwrap().score >= 55);
    }
}
