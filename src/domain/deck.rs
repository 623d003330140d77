//! Deck operations: canonical deck construction, dealing, draws, and the
//! discard-pile reshuffle.
//!
//! Piles are plain vectors with the top at the end, so drawing is `pop`.

use crate::domain::cards::{Card, Suit};
use crate::domain::rules::{CARDS_PER_PLAYER, JOKERS_PER_DECK, MAX_PLAYERS, MIN_PLAYERS, NUM_DECKS};
use crate::errors::domain::EngineError;
use crate::rng::RngSource;

/// The full 108-card deck in canonical order: two 52-card decks plus two
/// jokers per deck.
pub fn canonical_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(crate::domain::rules::TOTAL_CARDS);
    for deck in 0..NUM_DECKS {
        for suit in Suit::ALL {
            for rank in 1..=13 {
                cards.push(Card::new(suit, rank, deck));
            }
        }
        for _ in 0..JOKERS_PER_DECK {
            cards.push(Card::joker(deck));
        }
    }
    cards
}

/// Deal 13 cards to each player one at a time in seating order, then pop one
/// card as the initial discard top. The remainder of `stock` is the draw pile.
pub fn deal(
    stock: &mut Vec<Card>,
    num_players: usize,
) -> Result<(Vec<Vec<Card>>, Card), EngineError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
        return Err(EngineError::InvalidPlayerCount { count: num_players });
    }
    let mut hands: Vec<Vec<Card>> = vec![Vec::with_capacity(CARDS_PER_PLAYER + 1); num_players];
    for _ in 0..CARDS_PER_PLAYER {
        for hand in hands.iter_mut() {
            let card = stock.pop().ok_or(EngineError::NoCards)?;
            hand.push(card);
        }
    }
    let first_discard = stock.pop().ok_or(EngineError::NoCards)?;
    Ok((hands, first_discard))
}

pub fn draw_top(pile: &mut Vec<Card>) -> Result<Card, EngineError> {
    pile.pop().ok_or(EngineError::NoCards)
}

/// When the stock runs out at the moment a player must draw, shuffle the
/// discard pile except its top into a new stock. The single remaining
/// discard stays on top of the emptied pile. Conservation is preserved.
pub fn reshuffle_discard(
    stock: &mut Vec<Card>,
    discard_pile: &mut Vec<Card>,
    rng: &mut impl RngSource,
) -> Result<usize, EngineError> {
    if discard_pile.len() < 2 {
        return Err(EngineError::NoCards);
    }
    let top = discard_pile.pop().expect("len checked above");
    stock.append(discard_pile);
    rng.shuffle_in_place(stock);
    discard_pile.push(top);
    Ok(stock.len())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::rules::TOTAL_CARDS;
    use crate::rng::SeededRng;

    #[test]
    fn canonical_deck_has_108_cards() {
        let deck = canonical_deck();
        assert_eq!(deck.len(), TOTAL_CARDS);
        assert_eq!(deck.iter().filter(|c| c.is_joker()).count(), 4);

        let mut counts: HashMap<(Suit, u8, u8), usize> = HashMap::new();
        for c in &deck {
            *counts.entry((c.suit, c.rank, c.deck)).or_default() += 1;
        }
        for ((suit, _, _), n) in counts {
            if suit == Suit::Joker {
                assert_eq!(n, 2); // two indistinguishable jokers per deck
            } else {
                assert_eq!(n, 1);
            }
        }
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let mut a = canonical_deck();
        let mut b = canonical_deck();
        SeededRng::from_seed(42).shuffle_in_place(&mut a);
        SeededRng::from_seed(42).shuffle_in_place(&mut b);
        assert_eq!(a, b);

        let mut c = canonical_deck();
        SeededRng::from_seed(43).shuffle_in_place(&mut c);
        assert_ne!(a, c);
    }

    #[test]
    fn deal_validates_player_count() {
        for n in [0, 1, 5] {
            let mut stock = canonical_deck();
            assert!(deal(&mut stock, n).is_err());
        }
    }

    #[test]
    fn deal_accounts_for_every_card() {
        for players in 2..=4usize {
            let mut stock = canonical_deck();
            SeededRng::from_seed(7).shuffle_in_place(&mut stock);
            let (hands, first_discard) = deal(&mut stock, players).unwrap();
            assert_eq!(hands.len(), players);
            for hand in &hands {
                assert_eq!(hand.len(), CARDS_PER_PLAYER);
            }
            let dealt: usize = hands.iter().map(Vec::len).sum();
            assert_eq!(dealt + 1 + stock.len(), TOTAL_CARDS);
            assert!(!hands.iter().flatten().any(|c| *c == first_discard));
        }
    }

    #[test]
    fn reshuffle_keeps_top_discard_and_all_cards() {
        let mut rng = SeededRng::from_seed(5);
        let mut stock: Vec<Card> = Vec::new();
        let mut discard: Vec<Card> = canonical_deck().into_iter().take(14).collect();
        let top = *discard.last().unwrap();
        let before: usize = discard.len();

        let moved = reshuffle_discard(&mut stock, &mut discard, &mut rng).unwrap();
        assert_eq!(moved, before - 1);
        assert_eq!(discard, vec![top]);
        assert_eq!(stock.len(), before - 1);
        assert!(!stock.contains(&top));
    }

    #[test]
    fn reshuffle_requires_two_discards() {
        let mut rng = SeededRng::from_seed(5);
        let mut stock: Vec<Card> = Vec::new();
        let mut discard = vec![Card::joker(0)];
        assert_eq!(
            reshuffle_discard(&mut stock, &mut discard, &mut rng),
            Err(EngineError::NoCards)
        );
    }
}
