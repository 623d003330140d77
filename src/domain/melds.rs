//! Meld validation: sequences, combinations, opening thresholds, attach
//! legality and joker substitution.
//!
//! A single resolver powers everything. Resolving a sequence assigns every
//! card (joker included) a slot value between 1 and 14, where 1 is an ace
//! counted low and 14 an ace counted high; validity, point totals, attach
//! checks and joker stand-in lookups all read from the resolved slots.

use serde::{Deserialize, Serialize};

use crate::domain::cards::{Card, Suit};
use crate::domain::rules::{
    ACE, ACE_HIGH, ACE_POINTS_HIGH, ACE_POINTS_LOW, COMBINATION_MAX_LEN, COMBINATION_MIN_LEN,
    FACE_POINTS, JACK, KING, SEQUENCE_MAX_LEN, SEQUENCE_MIN_LEN,
};
use crate::domain::state::TableMeld;
use crate::errors::domain::{EngineError, MeldErrorCode};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeldKind {
    Sequence,
    Combination,
}

/// Outcome of a successful validation: what the cards form and how many
/// points they are worth on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeldValue {
    pub kind: MeldKind,
    pub points: u16,
}

/// Point value of a sequence slot. A joker occupying a slot is worth the
/// rank it fills.
fn slot_points(value: u8) -> u16 {
    match value {
        v if v == ACE => ACE_POINTS_LOW as u16,
        v if v == ACE_HIGH => ACE_POINTS_HIGH as u16,
        v if v >= JACK => FACE_POINTS as u16,
        v => v as u16,
    }
}

/// Point value of a rank inside a combination (joker takes the common rank).
fn rank_points(rank: u8) -> u16 {
    match rank {
        r if r == ACE => ACE_POINTS_HIGH as u16,
        r if r >= JACK => FACE_POINTS as u16,
        r => r as u16,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedSequence {
    pub suit: Suit,
    /// (slot value, occupying card) in ascending slot order.
    pub slots: Vec<(u8, Card)>,
    pub points: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedCombination {
    pub rank: u8,
    pub suits: Vec<Suit>,
    pub points: u16,
}

fn partition(cards: &[Card]) -> (Vec<Card>, Vec<Card>) {
    cards.iter().partition(|c| c.is_joker())
}

/// Try to lay the regulars (plus at most one joker) out as consecutive
/// slots, with the ace counted high or low. Returns the slot assignment or
/// None if this placement does not fit.
fn try_placement(regulars: &[Card], joker: Option<Card>, ace_high: bool) -> Option<Vec<(u8, Card)>> {
    let mut slots: Vec<(u8, Card)> = regulars
        .iter()
        .map(|&c| {
            let v = if ace_high && c.rank == ACE { ACE_HIGH } else { c.rank };
            (v, c)
        })
        .collect();
    slots.sort_by_key(|s| s.0);

    let mut joker_slot: Option<u8> = None;
    for i in 1..slots.len() {
        match slots[i].0 - slots[i - 1].0 {
            1 => {}
            2 if joker.is_some() && joker_slot.is_none() => joker_slot = Some(slots[i - 1].0 + 1),
            _ => return None,
        }
    }

    if let Some(j) = joker {
        let slot = match joker_slot {
            Some(v) => v,
            // No internal gap: the joker extends an end, high end preferred.
            None => {
                let last = slots.last().map(|s| s.0)?;
                let first = slots[0].0;
                if last < ACE_HIGH {
                    last + 1
                } else if first > ACE {
                    first - 1
                } else {
                    return None;
                }
            }
        };
        slots.push((slot, j));
        slots.sort_by_key(|s| s.0);
    }
    Some(slots)
}

pub(crate) fn resolve_sequence(cards: &[Card]) -> Result<ResolvedSequence, MeldErrorCode> {
    if cards.len() < SEQUENCE_MIN_LEN {
        return Err(MeldErrorCode::TooShort);
    }
    if cards.len() > SEQUENCE_MAX_LEN {
        return Err(MeldErrorCode::TooLong);
    }

    let (jokers, regulars) = partition(cards);
    if jokers.len() > 1 {
        return Err(MeldErrorCode::MultipleJokers);
    }
    if regulars.is_empty() {
        return Err(MeldErrorCode::OnlyJokers);
    }

    let suit = regulars[0].suit;
    if regulars.iter().any(|c| c.suit != suit) {
        return Err(MeldErrorCode::MixedSuitsInSequence);
    }

    let mut ranks: Vec<u8> = regulars.iter().map(|c| c.rank).collect();
    ranks.sort_unstable();
    if ranks.windows(2).any(|w| w[0] == w[1]) {
        return Err(MeldErrorCode::NonConsecutive);
    }

    let has_ace = ranks.contains(&ACE);
    let joker = jokers.first().copied();
    for ace_high in [false, true] {
        if ace_high && !has_ace {
            break;
        }
        if let Some(slots) = try_placement(&regulars, joker, ace_high) {
            let points = slots.iter().map(|(v, _)| slot_points(*v)).sum();
            return Ok(ResolvedSequence { suit, slots, points });
        }
    }

    // Both ace placements failed. A,2 and K together means a wrap attempt.
    if has_ace && ranks.contains(&2) && ranks.contains(&KING) {
        Err(MeldErrorCode::Wrap)
    } else {
        Err(MeldErrorCode::NonConsecutive)
    }
}

pub(crate) fn resolve_combination(cards: &[Card]) -> Result<ResolvedCombination, MeldErrorCode> {
    if cards.len() < COMBINATION_MIN_LEN {
        return Err(MeldErrorCode::TooShort);
    }
    if cards.len() > COMBINATION_MAX_LEN {
        return Err(MeldErrorCode::TooLong);
    }

    let (jokers, regulars) = partition(cards);
    if jokers.len() > 1 {
        return Err(MeldErrorCode::MultipleJokers);
    }
    if regulars.is_empty() {
        return Err(MeldErrorCode::OnlyJokers);
    }

    let rank = regulars[0].rank;
    if regulars.iter().any(|c| c.rank != rank) {
        return Err(MeldErrorCode::NonConsecutive);
    }

    // Two decks are in play, but a combination may not duplicate a suit.
    let mut suits: Vec<Suit> = regulars.iter().map(|c| c.suit).collect();
    suits.sort_unstable();
    if suits.windows(2).any(|w| w[0] == w[1]) {
        return Err(MeldErrorCode::SameSuitInCombination);
    }

    let mut points: u16 = regulars.iter().map(|c| rank_points(c.rank)).sum();
    if !jokers.is_empty() {
        points += rank_points(rank);
    }
    Ok(ResolvedCombination { rank, suits, points })
}

/// Validate cards as a sequence first, then as a combination.
pub fn validate_meld(cards: &[Card]) -> Result<MeldValue, MeldErrorCode> {
    let seq_err = match resolve_sequence(cards) {
        Ok(seq) => {
            return Ok(MeldValue {
                kind: MeldKind::Sequence,
                points: seq.points,
            })
        }
        Err(e) => e,
    };
    let comb_err = match resolve_combination(cards) {
        Ok(comb) => {
            return Ok(MeldValue {
                kind: MeldKind::Combination,
                points: comb.points,
            })
        }
        Err(e) => e,
    };

    // Report the error of whichever shape the cards were closer to.
    let (_, regulars) = partition(cards);
    let looks_like_combination =
        !regulars.is_empty() && regulars.iter().all(|c| c.rank == regulars[0].rank);
    Err(if looks_like_combination { comb_err } else { seq_err })
}

/// Opening validation: every meld individually valid and the point total at
/// or above the threshold. With the no-joker variant on, melds containing a
/// joker only count once clean melds alone reach the threshold.
pub fn validate_opening(
    melds: &[Vec<Card>],
    threshold: u16,
    opening_without_joker: bool,
) -> Result<u16, EngineError> {
    if melds.is_empty() {
        return Err(EngineError::illegal_meld(MeldErrorCode::TooShort));
    }

    let mut total: u16 = 0;
    let mut clean: u16 = 0;
    let mut any_joker = false;
    for cards in melds {
        let value = validate_meld(cards).map_err(EngineError::illegal_meld)?;
        let has_joker = cards.iter().any(|c| c.is_joker());
        any_joker |= has_joker;
        total += value.points;
        if !has_joker {
            clean += value.points;
        }
    }

    if opening_without_joker && any_joker && clean < threshold {
        return Err(EngineError::OpeningBelowThreshold { points: clean });
    }
    if total < threshold {
        return Err(EngineError::OpeningBelowThreshold { points: total });
    }
    Ok(total)
}

/// Attach legality: adding `card` to the meld must yield another valid meld
/// of the same kind. The at-most-one-joker constraint is enforced by the
/// resolvers.
pub fn can_attach(card: Card, meld: &TableMeld) -> Result<MeldValue, MeldErrorCode> {
    let mut cards = meld.cards.clone();
    cards.push(card);
    match meld.kind {
        MeldKind::Sequence => resolve_sequence(&cards).map(|s| MeldValue {
            kind: MeldKind::Sequence,
            points: s.points,
        }),
        MeldKind::Combination => resolve_combination(&cards).map(|c| MeldValue {
            kind: MeldKind::Combination,
            points: c.points,
        }),
    }
}

/// Canonical ascending display order for a valid sequence.
pub fn sequence_display_order(cards: &[Card]) -> Result<Vec<Card>, MeldErrorCode> {
    let seq = resolve_sequence(cards)?;
    Ok(seq.slots.into_iter().map(|(_, c)| c).collect())
}

/// Joker substitution legality: the held card must be exactly the card
/// whose position the joker occupies (deck index immaterial), and swapping
/// it in must leave the meld valid.
pub fn can_substitute_joker(card: Card, meld: &TableMeld) -> Result<(), MeldErrorCode> {
    if card.is_joker() || !meld.has_joker() {
        return Err(MeldErrorCode::UnknownCard);
    }
    match meld.kind {
        MeldKind::Combination => {
            let comb = resolve_combination(&meld.cards)?;
            if card.rank != comb.rank {
                return Err(MeldErrorCode::UnknownCard);
            }
            if comb.suits.contains(&card.suit) {
                return Err(MeldErrorCode::SameSuitInCombination);
            }
            Ok(())
        }
        MeldKind::Sequence => {
            let seq = resolve_sequence(&meld.cards)?;
            if card.suit != seq.suit {
                return Err(MeldErrorCode::UnknownCard);
            }
            let (slot, _) = seq
                .slots
                .iter()
                .find(|(_, c)| c.is_joker())
                .copied()
                .expect("meld has a joker");
            let expected_rank = if slot == ACE_HIGH { ACE } else { slot };
            if card.rank == expected_rank {
                Ok(())
            } else {
                Err(MeldErrorCode::UnknownCard)
            }
        }
    }
}
