//! Per-action handlers. Each handler validates fully against the loaded
//! document before mutating it; the engine only persists on success, so a
//! rejected action leaves no trace.

use tracing::warn;

use crate::domain::cards::Card;
use crate::domain::deck::{draw_top, reshuffle_discard};
use crate::domain::events::{DrawSource, GameEvent};
use crate::domain::melds::{
    can_attach, can_substitute_joker, sequence_display_order, validate_meld, validate_opening,
    MeldKind,
};
use crate::domain::seed_derivation::derive_shuffle_seed;
use crate::domain::state::{GameState, MatchStatus, TableMeld, TurnPhase};
use crate::engine::actions::{Action, ActionRequest};
use crate::engine::hand_lifecycle::{advance_turn, handle_closure};
use crate::errors::domain::{EngineError, MeldErrorCode, NotFoundKind};
use crate::rng::SeededRng;

pub(super) fn apply_action(
    game: &mut GameState,
    req: &ActionRequest,
) -> Result<Vec<GameEvent>, EngineError> {
    match &req.action {
        Action::DrawStock => draw_from_stock(game, &req.player_id),
        Action::DrawDiscard => draw_from_discard(game, &req.player_id),
        Action::Open { melds } => open(game, &req.player_id, melds),
        Action::LayMeld { cards } => lay_meld(game, &req.player_id, cards),
        Action::Attach { card, meld_id } => attach(game, &req.player_id, *card, meld_id),
        Action::SubstituteJoker { meld_id, card } => {
            substitute_joker(game, &req.player_id, meld_id, *card)
        }
        Action::Discard { card } => discard(game, &req.player_id, *card, req.declare_duplicate),
        Action::AutoPlay => auto_play(game, &req.player_id),
    }
}

fn ensure_actor(game: &GameState, user_id: &str, allowed: &[TurnPhase]) -> Result<(), EngineError> {
    if game.status != MatchStatus::Playing {
        return Err(EngineError::GameNotPlaying {
            status: game.status,
        });
    }
    let player = game
        .get_player(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    if game.current_turn_user_id != user_id || player.is_eliminated {
        return Err(EngineError::NotYourTurn);
    }
    if !allowed.contains(&game.turn_phase) {
        return Err(EngineError::WrongPhase {
            phase: game.turn_phase,
        });
    }
    Ok(())
}

fn require_player<'a>(game: &'a GameState, user_id: &str) -> Result<&'a crate::domain::state::PlayerState, EngineError> {
    game.get_player(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))
}

/// Remove `wanted` cards from a copy of `hand`, failing if any is missing.
fn remove_cards<'a>(
    hand: &[Card],
    wanted: impl Iterator<Item = &'a Card>,
) -> Result<Vec<Card>, EngineError> {
    let mut rest = hand.to_vec();
    for card in wanted {
        let pos = rest
            .iter()
            .position(|c| c == card)
            .ok_or(EngineError::illegal_meld(MeldErrorCode::UnknownCard))?;
        rest.remove(pos);
    }
    Ok(rest)
}

fn build_meld(meld_id: String, owner: &str, cards: Vec<Card>) -> Result<TableMeld, EngineError> {
    let value = validate_meld(&cards).map_err(EngineError::illegal_meld)?;
    let cards = match value.kind {
        MeldKind::Sequence => sequence_display_order(&cards).map_err(EngineError::illegal_meld)?,
        MeldKind::Combination => cards,
    };
    Ok(TableMeld {
        meld_id,
        owner: owner.to_string(),
        kind: value.kind,
        cards,
    })
}

pub(super) fn draw_from_stock(
    game: &mut GameState,
    user_id: &str,
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitDraw])?;

    let mut events = Vec::new();
    if game.stock.is_empty() {
        if game.discard_pile.len() < 2 {
            // Impossible while conservation holds; surfaced for corrupt docs.
            return Err(EngineError::NoCards);
        }
        let seed = derive_shuffle_seed(game.rng_seed, game.shuffle_count);
        game.shuffle_count += 1;
        let mut rng = SeededRng::from_seed(seed);
        let moved = reshuffle_discard(&mut game.stock, &mut game.discard_pile, &mut rng)?;
        events.push(GameEvent::Reshuffle {
            cards_reshuffled: moved,
        });
    }

    let card = draw_top(&mut game.stock)?;
    let stock_remaining = game.stock.len();
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    player.hand.push(card);
    let opened = player.has_opened;

    game.scratch.has_drawn = true;
    game.scratch.drawn_from_discard = None;
    game.turn_phase = if opened {
        TurnPhase::AwaitPlay
    } else {
        TurnPhase::AwaitDiscard
    };
    events.push(GameEvent::Draw {
        user_id: user_id.to_string(),
        source: DrawSource::Stock,
        card: None,
        stock_remaining,
    });
    Ok(events)
}

pub(super) fn draw_from_discard(
    game: &mut GameState,
    user_id: &str,
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitDraw])?;

    let opened = require_player(game, user_id)?.has_opened;
    if !opened && !game.settings.open_with_discard {
        return Err(EngineError::NotOpened);
    }

    let card = draw_top(&mut game.discard_pile)?;
    let stock_remaining = game.stock.len();
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    player.hand.push(card);

    game.scratch.has_drawn = true;
    game.scratch.drawn_from_discard = Some(card);
    game.turn_phase = if opened {
        TurnPhase::AwaitPlay
    } else {
        // Commitment to open this turn; the picked-card obligation makes the
        // discard impossible until the card lands in the opening melds.
        TurnPhase::AwaitDiscard
    };
    Ok(vec![GameEvent::Draw {
        user_id: user_id.to_string(),
        source: DrawSource::Discard,
        card: Some(card),
        stock_remaining,
    }])
}

pub(super) fn open(
    game: &mut GameState,
    user_id: &str,
    melds: &[Vec<Card>],
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitPlay, TurnPhase::AwaitDiscard])?;

    if require_player(game, user_id)?.has_opened {
        return Err(EngineError::AlreadyOpened);
    }

    let points = validate_opening(
        melds,
        game.settings.opening_threshold,
        game.settings.opening_without_joker,
    )?;

    // A card taken from the discard pile before opening (open-with-discard
    // variant) must be part of the opening itself.
    if let Some(picked) = game.scratch.drawn_from_discard {
        if !melds.iter().flatten().any(|c| *c == picked) {
            return Err(EngineError::PickedCardMustBePlayed);
        }
    }

    let remaining = remove_cards(
        &require_player(game, user_id)?.hand,
        melds.iter().flatten(),
    )?;

    let mut new_melds = Vec::with_capacity(melds.len());
    for cards in melds {
        let meld_id = game.next_meld_id();
        new_melds.push(build_meld(meld_id, user_id, cards.clone())?);
    }

    // Commit
    let cards_remaining = remaining.len();
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    player.hand = remaining;
    player.has_opened = true;
    game.table_melds.extend(new_melds);
    game.scratch.opened_this_turn = true;
    game.scratch.in_hand_closure_ready = cards_remaining == 1;
    game.turn_phase = TurnPhase::AwaitPlay;

    Ok(vec![GameEvent::Open {
        user_id: user_id.to_string(),
        melds: melds.len(),
        points,
        cards_remaining,
    }])
}

pub(super) fn lay_meld(
    game: &mut GameState,
    user_id: &str,
    cards: &[Card],
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitPlay])?;
    if !require_player(game, user_id)?.has_opened {
        return Err(EngineError::NotOpened);
    }
    validate_meld(cards).map_err(EngineError::illegal_meld)?;

    // Cards come from the hand, or one of them may be the pending joker
    // withdrawn earlier this turn.
    let mut rest = require_player(game, user_id)?.hand.clone();
    let mut pending_used = false;
    for card in cards {
        if let Some(pos) = rest.iter().position(|c| c == card) {
            rest.remove(pos);
        } else if !pending_used && game.scratch.pending_joker == Some(*card) {
            pending_used = true;
        } else {
            return Err(EngineError::illegal_meld(MeldErrorCode::UnknownCard));
        }
    }

    let meld = build_meld(game.next_meld_id(), user_id, cards.to_vec())?;
    let event = GameEvent::LayMeld {
        user_id: user_id.to_string(),
        meld_id: meld.meld_id.clone(),
        cards: meld.cards.clone(),
    };

    // Commit
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    player.hand = rest;
    if pending_used {
        game.scratch.pending_joker = None;
    }
    game.scratch.in_hand_closure_ready = false;
    game.table_melds.push(meld);

    Ok(vec![event])
}

pub(super) fn attach(
    game: &mut GameState,
    user_id: &str,
    card: Card,
    meld_id: &str,
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitPlay])?;
    if !require_player(game, user_id)?.has_opened {
        return Err(EngineError::NotOpened);
    }

    let meld = game
        .find_meld(meld_id)
        .ok_or(EngineError::not_found(NotFoundKind::Meld))?;
    can_attach(card, meld).map_err(EngineError::illegal_meld)?;
    let kind = meld.kind;

    // Source the card: hand first, then the pending joker.
    let hand = &require_player(game, user_id)?.hand;
    let from_hand = hand.iter().position(|c| *c == card);
    let from_pending = from_hand.is_none() && game.scratch.pending_joker == Some(card);
    if from_hand.is_none() && !from_pending {
        return Err(EngineError::illegal_meld(MeldErrorCode::UnknownCard));
    }

    // Commit
    if let Some(pos) = from_hand {
        let player = game
            .get_player_mut(user_id)
            .ok_or(EngineError::not_found(NotFoundKind::Player))?;
        player.hand.remove(pos);
    } else {
        game.scratch.pending_joker = None;
    }
    let meld = game
        .find_meld_mut(meld_id)
        .ok_or(EngineError::not_found(NotFoundKind::Meld))?;
    meld.cards.push(card);
    if kind == MeldKind::Sequence {
        meld.cards = sequence_display_order(&meld.cards).map_err(EngineError::illegal_meld)?;
    }
    game.scratch.in_hand_closure_ready = false;

    Ok(vec![GameEvent::Attach {
        user_id: user_id.to_string(),
        meld_id: meld_id.to_string(),
        card,
    }])
}

pub(super) fn substitute_joker(
    game: &mut GameState,
    user_id: &str,
    meld_id: &str,
    card: Card,
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitPlay])?;
    if !require_player(game, user_id)?.has_opened {
        return Err(EngineError::NotOpened);
    }
    if game.scratch.pending_joker.is_some() {
        return Err(EngineError::JokerMustBeUsed);
    }

    let meld = game
        .find_meld(meld_id)
        .ok_or(EngineError::not_found(NotFoundKind::Meld))?;
    can_substitute_joker(card, meld).map_err(EngineError::illegal_meld)?;
    let kind = meld.kind;

    let pos = require_player(game, user_id)?
        .hand
        .iter()
        .position(|c| *c == card)
        .ok_or(EngineError::illegal_meld(MeldErrorCode::UnknownCard))?;

    // Commit
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    player.hand.remove(pos);
    let meld = game
        .find_meld_mut(meld_id)
        .ok_or(EngineError::not_found(NotFoundKind::Meld))?;
    let joker_pos = meld
        .cards
        .iter()
        .position(|c| c.is_joker())
        .ok_or(EngineError::illegal_meld(MeldErrorCode::UnknownCard))?;
    let joker = meld.cards[joker_pos];
    meld.cards[joker_pos] = card;
    if kind == MeldKind::Sequence {
        meld.cards = sequence_display_order(&meld.cards).map_err(EngineError::illegal_meld)?;
    }
    game.scratch.pending_joker = Some(joker);
    game.scratch.in_hand_closure_ready = false;

    Ok(vec![GameEvent::SubstituteJoker {
        user_id: user_id.to_string(),
        meld_id: meld_id.to_string(),
        card,
    }])
}

/// Check a candidate discard without mutating anything. `force` is the
/// auto-play fallback: it waives the picked-card and attach restrictions but
/// never the closing rules.
fn discard_violation(
    game: &GameState,
    user_id: &str,
    card: Card,
    declare_duplicate: bool,
    force: bool,
) -> Option<EngineError> {
    if game.scratch.pending_joker.is_some() {
        return Some(EngineError::JokerMustBeUsed);
    }
    let player = match game.get_player(user_id) {
        Some(p) => p,
        None => return Some(EngineError::not_found(NotFoundKind::Player)),
    };
    let pos = match player.hand.iter().position(|c| *c == card) {
        Some(p) => p,
        None => return Some(EngineError::illegal_meld(MeldErrorCode::UnknownCard)),
    };

    if !force {
        if let Some(picked) = game.scratch.drawn_from_discard {
            if card == picked {
                // Allowed only by declaring a held duplicate.
                let has_duplicate = player
                    .hand
                    .iter()
                    .enumerate()
                    .any(|(i, c)| i != pos && c.is_duplicate_of(card));
                if !(declare_duplicate && has_duplicate) {
                    return Some(EngineError::DiscardIsPickedUpCard);
                }
            } else if player.hand.contains(&picked) {
                return Some(EngineError::PickedCardMustBePlayed);
            }
        }
    }

    let closing = player.hand.len() == 1;
    if closing {
        if !player.has_opened {
            return Some(EngineError::NotOpened);
        }
        if !game.first_round_complete {
            return Some(EngineError::CannotCloseFirstRound);
        }
        if game.settings.close_in_hand_bonus
            && game.scratch.opened_this_turn
            && !game.scratch.in_hand_closure_ready
        {
            return Some(EngineError::CannotOpenAndClose);
        }
    } else if !force && game.active_count() >= 3 && player.has_opened {
        // The table may not be starved: a card that fits an existing meld
        // must be played, not discarded.
        if game
            .table_melds
            .iter()
            .any(|m| can_attach(card, m).is_ok())
        {
            return Some(EngineError::DiscardAttachesToTable);
        }
    }

    None
}

fn commit_discard(
    game: &mut GameState,
    user_id: &str,
    card: Card,
) -> Result<Vec<GameEvent>, EngineError> {
    let player = game
        .get_player_mut(user_id)
        .ok_or(EngineError::not_found(NotFoundKind::Player))?;
    let pos = player
        .hand
        .iter()
        .position(|c| *c == card)
        .ok_or(EngineError::illegal_meld(MeldErrorCode::UnknownCard))?;
    player.hand.remove(pos);
    let hand_remaining = player.hand.len();
    game.discard_pile.push(card);

    let mut events = vec![GameEvent::Discard {
        user_id: user_id.to_string(),
        card,
        hand_remaining,
    }];

    if hand_remaining == 0 {
        handle_closure(game, user_id, &mut events)?;
    } else {
        advance_turn(game);
    }
    Ok(events)
}

pub(super) fn discard(
    game: &mut GameState,
    user_id: &str,
    card: Card,
    declare_duplicate: bool,
) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(game, user_id, &[TurnPhase::AwaitPlay, TurnPhase::AwaitDiscard])?;
    if let Some(err) = discard_violation(game, user_id, card, declare_duplicate, false) {
        return Err(err);
    }
    commit_discard(game, user_id, card)
}

/// Inactivity substitute: draw from stock, then discard the highest-valued
/// card with a legal discard. When no legal discard exists the lowest-valued
/// card is dumped anyway and a warning lands in the event log.
pub(super) fn auto_play(game: &mut GameState, user_id: &str) -> Result<Vec<GameEvent>, EngineError> {
    ensure_actor(
        game,
        user_id,
        &[TurnPhase::AwaitDraw, TurnPhase::AwaitPlay, TurnPhase::AwaitDiscard],
    )?;

    let mut events = Vec::new();
    if game.turn_phase == TurnPhase::AwaitDraw {
        events.extend(draw_from_stock(game, user_id)?);
    }
    if game.scratch.pending_joker.is_some() {
        return Err(EngineError::JokerMustBeUsed);
    }

    let mut candidates = require_player(game, user_id)?.hand.clone();
    candidates.sort_by_key(|c| std::cmp::Reverse(c.points(false)));

    for card in &candidates {
        if discard_violation(game, user_id, *card, false, false).is_none() {
            events.extend(commit_discard(game, user_id, *card)?);
            return Ok(events);
        }
    }

    let fallback = *candidates.last().ok_or(EngineError::NoCards)?;
    if let Some(err) = discard_violation(game, user_id, fallback, false, true) {
        return Err(err);
    }
    warn!(
        game_id = %game.game_id,
        user_id,
        card = %fallback,
        "auto-play found no legal discard; forcing lowest-value card"
    );
    events.push(GameEvent::InvalidAction {
        user_id: user_id.to_string(),
        reason: "no legal discard available; forced lowest-value card".to_string(),
    });
    events.extend(commit_discard(game, user_id, fallback)?);
    Ok(events)
}
