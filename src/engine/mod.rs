//! The stateless game engine: reads a game document, applies one validated
//! action, and writes it back conditionally.
//!
//! Per-game serialization comes from optimistic concurrency, not from an
//! in-process lock: the first commit wins and the loser retries from the
//! read. All rule logic is pure; the store calls are the only suspension
//! points.

pub mod actions;
mod hand_lifecycle;
mod player_actions;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::domain::events::GameEvent;
use crate::domain::rules::{MAX_PLAYERS, MIN_PLAYERS, WRITE_BACKOFF_BASE_MS, WRITE_RETRIES};
use crate::domain::state::{
    GameSettings, GameState, MatchStatus, PlayerState, StoredOutcome, TurnPhase, TurnScratch,
    UserId,
};
use crate::domain::users::UserProfile;
use crate::errors::domain::{EngineError, NotFoundKind};
use crate::rng::SecureRng;
use crate::store::{DocumentStore, InMemoryStore, StoreError};
use actions::{ActionRequest, ActionResponse};
use view::{private_view, public_view};

fn map_store(err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound(_) => EngineError::not_found(NotFoundKind::Game),
        StoreError::VersionConflict { .. } => EngineError::StaleState {
            retries: WRITE_RETRIES,
        },
        StoreError::Unavailable(detail) => EngineError::Unavailable { detail },
    }
}

#[derive(Clone)]
pub struct GameEngine {
    games: Arc<dyn DocumentStore<GameState>>,
    users: Arc<dyn DocumentStore<UserProfile>>,
}

impl GameEngine {
    pub fn new(
        games: Arc<dyn DocumentStore<GameState>>,
        users: Arc<dyn DocumentStore<UserProfile>>,
    ) -> Self {
        Self { games, users }
    }

    /// Engine over fresh in-memory stores, for the CLI and tests.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    /// Create a game and deal its first hand. With `seed` the whole match is
    /// reproducible; without it a seed is drawn from the secure source and
    /// recorded on the document, after which play is deterministic anyway.
    pub async fn create_game(
        &self,
        player_ids: &[UserId],
        lobby_code: &str,
        settings: GameSettings,
        seed: Option<u64>,
    ) -> Result<GameState, EngineError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_ids.len()) {
            return Err(EngineError::InvalidPlayerCount {
                count: player_ids.len(),
            });
        }
        let rng_seed = seed.unwrap_or_else(|| SecureRng::new().random_seed());

        let mut game = GameState {
            game_id: GameState::new_game_id(),
            lobby_code: lobby_code.to_string(),
            players: player_ids.iter().map(PlayerState::new).collect(),
            stock: Vec::new(),
            discard_pile: Vec::new(),
            table_melds: Vec::new(),
            current_turn_user_id: player_ids[0].clone(),
            turn_phase: TurnPhase::AwaitDraw,
            round_number: 1,
            first_round_complete: false,
            round_starter_user_id: player_ids[0].clone(),
            dealer_user_id: player_ids[0].clone(),
            hand_number: 0,
            status: MatchStatus::Playing,
            settings,
            rng_seed,
            shuffle_count: 0,
            meld_seq: 0,
            scratch: TurnScratch::default(),
            last_nonce: None,
            last_outcome: None,
            updated_at: OffsetDateTime::now_utc(),
        };
        hand_lifecycle::start_hand(&mut game)?;
        game.touch();

        self.games
            .put(&game.game_id.clone(), game.clone(), None)
            .await
            .map_err(map_store)?;
        info!(
            game_id = %game.game_id,
            players = player_ids.len(),
            seed = rng_seed,
            "game created"
        );
        Ok(game)
    }

    /// Process one player action: read, validate, apply, conditional write.
    /// A conflicting write is retried from the read with exponential backoff
    /// before surfacing as `StaleState`.
    pub async fn submit(&self, req: &ActionRequest) -> Result<ActionResponse, EngineError> {
        for attempt in 0..WRITE_RETRIES {
            let (mut game, version) = match self.games.get(&req.game_id).await {
                Ok(pair) => pair,
                Err(StoreError::NotFound(_)) => {
                    return Err(EngineError::not_found(NotFoundKind::Game))
                }
                Err(e) => return Err(map_store(e)),
            };

            // Duplicate delivery: answer from the stored outcome, no re-apply.
            if game.last_nonce.as_deref() == Some(req.nonce.as_str()) {
                if let Some(outcome) = game.last_outcome.clone() {
                    return Ok(self.build_response(&game, &req.player_id, outcome));
                }
            }

            if let Some(deadline) = req.deadline {
                if OffsetDateTime::now_utc() > deadline {
                    return Err(EngineError::DeadlineExceeded);
                }
            }

            let events = player_actions::apply_action(&mut game, req)?;
            let outcome = StoredOutcome {
                new_phase: game.turn_phase,
                events,
            };
            game.last_nonce = Some(req.nonce.clone());
            game.last_outcome = Some(outcome.clone());
            game.touch();

            let match_result = (game.status == MatchStatus::Finished)
                .then(|| self.extract_match_result(&game))
                .flatten();
            let response = self.build_response(&game, &req.player_id, outcome);

            match self.games.put(&req.game_id, game, Some(version)).await {
                Ok(_) => {
                    info!(
                        game_id = %req.game_id,
                        player_id = %req.player_id,
                        action = req.action.name(),
                        "action committed"
                    );
                    if let Some((winner, participants)) = match_result {
                        self.record_match_result(&winner, &participants).await;
                    }
                    return Ok(response);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    let backoff = WRITE_BACKOFF_BASE_MS << attempt;
                    warn!(
                        game_id = %req.game_id,
                        attempt,
                        backoff_ms = backoff,
                        "commit lost the race, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(map_store(e)),
            }
        }
        Err(EngineError::StaleState {
            retries: WRITE_RETRIES,
        })
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameState, EngineError> {
        let (game, _) = self.games.get(game_id).await.map_err(map_store)?;
        Ok(game)
    }

    pub async fn public_view_of(&self, game_id: &str) -> Result<view::PublicView, EngineError> {
        Ok(public_view(&self.get_game(game_id).await?))
    }

    fn build_response(
        &self,
        game: &GameState,
        player_id: &str,
        outcome: StoredOutcome,
    ) -> ActionResponse {
        ActionResponse {
            new_phase: outcome.new_phase,
            status: game.status,
            public_view: public_view(game),
            private_view: private_view(game, player_id),
            events: outcome.events,
        }
    }

    fn extract_match_result(&self, game: &GameState) -> Option<(UserId, Vec<UserId>)> {
        let winner = game
            .last_outcome
            .as_ref()?
            .events
            .iter()
            .find_map(|e| match e {
                GameEvent::MatchEnd { winner, .. } => Some(winner.clone()),
                _ => None,
            })?;
        let participants = game.players.iter().map(|p| p.user_id.clone()).collect();
        Some((winner, participants))
    }

    /// Best-effort stats bump at match end; a lost race here never fails the
    /// action that finished the game.
    async fn record_match_result(&self, winner: &str, participants: &[UserId]) {
        for user_id in participants {
            let (mut profile, version) = match self.users.get(user_id).await {
                Ok((p, v)) => (p, Some(v)),
                Err(StoreError::NotFound(_)) => (UserProfile::new(user_id.clone()), None),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "skipping stats update");
                    continue;
                }
            };
            profile.matches_played += 1;
            if user_id == winner {
                profile.matches_won += 1;
            }
            profile.updated_at = OffsetDateTime::now_utc();
            if let Err(e) = self.users.put(user_id, profile, version).await {
                warn!(user_id = %user_id, error = %e, "stats update lost");
            }
        }
    }
}

/// Convenience for tests and the simulator: seed a store with a prepared
/// game document.
pub async fn seed_game(
    games: &dyn DocumentStore<GameState>,
    game: GameState,
) -> Result<crate::store::Version, EngineError> {
    games
        .put(&game.game_id.clone(), game, None)
        .await
        .map_err(map_store)
}
