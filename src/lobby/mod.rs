//! Lobby lifecycle: a lobby-code rendezvous that collects ready players and
//! hands them to the engine as a new game.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::domain::rules::{
    DEFAULT_LOBBY_TTL_SECONDS, MAX_PLAYERS, MIN_PLAYERS, WRITE_BACKOFF_BASE_MS, WRITE_RETRIES,
};
use crate::domain::state::{GameSettings, UserId};
use crate::domain::users::UserProfile;
use crate::engine::GameEngine;
use crate::errors::domain::{EngineError, LobbyErrorKind, NotFoundKind};
use crate::rng::{generate_lobby_code, SecureRng};
use crate::store::{DocumentStore, StoreError, Version};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Waiting,
    Starting,
    InGame,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub user_id: UserId,
    pub ready: bool,
}

/// A lobby document, keyed by its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub code: String,
    pub host_user_id: UserId,
    pub players: Vec<LobbyPlayer>,
    pub status: LobbyStatus,
    pub chat_id: String,
    pub settings: GameSettings,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub ttl_seconds: u64,
}

impl Lobby {
    pub fn seat_of(&self, user_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }
}

fn map_store(err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound(_) => EngineError::not_found(NotFoundKind::Lobby),
        StoreError::VersionConflict { .. } => EngineError::StaleState {
            retries: WRITE_RETRIES,
        },
        StoreError::Unavailable(detail) => EngineError::Unavailable { detail },
    }
}

#[derive(Clone)]
pub struct LobbyManager {
    lobbies: Arc<dyn DocumentStore<Lobby>>,
    users: Arc<dyn DocumentStore<UserProfile>>,
    engine: GameEngine,
}

impl LobbyManager {
    pub fn new(
        lobbies: Arc<dyn DocumentStore<Lobby>>,
        users: Arc<dyn DocumentStore<UserProfile>>,
        engine: GameEngine,
    ) -> Self {
        Self {
            lobbies,
            users,
            engine,
        }
    }

    /// Create a lobby with a fresh unambiguous code; the host is seated and
    /// unready. Code collisions are vanishingly rare but retried anyway.
    pub async fn create(
        &self,
        host_user_id: &str,
        chat_id: &str,
        settings: GameSettings,
    ) -> Result<Lobby, EngineError> {
        let mut rng = SecureRng::new();
        for _ in 0..WRITE_RETRIES {
            let code = generate_lobby_code(&mut rng);
            let lobby = Lobby {
                code: code.clone(),
                host_user_id: host_user_id.to_string(),
                players: vec![LobbyPlayer {
                    user_id: host_user_id.to_string(),
                    ready: false,
                }],
                status: LobbyStatus::Waiting,
                chat_id: chat_id.to_string(),
                settings: settings.clone(),
                created_at: OffsetDateTime::now_utc(),
                ttl_seconds: DEFAULT_LOBBY_TTL_SECONDS,
            };
            match self.lobbies.put(&code, lobby.clone(), None).await {
                Ok(_) => {
                    self.ensure_profile(host_user_id).await;
                    info!(code = %code, host = %host_user_id, "lobby created");
                    return Ok(lobby);
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(e) => return Err(map_store(e)),
            }
        }
        Err(EngineError::StaleState {
            retries: WRITE_RETRIES,
        })
    }

    pub async fn join(&self, code: &str, user_id: &str) -> Result<Lobby, EngineError> {
        let lobby = self
            .mutate(code, |lobby| {
                if lobby.status != LobbyStatus::Waiting {
                    return Err(EngineError::lobby(LobbyErrorKind::NotJoinable));
                }
                if lobby.players.len() >= MAX_PLAYERS {
                    return Err(EngineError::lobby(LobbyErrorKind::Full));
                }
                if lobby.seat_of(user_id).is_some() {
                    return Err(EngineError::lobby(LobbyErrorKind::AlreadyJoined));
                }
                lobby.players.push(LobbyPlayer {
                    user_id: user_id.to_string(),
                    ready: false,
                });
                Ok(())
            })
            .await?;
        self.ensure_profile(user_id).await;
        Ok(lobby)
    }

    /// Leave a lobby. A departing host hands the lobby to the next seat; the
    /// last player out closes it.
    pub async fn leave(&self, code: &str, user_id: &str) -> Result<Lobby, EngineError> {
        self.mutate(code, |lobby| {
            let seat = lobby
                .seat_of(user_id)
                .ok_or(EngineError::lobby(LobbyErrorKind::NotInLobby))?;
            lobby.players.remove(seat);
            if lobby.players.is_empty() {
                lobby.status = LobbyStatus::Closed;
            } else if lobby.host_user_id == user_id {
                lobby.host_user_id = lobby.players[0].user_id.clone();
            }
            Ok(())
        })
        .await
    }

    pub async fn toggle_ready(&self, code: &str, user_id: &str) -> Result<Lobby, EngineError> {
        self.mutate(code, |lobby| {
            let seat = lobby
                .seat_of(user_id)
                .ok_or(EngineError::lobby(LobbyErrorKind::NotInLobby))?;
            lobby.players[seat].ready = !lobby.players[seat].ready;
            Ok(())
        })
        .await
    }

    /// Start the match: host only, at least two seats, everyone ready.
    /// Returns the updated lobby and the new game id.
    pub async fn start(&self, code: &str, user_id: &str) -> Result<(Lobby, String), EngineError> {
        let lobby = self
            .mutate(code, |lobby| {
                if lobby.host_user_id != user_id {
                    return Err(EngineError::lobby(LobbyErrorKind::NotHost));
                }
                if lobby.status != LobbyStatus::Waiting {
                    return Err(EngineError::lobby(LobbyErrorKind::NotJoinable));
                }
                if lobby.players.len() < MIN_PLAYERS {
                    return Err(EngineError::lobby(LobbyErrorKind::TooFewPlayers));
                }
                if !lobby.players.iter().all(|p| p.ready) {
                    return Err(EngineError::lobby(LobbyErrorKind::NotAllReady));
                }
                lobby.status = LobbyStatus::Starting;
                Ok(())
            })
            .await?;

        let player_ids: Vec<UserId> = lobby.players.iter().map(|p| p.user_id.clone()).collect();
        let game = self
            .engine
            .create_game(&player_ids, code, lobby.settings.clone(), None)
            .await?;

        let lobby = self
            .mutate(code, |lobby| {
                lobby.status = LobbyStatus::InGame;
                Ok(())
            })
            .await?;
        info!(code = %code, game_id = %game.game_id, "lobby started a game");
        Ok((lobby, game.game_id))
    }

    pub async fn get(&self, code: &str) -> Result<(Lobby, Version), EngineError> {
        self.lobbies.get(code).await.map_err(map_store)
    }

    /// Read-modify-write with the engine's retry policy.
    async fn mutate<F>(&self, code: &str, mut apply: F) -> Result<Lobby, EngineError>
    where
        F: FnMut(&mut Lobby) -> Result<(), EngineError>,
    {
        for attempt in 0..WRITE_RETRIES {
            let (mut lobby, version) = self.get(code).await?;
            apply(&mut lobby)?;
            match self
                .lobbies
                .put(code, lobby.clone(), Some(version))
                .await
            {
                Ok(_) => return Ok(lobby),
                Err(StoreError::VersionConflict { .. }) => {
                    tokio::time::sleep(Duration::from_millis(WRITE_BACKOFF_BASE_MS << attempt))
                        .await;
                }
                Err(e) => return Err(map_store(e)),
            }
        }
        Err(EngineError::StaleState {
            retries: WRITE_RETRIES,
        })
    }

    async fn ensure_profile(&self, user_id: &str) {
        if let Err(StoreError::NotFound(_)) = self.users.get(user_id).await {
            // Losing this race to another handler is fine.
            let _ = self
                .users
                .put(user_id, UserProfile::new(user_id), None)
                .await;
        }
    }
}
