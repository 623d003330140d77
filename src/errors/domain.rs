//! Central engine error type.
//!
//! Validation errors are returned to the caller without any state mutation;
//! concurrency errors are retried inside the engine and only surface as
//! `StaleState` once retries are exhausted. `CorruptState` is fatal for the
//! affected game.

use thiserror::Error;

use crate::domain::state::{MatchStatus, TurnPhase};

/// Rejection codes for an invalid meld.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldErrorCode {
    TooShort,
    TooLong,
    MultipleJokers,
    MixedSuitsInSequence,
    SameSuitInCombination,
    NonConsecutive,
    Wrap,
    OnlyJokers,
    UnknownCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Game,
    Lobby,
    Player,
    Meld,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyErrorKind {
    NotJoinable,
    Full,
    AlreadyJoined,
    NotInLobby,
    NotHost,
    NotAllReady,
    TooFewPlayers,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("action not permitted in phase {phase:?}")]
    WrongPhase { phase: TurnPhase },
    #[error("game is not in progress (status {status:?})")]
    GameNotPlaying { status: MatchStatus },
    #[error("illegal meld: {code:?}")]
    IllegalMeld { code: MeldErrorCode },
    #[error("opening below threshold: {points} points")]
    OpeningBelowThreshold { points: u16 },
    #[error("player has not opened yet")]
    NotOpened,
    #[error("player has already opened")]
    AlreadyOpened,
    #[error("a joker taken from the table must be used this turn")]
    JokerMustBeUsed,
    #[error("the card drawn from the discard pile must be played this turn")]
    PickedCardMustBePlayed,
    #[error("the discard attaches to a table meld")]
    DiscardAttachesToTable,
    #[error("cannot discard the card just drawn from the discard pile")]
    DiscardIsPickedUpCard,
    #[error("cannot close before the first full round is complete")]
    CannotCloseFirstRound,
    #[error("cannot open and close in the same turn with laydowns in between")]
    CannotOpenAndClose,
    #[error("no cards available to draw")]
    NoCards,
    #[error("player count {count} is outside 2..=4")]
    InvalidPlayerCount { count: usize },
    #[error("stale state after {retries} conflicting writes")]
    StaleState { retries: u32 },
    #[error("corrupt state: {violations:?}")]
    CorruptState { violations: Vec<String> },
    #[error("not found: {kind:?}")]
    NotFound { kind: NotFoundKind },
    #[error("lobby error: {kind:?}")]
    Lobby { kind: LobbyErrorKind },
    #[error("deadline exceeded before commit")]
    DeadlineExceeded,
    #[error("store unavailable: {detail}")]
    Unavailable { detail: String },
}

impl EngineError {
    pub fn illegal_meld(code: MeldErrorCode) -> Self {
        Self::IllegalMeld { code }
    }

    pub fn not_found(kind: NotFoundKind) -> Self {
        Self::NotFound { kind }
    }

    pub fn lobby(kind: LobbyErrorKind) -> Self {
        Self::Lobby { kind }
    }

    /// True for rule-validation rejections that leave state untouched, as
    /// opposed to concurrency or infrastructure failures.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::StaleState { .. }
                | Self::CorruptState { .. }
                | Self::Unavailable { .. }
                | Self::DeadlineExceeded
        )
    }
}

impl From<MeldErrorCode> for EngineError {
    fn from(code: MeldErrorCode) -> Self {
        Self::IllegalMeld { code }
    }
}
