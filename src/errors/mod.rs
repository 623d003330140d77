//! Error types shared across the engine, store and lobby layers.

pub mod domain;

pub use domain::{EngineError, LobbyErrorKind, MeldErrorCode, NotFoundKind};
