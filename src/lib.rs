//! Scala 40 multiplayer engine: rules, turn state machine and persistent
//! state coordinator.
//!
//! The crate is layered the same way the state flows: `domain` holds the pure
//! game logic (cards, melds, scoring, integrity), `store` is the abstract
//! persistence seam with optimistic concurrency, `engine` serializes player
//! actions against stored games, and `lobby` produces the games the engine
//! consumes. `codec` exports and imports complete game documents, `rng` and
//! `sim` supply the random sources and the deterministic baseline bot used
//! by the CLI.

pub mod codec;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod lobby;
pub mod rng;
pub mod sim;
pub mod store;

// Re-exports for ergonomics
pub use domain::cards::{Card, Suit};
pub use domain::state::{GameSettings, GameState, MatchStatus, TurnPhase};
pub use engine::actions::{Action, ActionRequest, ActionResponse};
pub use engine::GameEngine;
pub use errors::domain::{EngineError, MeldErrorCode};
pub use store::{DocumentStore, Version};
