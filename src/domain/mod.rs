//! Domain layer: pure game logic types and helpers.

pub mod cards;
pub mod cards_parsing;
pub mod cards_serde;
pub mod deck;
pub mod events;
pub mod integrity;
pub mod melds;
pub mod rules;
pub mod scoring;
pub mod seed_derivation;
pub mod state;
pub mod users;

// Re-exports for ergonomics
pub use cards::{Card, Suit};
pub use deck::canonical_deck;
pub use melds::{can_attach, validate_meld, MeldKind, MeldValue};
pub use seed_derivation::derive_shuffle_seed;
pub use state::{GameSettings, GameState, PlayerState, TableMeld, TurnPhase, UserId};
