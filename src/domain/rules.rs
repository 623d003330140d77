//! Scala 40 rule constants.

pub const NUM_DECKS: u8 = 2;
pub const JOKERS_PER_DECK: usize = 2;
pub const TOTAL_CARDS: usize = 108; // 52 * 2 + 4

pub const CARDS_PER_PLAYER: usize = 13;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

pub const OPENING_THRESHOLD: u16 = 40;
pub const DEFAULT_ELIMINATION_SCORE: u32 = 101;

// Ranks (1..=13; 0 is reserved for the joker)
pub const JOKER_RANK: u8 = 0;
pub const ACE: u8 = 1;
pub const JACK: u8 = 11;
pub const QUEEN: u8 = 12;
pub const KING: u8 = 13;
/// Slot value for an ace counted high (after the king). Never a card rank.
pub const ACE_HIGH: u8 = 14;

// Point values
pub const JOKER_POINTS: u32 = 25;
pub const ACE_POINTS_HIGH: u32 = 11;
pub const ACE_POINTS_LOW: u32 = 1;
pub const FACE_POINTS: u32 = 10;

pub const SEQUENCE_MIN_LEN: usize = 3;
/// A through K plus a joker standing for the ace counted high.
pub const SEQUENCE_MAX_LEN: usize = 14;
pub const COMBINATION_MIN_LEN: usize = 3;
pub const COMBINATION_MAX_LEN: usize = 4;

pub const LOBBY_CODE_LENGTH: usize = 6;
pub const DEFAULT_LOBBY_TTL_SECONDS: u64 = 6 * 60 * 60;

// Optimistic-concurrency retry policy.
pub const WRITE_RETRIES: u32 = 3;
pub const WRITE_BACKOFF_BASE_MS: u64 = 20;
