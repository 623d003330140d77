//! Card parsing and display for the compact string encoding.
//!
//! Examples: `"8h0"` = 8 of hearts from deck 0, `"Ks1"` = king of spades from
//! deck 1, `"J0"` / `"J1"` = joker from deck 0 / 1.

use std::fmt;
use std::str::FromStr;

use crate::domain::cards::{Card, Suit};
use crate::domain::rules::{ACE, JACK, KING, QUEEN};
use crate::errors::domain::{EngineError, MeldErrorCode};

fn rank_token(rank: u8) -> &'static str {
    match rank {
        r if r == ACE => "A",
        2 => "2",
        3 => "3",
        4 => "4",
        5 => "5",
        6 => "6",
        7 => "7",
        8 => "8",
        9 => "9",
        10 => "10",
        r if r == JACK => "J",
        r if r == QUEEN => "Q",
        r if r == KING => "K",
        _ => "?",
    }
}

fn parse_rank(token: &str) -> Option<u8> {
    match token {
        "A" => Some(ACE),
        "10" => Some(10),
        "J" => Some(JACK),
        "Q" => Some(QUEEN),
        "K" => Some(KING),
        t => {
            let d = t.parse::<u8>().ok()?;
            (2..=9).contains(&d).then_some(d)
        }
    }
}

fn parse_suit(ch: char) -> Option<Suit> {
    match ch {
        'h' => Some(Suit::Hearts),
        'd' => Some(Suit::Diamonds),
        'c' => Some(Suit::Clubs),
        's' => Some(Suit::Spades),
        _ => None,
    }
}

impl Card {
    /// Compact string encoding, stable across schema versions.
    pub fn compact(self) -> String {
        if self.is_joker() {
            return format!("J{}", self.deck);
        }
        format!("{}{}{}", rank_token(self.rank), self.suit.letter(), self.deck)
    }

    /// Unicode display string for terminals, e.g. `8♥` or `🃏`.
    pub fn display(self) -> String {
        if self.is_joker() {
            return self.suit.symbol().to_string();
        }
        format!("{}{}", rank_token(self.rank), self.suit.symbol())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

impl FromStr for Card {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EngineError::illegal_meld(MeldErrorCode::UnknownCard);

        // Jokers: "J0" / "J1"
        if let Some(deck_ch) = s.strip_prefix('J') {
            if let Ok(deck) = deck_ch.parse::<u8>() {
                if deck <= 1 {
                    return Ok(Card::joker(deck));
                }
            }
            // fall through: "J..." may still be a jack, e.g. "Jh0"
        }

        // Suited cards: rank token + suit letter + deck digit.
        if s.len() < 3 {
            return Err(err());
        }
        let (body, deck_str) = s.split_at(s.len() - 1);
        let deck = deck_str.parse::<u8>().map_err(|_| err())?;
        if deck > 1 {
            return Err(err());
        }
        let suit_ch = body.chars().last().ok_or_else(err)?;
        let suit = parse_suit(suit_ch).ok_or_else(err)?;
        let rank = parse_rank(&body[..body.len() - 1]).ok_or_else(err)?;
        Ok(Card::new(suit, rank, deck))
    }
}

/// Parse card tokens into cards, failing on the first invalid token.
pub fn try_parse_cards<I, S>(tokens: I) -> Result<Vec<Card>, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|s| s.as_ref().parse::<Card>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_roundtrip() {
        let cases = [
            Card::new(Suit::Hearts, 8, 0),
            Card::new(Suit::Spades, KING, 1),
            Card::new(Suit::Diamonds, ACE, 0),
            Card::new(Suit::Clubs, 10, 1),
            Card::joker(0),
            Card::joker(1),
        ];
        for card in cases {
            let code = card.compact();
            assert_eq!(code.parse::<Card>().unwrap(), card, "token {code}");
        }
    }

    #[test]
    fn rejects_invalid_tokens() {
        for tok in ["", "X", "1h0", "11s0", "8h2", "8x0", "J2", "Ah", "10"] {
            assert!(tok.parse::<Card>().is_err(), "token {tok} should fail");
        }
    }

    #[test]
    fn jack_is_not_a_joker() {
        assert_eq!(
            "Jh0".parse::<Card>().unwrap(),
            Card::new(Suit::Hearts, JACK, 0)
        );
    }

    #[test]
    fn try_parse_cards_fails_on_first_bad_token() {
        assert!(try_parse_cards(["8h0", "Ks1"]).is_ok());
        assert!(try_parse_cards(["8h0", "zz"]).is_err());
    }
}
