//! Serialization for card types via the compact string encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::cards::Card;

impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.compact())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Card>()
            .map_err(|_| serde::de::Error::custom(format!("invalid card token: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::Suit;
    use crate::domain::rules::{ACE, KING};

    #[test]
    fn serde_roundtrip() {
        let cases = [
            (Card::new(Suit::Spades, ACE, 0), "\"As0\""),
            (Card::new(Suit::Hearts, 10, 1), "\"10h1\""),
            (Card::new(Suit::Diamonds, KING, 0), "\"Kd0\""),
            (Card::joker(1), "\"J1\""),
        ];
        for (card, json) in cases {
            assert_eq!(serde_json::to_string(&card).unwrap(), json);
            assert_eq!(serde_json::from_str::<Card>(json).unwrap(), card);
        }
    }

    #[test]
    fn rejects_invalid_tokens() {
        for tok in ["\"1H\"", "\"8h2\"", "\"\"", "\"J3\""] {
            assert!(serde_json::from_str::<Card>(tok).is_err());
        }
    }
}
