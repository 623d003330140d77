//! Random sources: a cryptographically secure one for production shuffles
//! and lobby codes, and a seedable deterministic one for tests, simulation
//! and reproducible debugging. Both expose the same interface.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

use crate::domain::rules::LOBBY_CODE_LENGTH;

/// Uniform integers plus an in-place Fisher-Yates shuffle built on them.
pub trait RngSource {
    /// Uniform integer in `0..n`. Returns 0 when `n <= 1`.
    fn uniform_int(&mut self, n: usize) -> usize;

    fn shuffle_in_place<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.uniform_int(i + 1);
            items.swap(i, j);
        }
    }
}

/// Cryptographically secure source backed by the thread-local CSPRNG.
pub struct SecureRng(ThreadRng);

impl SecureRng {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(rand::rng())
    }

    pub fn random_seed(&mut self) -> u64 {
        self.0.random()
    }
}

impl RngSource for SecureRng {
    fn uniform_int(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        self.0.random_range(0..n)
    }
}

/// Deterministic source: the same seed yields the same draw sequence.
pub struct SeededRng(StdRng);

impl SeededRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RngSource for SeededRng {
    fn uniform_int(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        self.0.random_range(0..n)
    }
}

// Unambiguous alphabet: no 0/O and no 1/I/L.
const LOBBY_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTVWXYZ23456789";

/// Generate an alphanumeric lobby code from the unambiguous alphabet.
pub fn generate_lobby_code(rng: &mut impl RngSource) -> String {
    (0..LOBBY_CODE_LENGTH)
        .map(|_| LOBBY_CODE_ALPHABET[rng.uniform_int(LOBBY_CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = SeededRng::from_seed(99);
        let mut b = SeededRng::from_seed(99);
        let xs: Vec<usize> = (0..32).map(|_| a.uniform_int(1000)).collect();
        let ys: Vec<usize> = (0..32).map(|_| b.uniform_int(1000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn uniform_int_stays_in_range() {
        let mut rng = SeededRng::from_seed(1);
        for n in 1..64 {
            for _ in 0..16 {
                assert!(rng.uniform_int(n) < n.max(1));
            }
        }
        assert_eq!(rng.uniform_int(0), 0);
    }

    #[test]
    fn lobby_code_shape() {
        let mut rng = SecureRng::new();
        let code = generate_lobby_code(&mut rng);
        assert_eq!(code.len(), LOBBY_CODE_LENGTH);
        for ch in code.chars() {
            assert!(LOBBY_CODE_ALPHABET.contains(&(ch as u8)), "char {ch}");
            assert!(!"0O1IL".contains(ch));
        }
    }

    #[test]
    fn lobby_codes_differ() {
        let mut rng = SecureRng::new();
        let a = generate_lobby_code(&mut rng);
        let b = generate_lobby_code(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn shuffle_permutes_all_elements() {
        let mut rng = SeededRng::from_seed(3);
        let mut xs: Vec<u32> = (0..50).collect();
        rng.shuffle_in_place(&mut xs);
        let mut sorted = xs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
