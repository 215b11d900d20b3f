//! Transport-id candidate generation.
//!
//! A transport id is an opaque random token: 9 symbols drawn from a 64-symbol
//! alphabet, giving a 64^9 keyspace in which collisions are astronomically
//! unlikely. Uniqueness against the store is still checked at issuance time.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The 64 symbols a transport id is drawn from.
pub const TRANSPORT_ID_ALPHABET: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyz-_ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Fixed length of every transport id.
pub const TRANSPORT_ID_LEN: usize = 9;

/// Store key under which a transport id's pseudonym is filed.
pub fn tid_key(transport_id: &str) -> String {
    format!("tid:{transport_id}")
}

/// Draws transport-id candidates from a cryptographically adequate source.
pub struct TransportIdGenerator {
    rng: Mutex<StdRng>,
}

impl TransportIdGenerator {
    /// Generator seeded from OS entropy; the production configuration.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// One random candidate; occupancy against the store is the caller's job.
    pub fn candidate(&self) -> String {
        let mut rng = self.rng.lock().expect("rng mutex poisoned");
        (0..TRANSPORT_ID_LEN)
            .map(|_| TRANSPORT_ID_ALPHABET[rng.gen_range(0..TRANSPORT_ID_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_use_the_fixed_alphabet_and_length() {
        let generator = TransportIdGenerator::with_seed(101_620);
        for _ in 0..100 {
            let candidate = generator.candidate();
            assert_eq!(candidate.len(), TRANSPORT_ID_LEN);
            assert!(candidate
                .bytes()
                .all(|b| TRANSPORT_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn seeded_generators_are_deterministic() {
        let a = TransportIdGenerator::with_seed(7);
        let b = TransportIdGenerator::with_seed(7);
        assert_eq!(a.candidate(), b.candidate());
    }

    #[test]
    fn keys_carry_the_tid_prefix() {
        assert_eq!(tid_key("aB3-x9_Qr"), "tid:aB3-x9_Qr");
    }
}
