//! Nonce generation.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::Rng;

/// Number of random bytes in a nonce (128 bits).
pub const NONCE_BYTES: usize = 16;

/// Creates a fresh nonce. Called at most once per request.
pub trait NonceProvider: Send + Sync {
    fn create_nonce(&self) -> String;
}

/// 128 random bits, standard base64 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonceProvider;

impl RandomNonceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl NonceProvider for RandomNonceProvider {
    fn create_nonce(&self) -> String {
        let mut rng = rand::rng();
        let bytes: [u8; NONCE_BYTES] = rng.random();
        STANDARD.encode(bytes)
    }
}

/// Always returns the same nonce. For tests and snapshot rendering.
#[derive(Debug, Clone)]
pub struct FixedNonceProvider {
    nonce: String,
}

impl FixedNonceProvider {
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
        }
    }
}

impl NonceProvider for FixedNonceProvider {
    fn create_nonce(&self) -> String {
        self.nonce.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_nonce_shape() {
        let nonce = RandomNonceProvider::new().create_nonce();
        let decoded = STANDARD.decode(&nonce).unwrap();
        assert_eq!(decoded.len(), NONCE_BYTES);
        assert_eq!(nonce.len(), 24);
    }

    #[test]
    fn test_random_nonces_differ() {
        let provider = RandomNonceProvider::new();
        assert_ne!(provider.create_nonce(), provider.create_nonce());
    }

    #[test]
    fn test_fixed_nonce() {
        let provider = FixedNonceProvider::new("abc");
        assert_eq!(provider.create_nonce(), "abc");
    }
}
