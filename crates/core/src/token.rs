//! Opaque token generation for share and approval links.
//!
//! A token is the sole authorization for the action it gates, so it must be
//! unguessable and collision-checked per category before use; the
//! coordinator owns the collision check against the store, this module only
//! produces candidates. Tokens embed no decodable secret and carry no
//! expiry.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub const TOKEN_LENGTH: usize = 32;

/// How often issuance retries a colliding candidate before giving up.
pub const MAX_ISSUE_ATTEMPTS: usize = 5;

pub trait TokenIssuer: Send + Sync {
    fn issue(&self) -> String;
}

/// Production issuer: 32 alphanumeric characters from the thread RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{RandomTokenIssuer, TokenIssuer, TOKEN_LENGTH};

    #[test]
    fn tokens_are_alphanumeric_and_fixed_length() {
        let token = RandomTokenIssuer.issue();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn repeated_issuance_does_not_repeat() {
        let issuer = RandomTokenIssuer;
        let tokens: HashSet<String> = (0..256).map(|_| issuer.issue()).collect();
        assert_eq!(tokens.len(), 256);
    }
}
