// ARCHITECTURE: Security Module - Request Governance Layer
//
// Every inbound request passes through this module before any business
// handler runs:
// 1. RATE LIMITING: per-IP sliding window admission control
// 2. AUTHENTICATION: opaque bearer session tokens and long-lived API keys
// 3. IDENTITY RESOLUTION: a single AuthContext bound to the request for
//    downstream handlers
//
// Each component owns its own lock; no component holds its lock while
// calling into another.

pub mod api_keys;
pub mod credentials;
pub mod gate;
pub mod middleware;
pub mod rate_limiter;

pub use api_keys::{ApiKey, ApiKeyStore, ApiKeySummary};
pub use credentials::{CredentialStore, CredentialStoreConfig, Session, User};
pub use gate::{AuthContext, AuthGate, AuthMethod};
pub use rate_limiter::{RateLimitStatus, RateLimiter, RateLimiterConfig};

use rand::{Rng, distributions::Alphanumeric};

// Opaque token/secret generator shared by sessions and API keys.
// 43 alphanumeric characters carry log2(62) * 43 ≈ 256 bits of entropy.
pub(crate) const TOKEN_LENGTH: usize = 43;

pub(crate) fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_tokens_are_unique_and_sized() {
        let a = random_token();
        let b = random_token();

        assert_eq!(a.len(), TOKEN_LENGTH);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
