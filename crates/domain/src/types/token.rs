//! OAuth2 token issued by the case registry
//!
//! Exactly one token exists at any time; replacement is atomic at the store
//! level. Expiry is computed from the local persistence timestamp because
//! the registry's token response carries no issuance claim.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access and refresh tokens with expiry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryToken {
    pub access_token: String,

    pub refresh_token: String,

    /// Access token lifetime in seconds, as reported by the token endpoint.
    pub expires_in: i64,

    /// Local persistence time (UTC). Stamped when the row is written, not
    /// from any issuer-supplied claim.
    pub created_at: DateTime<Utc>,
}

impl RegistryToken {
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { access_token, refresh_token, expires_in, created_at }
    }

    /// Absolute expiry timestamp: `created_at + expires_in`.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Whether the token has expired at `now`, exact at the boundary.
    #[must_use]
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Seconds remaining until expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for types::token.
    use super::*;

    fn token_created(hours_ago: i64, expires_in: i64) -> RegistryToken {
        RegistryToken::new(
            "access".to_string(),
            "refresh".to_string(),
            expires_in,
            Utc::now() - Duration::hours(hours_ago),
        )
    }

    /// Validates `has_expired` for a token well past its lifetime.
    ///
    /// A token created 22 hours ago with a 30000 second (~8.3h) lifetime
    /// must report expired.
    #[test]
    fn token_past_lifetime_has_expired() {
        let token = token_created(22, 30_000);
        assert!(token.has_expired(Utc::now()));
    }

    /// Validates `has_expired` for a token still within its lifetime.
    #[test]
    fn fresh_token_has_not_expired() {
        let token = token_created(1, 30_000);
        assert!(!token.has_expired(Utc::now()));
    }

    /// Validates that expiry is exact at the boundary: `now == expires_at`
    /// counts as expired, one second earlier does not.
    #[test]
    fn expiry_is_exact_at_boundary() {
        let created = Utc::now();
        let token =
            RegistryToken::new("access".to_string(), "refresh".to_string(), 3600, created);

        let boundary = created + Duration::seconds(3600);
        assert!(token.has_expired(boundary));
        assert!(!token.has_expired(boundary - Duration::seconds(1)));
    }

    /// Validates `seconds_until_expiry` sign on both sides of the boundary.
    #[test]
    fn seconds_until_expiry_counts_down() {
        let created = Utc::now();
        let token =
            RegistryToken::new("access".to_string(), "refresh".to_string(), 3600, created);

        assert_eq!(token.seconds_until_expiry(created), 3600);
        assert!(token.seconds_until_expiry(created + Duration::seconds(3700)) < 0);
    }
}
