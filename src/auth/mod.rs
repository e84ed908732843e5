use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ConfigError;

pub mod credentials;

/// Fixed bearer token lifetime.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Identity id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not match")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies HS256 bearer tokens against the server-held secret.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        // Expiry is checked against the injected clock, not the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    pub fn issue(&self, identity_id: Uuid) -> Result<String, TokenError> {
        let issued_at = self.clock.now();
        let claims = Claims {
            sub: identity_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::Malformed)?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn service(secret: &str) -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let tokens = TokenService::new(secret, clock.clone()).unwrap();
        (tokens, clock)
    }

    #[test]
    fn verifies_immediately_after_issuance() {
        let (tokens, _) = service("unit-secret");
        let id = Uuid::new_v4();
        let token = tokens.issue(id).unwrap();
        assert_eq!(tokens.verify(&token), Ok(id));
    }

    #[test]
    fn issuance_is_deterministic_for_a_fixed_instant() {
        let (tokens, _) = service("unit-secret");
        let id = Uuid::new_v4();
        assert_eq!(tokens.issue(id).unwrap(), tokens.issue(id).unwrap());
    }

    #[test]
    fn expires_at_the_seven_day_boundary() {
        let (tokens, clock) = service("unit-secret");
        let token = tokens.issue(Uuid::new_v4()).unwrap();

        clock.advance(Duration::days(TOKEN_LIFETIME_DAYS) - Duration::seconds(1));
        assert!(tokens.verify(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_tokens_are_malformed() {
        let (tokens, _) = service("unit-secret");
        let token = tokens.issue(Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let payload = &mut parts[1];
        let last = payload.pop().unwrap();
        payload.push(if last == 'A' { 'B' } else { 'A' });
        let tampered = parts.join(".");

        assert_eq!(tokens.verify(&tampered), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn tokens_from_another_secret_are_malformed() {
        let (ours, _) = service("unit-secret");
        let (theirs, _) = service("other-secret");
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert_eq!(ours.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        let clock = Arc::new(ManualClock::default());
        assert!(matches!(
            TokenService::new("", clock),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }
}
