//! Identity for Tether clients.
//!
//! Every request carries a bearer token; an [`IdentityProvider`] turns it into
//! the numeric id of the user it was issued to. The shipped provider is a
//! signed HS256 JWT whose `sub` claim is the user id.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tether_config::{AuthConfig, MAX_TOKEN_TTL_SECONDS};
use thiserror::Error;
use tracing::{debug, warn};

pub type UserId = i64;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token subject is not a user id")]
    InvalidSubject,
    #[error("failed to create token: {0}")]
    TokenCreation(String),
}

/// Resolves a bearer token to the id of the authenticated user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// HS256 token issuer and verifier.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl JwtAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        if config.uses_dev_secret() {
            warn!("auth.jwt_secret is the development default; set TETHER__AUTH__JWT_SECRET in production");
        }

        // Configs that skipped validation are clamped rather than overflowing chrono.
        let ttl_seconds = i64::try_from(config.token_ttl_seconds.min(MAX_TOKEN_TTL_SECONDS))
            .unwrap_or_default();

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        if user_id <= 0 {
            return Err(AuthError::InvalidSubject);
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::TokenCreation("token lifetime overflows".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::TokenCreation(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        let user_id = data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidSubject)?;
        if user_id <= 0 {
            return Err(AuthError::InvalidSubject);
        }

        debug!(user_id, "verified bearer token");
        Ok(user_id)
    }
}

#[async_trait]
impl IdentityProvider for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify(token)
    }
}
