//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with two independent secrets, so a
//! leaked access token cannot be exchanged for new sessions and vice versa.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (120 minutes) - stateless, never persisted
    Access,
    /// Long-lived refresh token (7 days) - persisted for revocation
    Refresh,
}

/// Claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 120 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 120 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Signing and verification keys for both token kinds.
#[derive(Clone)]
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

/// A freshly signed token together with its timestamps.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

impl TokenKeys {
    /// Create token keys from the two secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_uuid: &str) -> Result<IssuedToken, JwtError> {
        self.generate(user_uuid, TokenType::Access)
    }

    /// Generate a refresh token for a user.
    /// The caller is responsible for persisting it so it can be revoked.
    pub fn generate_refresh_token(&self, user_uuid: &str) -> Result<IssuedToken, JwtError> {
        self.generate(user_uuid, TokenType::Refresh)
    }

    fn generate(&self, user_uuid: &str, token_type: TokenType) -> Result<IssuedToken, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let (key, duration) = match token_type {
            TokenType::Access => (&self.access_encoding, ACCESS_TOKEN_DURATION_SECS),
            TokenType::Refresh => (&self.refresh_encoding, REFRESH_TOKEN_DURATION_SECS),
        };
        let exp = now + duration;

        let claims = Claims {
            sub: user_uuid.to_string(),
            token_type,
            iat: now,
            exp,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, key).map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Validate and decode an access token.
    /// Failure is a value, never a panic, so callers can branch into
    /// uniform HTTP rejections.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        Self::validate(token, &self.access_decoding, TokenType::Access)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        Self::validate(token, &self.refresh_decoding, TokenType::Refresh)
    }

    fn validate(token: &str, key: &DecodingKey, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
