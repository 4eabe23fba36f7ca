//! Bearer token handling
//!
//! Tokens are HS256 JWTs issued by the account service, which shares
//! `JWT_SECRET` with this process. `generate_token` exists so tests and
//! co-located issuers can mint tokens with the same claims.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{GardenError, Id};

/// Payload stored in a bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of token validation
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

impl TokenValidationResult {
    pub fn valid(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            claims: None,
            error: Some(error.into()),
        }
    }
}

/// The caller identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Id,
    pub username: String,
}

/// JWT validator and generator
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Returns an error if the secret is empty or shorter than 32 characters
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, GardenError> {
        if secret.is_empty() {
            return Err(GardenError::Config(
                "JWT_SECRET is required outside dev mode".into(),
            ));
        }

        if secret.len() < 32 {
            return Err(GardenError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Validator with a fixed built-in secret, for dev mode only
    pub fn new_dev() -> Self {
        Self {
            secret: "gardenhub-dev-secret-not-for-production-use".into(),
            expiry_seconds: 3600,
        }
    }

    pub fn generate_token(&self, user: &Id, username: &str) -> Result<String, GardenError> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| GardenError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    /// Verify and decode a token
    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::default();

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(token_data) => TokenValidationResult::valid(token_data.claims),
            Err(err) => {
                use jsonwebtoken::errors::ErrorKind;
                let error_msg = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidToken => "Invalid token",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Token validation failed",
                };
                TokenValidationResult::invalid(error_msg)
            }
        }
    }

    /// Resolve an Authorization header to the caller.
    ///
    /// Missing, invalid or expired tokens are `Unauthorized`, as is a token
    /// whose subject is not a well-formed user id.
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<AuthUser, GardenError> {
        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| GardenError::Unauthorized("No token, authorization denied".into()))?;

        let result = self.verify_token(token);
        let claims = match (result.valid, result.claims) {
            (true, Some(claims)) => claims,
            _ => {
                return Err(GardenError::Unauthorized(
                    result.error.unwrap_or_else(|| "Token is not valid".into()),
                ))
            }
        };

        let id = Id::parse(&claims.sub, "User")
            .map_err(|_| GardenError::Unauthorized("Token is not valid".into()))?;

        Ok(AuthUser {
            id,
            username: claims.username,
        })
    }
}

fn unix_now() -> Result<u64, GardenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| GardenError::Internal(format!("System time error: {}", e)))
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}
