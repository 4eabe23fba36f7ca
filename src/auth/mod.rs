//! Authentication for gardenhub
//!
//! Account registration and login live in a separate service. This crate
//! only verifies the bearer tokens that service issues.

pub mod jwt;

pub use jwt::{extract_token_from_header, AuthUser, Claims, JwtValidator, TokenValidationResult};
