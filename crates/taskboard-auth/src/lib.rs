//! Authentication primitives for taskboard

pub mod jwt;
pub mod password;

pub use jwt::{JwtClaims, JwtError, JwtValidator, SessionToken, TOKEN_TYPE_SESSION};
pub use password::{check_password_strength, hash_password, verify_password, PasswordError};
