//! JWT session tokens

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Issuer written into every token minted by the API
pub const ISSUER: &str = "taskboard";

/// Audience written into every token minted by the API
pub const AUDIENCE: &str = "taskboard-api";

/// Token type accepted by the API middleware
pub const TOKEN_TYPE_SESSION: &str = "session";

/// JWT claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Role of the user when the token was issued (informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    /// Token type ("session")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl JwtClaims {
    pub fn new(subject: String, issuer: String, audience: String, validity: Duration) -> Self {
        let now = Utc::now();
        let exp = now + validity;

        Self {
            sub: subject,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: issuer,
            aud: audience,
            user_role: None,
            token_type: None,
        }
    }

    /// Session claims for a user
    pub fn session(user_id: Uuid, role: &str, validity: Duration) -> Self {
        Self::new(
            user_id.to_string(),
            ISSUER.to_string(),
            AUDIENCE.to_string(),
            validity,
        )
        .with_user_role(role.to_string())
        .with_token_type(TOKEN_TYPE_SESSION.to_string())
    }

    pub fn with_user_role(mut self, role: String) -> Self {
        self.user_role = Some(role);
        self
    }

    pub fn with_token_type(mut self, token_type: String) -> Self {
        self.token_type = Some(token_type);
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Parse the subject as a user ID
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject(self.sub.clone()))
    }

    pub fn is_session(&self) -> bool {
        self.token_type.as_deref() == Some(TOKEN_TYPE_SESSION)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token subject '{0}'")]
    InvalidSubject(String),
}

/// A freshly minted session token
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT validator using HMAC-SHA256
pub struct JwtValidator {
    secret: Vec<u8>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Create a validator for the given secret
    ///
    /// Checks the signature and expiration. Issuer and audience are only checked once
    /// set with [`with_issuer`](Self::with_issuer) and [`with_audience`](Self::with_audience).
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;

        Self {
            secret: secret.to_vec(),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Validator pinned to the API's own issuer and audience
    pub fn for_sessions(secret: &[u8]) -> Self {
        Self::new(secret)
            .with_issuer(ISSUER.to_string())
            .with_audience(AUDIENCE.to_string())
    }

    pub fn with_audience(mut self, audience: String) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    /// Mint a session token signed with this validator's secret
    pub fn issue_session(
        &self,
        user_id: Uuid,
        role: &str,
        validity: Duration,
    ) -> Result<SessionToken, JwtError> {
        let claims = JwtClaims::session(user_id, role, validity);
        let token = Self::encode(&self.secret, &claims)?;

        Ok(SessionToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Encode JWT using HMAC-SHA256
    pub fn encode(secret: &[u8], claims: &JwtClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret);

        Ok(encode(&header, claims, &encoding_key)?)
    }
}
