use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token type accepted for API calls. Tokens minted for other purposes
/// (refresh, etc.) never authenticate a request.
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// Authenticated identity derived from a verified access token.
///
/// Lives for one request only and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    pub user_id: i64,
    pub is_admin: bool,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "type")]
    pub token_type: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The token cannot authenticate anyone: bad signature, wrong algorithm,
    /// missing or malformed claims, expired, or not an access token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The verifier itself is unusable.
    #[error("signing key not configured")]
    KeyNotConfigured,
}

impl AuthError {
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, AuthError::InvalidToken(_))
    }
}

/// Turns a bearer token into a [`Principal`].
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Principal, AuthError>;
}

/// HS256 access-token verifier. Holds only the immutable signing key, so one
/// instance is shared by every request without locking.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(sign_key: &str) -> Self {
        // Only HS256 is accepted; any other header algorithm is rejected
        // before the signature is looked at.
        let validation = Validation::new(Algorithm::HS256);

        let key = if sign_key.is_empty() {
            None
        } else {
            Some(DecodingKey::from_secret(sign_key.as_bytes()))
        };

        Self { key, validation }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("configured", &self.key.is_some())
            .finish()
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::KeyNotConfigured)?;

        let token_data = decode::<AccessClaims>(token, key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(format!("unable to parse claims: {}", e)))?;

        let claims = token_data.claims;
        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(AuthError::InvalidToken(format!(
                "unexpected token type {:?}",
                claims.token_type
            )));
        }

        Ok(Principal {
            user_id: claims.user_id,
            is_admin: claims.admin,
        })
    }
}
