/// Session token generation and validation
///
/// Login sessions are carried by signed bearer tokens (HS256). A token
/// encodes the user's identity; the auth gate validates it on every
/// protected request and attaches the identity explicitly, so no handler
/// reads ambient session state.
///
/// # Token lifetime
///
/// - Standard login: 24 hours
/// - "Remember me" login: 30 days
///
/// # Example
///
/// ```
/// use taskfolio_shared::auth::token::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::new(user_id, "alice".to_string(), false);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
///
/// let validated = validate_token(&token, "secret-key-at-least-32-bytes-long!!")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "taskfolio";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token failed validation (bad signature, malformed, wrong issuer)
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Login name, carried so handlers can log/display it without a lookup
    pub username: String,

    /// Issuer - always "taskfolio"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a new login session
    ///
    /// `remember` extends the session from 24 hours to 30 days.
    pub fn new(user_id: Uuid, username: String, remember: bool) -> Self {
        let now = Utc::now();
        let lifetime = if remember {
            Duration::days(30)
        } else {
            Duration::hours(24)
        };

        Self {
            sub: user_id,
            username,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

/// Creates a signed session token from claims
///
/// # Errors
///
/// Returns `TokenError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a session token and extracts its claims
///
/// Verifies the signature, expiration, and issuer.
///
/// # Errors
///
/// - `TokenError::Expired` if the session has expired
/// - `TokenError::Invalid` for any other validation failure
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss"]);

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        }
    })?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "alice".to_string(), false);
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.username, "alice");
        assert_eq!(validated.iss, "taskfolio");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims::new(Uuid::new_v4(), "alice".to_string(), false);
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, "another-secret-also-32-bytes-long!!");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_remember_me_extends_lifetime() {
        let short = Claims::new(Uuid::new_v4(), "alice".to_string(), false);
        let long = Claims::new(Uuid::new_v4(), "alice".to_string(), true);
        assert!(long.exp > short.exp);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validate_token("not.a.token", SECRET).is_err());
    }
}
