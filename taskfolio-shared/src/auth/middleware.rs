/// The request auth gate
///
/// Protected routes are wrapped by a middleware layer (installed in the API
/// crate) that validates the bearer token and inserts an [`AuthUser`] into
/// the request extensions. Handlers then take the identity as an explicit
/// argument via the extractor below; nothing reads ambient session state.
///
/// A request without a valid token is refused with 401 before the handler
/// runs, with no side effect.
///
/// # Example
///
/// ```ignore
/// async fn protected_handler(auth: AuthUser) -> String {
///     format!("Hello, {}!", auth.username)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::{validate_token, Claims, TokenError};

/// Error type for the auth gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header present
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("Invalid authorization format: {0}")]
    InvalidFormat(String),

    /// Token failed validation or has expired
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// The authenticated caller identity
///
/// Inserted into request extensions by the auth layer after successful
/// token validation. Every owner-scoped operation receives this explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Authenticated user ID
    pub id: Uuid,

    /// Login name from the token claims
    pub username: String,
}

impl AuthUser {
    /// Creates the identity from validated token claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.clone(),
        }
    }
}

/// Validates the Authorization header of a request
///
/// Returns the caller identity on success. This is the single entry point
/// the API's auth layer calls; keeping it here makes the gate testable
/// without a running server.
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if no Authorization header is present
/// - `AuthError::InvalidFormat` if the header is not `Bearer <token>`
/// - `AuthError::InvalidToken` if validation fails
pub fn authenticate(auth_header: Option<&str>, secret: &str) -> Result<AuthUser, AuthError> {
    let header = auth_header.ok_or(AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        TokenError::Expired => AuthError::InvalidToken("Session expired".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    Ok(AuthUser::from_claims(&claims))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::create_token;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn bearer_for(username: &str) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let claims = Claims::new(id, username.to_string(), false);
        let token = create_token(&claims, SECRET).unwrap();
        (id, format!("Bearer {}", token))
    }

    #[test]
    fn test_authenticate_valid_token() {
        let (id, header) = bearer_for("alice");
        let user = authenticate(Some(&header), SECRET).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_missing_header_refused() {
        let result = authenticate(None, SECRET);
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_non_bearer_header_refused() {
        let result = authenticate(Some("Basic dXNlcjpwYXNz"), SECRET);
        assert!(matches!(result, Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_tampered_token_refused() {
        let (_, header) = bearer_for("alice");
        let tampered = format!("{}x", header);
        let result = authenticate(Some(&tampered), SECRET);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
