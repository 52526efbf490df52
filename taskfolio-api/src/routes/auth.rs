/// Authentication and account endpoints
///
/// This module provides user authentication and account management:
/// - Registration
/// - Login
/// - Profile view and update
/// - Password change
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get a session token
/// - `GET /v1/auth/profile` - Current user's profile
/// - `PUT /v1/auth/profile` - Update username/email
/// - `PUT /v1/auth/password` - Change password

use crate::{
    app::AppState,
    error::{validation_errors, ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskfolio_shared::{
    auth::{middleware::AuthUser, password, token},
    models::user::{CreateUser, User},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 3, max = 80, message = "Username must be 3-80 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Password repeated, must match
    pub confirm_password: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// User ID
    pub user_id: String,

    /// Login name
    pub username: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login name
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password
    pub password: String,

    /// Extends the session token lifetime from 24 hours to 30 days
    #[serde(default)]
    pub remember: bool,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Login name
    pub username: String,

    /// Bearer session token
    pub token: String,
}

/// Profile response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// User ID
    pub user_id: String,

    /// Login name
    pub username: String,

    /// Email address
    pub email: String,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New login name
    #[validate(length(min = 3, max = 80, message = "Username must be 3-80 characters"))]
    pub username: String,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    /// Current password, verified before any change
    pub current_password: String,

    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,

    /// New password repeated, must match
    pub confirm_password: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "sam",
///   "email": "sam@example.com",
///   "password": "SecureP@ss123",
///   "confirm_password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or passwords don't match
/// - `409 Conflict`: Username or email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate().map_err(validation_errors)?;

    if req.password != req.confirm_password {
        return Err(ApiError::validation(
            "confirm_password",
            "Passwords do not match",
        ));
    }

    // Check both duplicates up front for friendlier messages; the unique
    // constraints still hold the line against races.
    if User::find_by_username(&state.db, &req.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id.to_string(),
            username: user.username,
        }),
    ))
}

/// Login endpoint
///
/// Authenticates a user and returns a Bearer session token. With
/// `"remember": true` the token lives 30 days instead of 24 hours.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials (deliberately does not say
///   whether the username or the password was wrong)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate().map_err(validation_errors)?;

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let claims = token::Claims::new(user.id, user.username.clone(), req.remember);
    let session_token = token::create_token(&claims, state.session_secret())?;

    tracing::info!(user_id = %user.id, remember = req.remember, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        username: user.username,
        token: session_token,
    }))
}

/// Returns the authenticated user's profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        user_id: user.id.to_string(),
        username: user.username,
        email: user.email,
    }))
}

/// Updates the authenticated user's username and email
///
/// # Errors
///
/// - `409 Conflict`: The new username or email belongs to another account
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    req.validate().map_err(validation_errors)?;

    // Duplicate checks must not trip over the caller's own row
    if let Some(existing) = User::find_by_username(&state.db, &req.username).await? {
        if existing.id != auth.id {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }
    }

    if let Some(existing) = User::find_by_email(&state.db, &req.email).await? {
        if existing.id != auth.id {
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }
    }

    let user = User::update_profile(&state.db, auth.id, &req.username, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        user_id: user.id.to_string(),
        username: user.username,
        email: user.email,
    }))
}

/// Changes the authenticated user's password
///
/// Verifies the current password before anything else, so a stolen token
/// alone is not enough to lock the account's owner out.
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdatePasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate().map_err(validation_errors)?;

    if req.new_password != req.confirm_password {
        return Err(ApiError::validation(
            "confirm_password",
            "Passwords do not match",
        ));
    }

    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = password::verify_password(&req.current_password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    let updated = User::update_password(&state.db, auth.id, &password_hash).await?;
    if !updated {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %auth.id, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_login_request_remember_defaults_to_false() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"sam","password":"pw"}"#).unwrap();
        assert!(!req.remember);
    }
}
