/// Category endpoints
///
/// Categories group a user's tasks. Names are unique per owner; a category
/// still referenced by tasks cannot be deleted.
///
/// # Endpoints
///
/// - `GET    /v1/categories` - List the caller's categories
/// - `POST   /v1/categories` - Create category
/// - `GET    /v1/categories/:id` - Fetch one category
/// - `PUT    /v1/categories/:id` - Update category
/// - `DELETE /v1/categories/:id` - Delete category (if unused)

use crate::{
    app::AppState,
    error::{validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskfolio_shared::{
    auth::middleware::AuthUser,
    models::category::{Category, CategoryInput},
};
use uuid::Uuid;
use validator::Validate;

/// Category create/update request
#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    /// Display name
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// Display color as a hex string; defaults to the standard blue
    #[validate(length(min = 4, max = 7, message = "Color must be a hex string like #007bff"))]
    #[serde(default = "default_color")]
    pub color: String,

    /// Optional free-text description
    #[validate(length(max = 200, message = "Description must be at most 200 characters"))]
    pub description: Option<String>,
}

fn default_color() -> String {
    "#007bff".to_string()
}

impl CategoryRequest {
    fn into_input(self) -> CategoryInput {
        CategoryInput {
            name: self.name,
            color: self.color,
            description: self.description.filter(|d| !d.is_empty()),
        }
    }
}

/// Loads a category and enforces ownership
async fn load_owned_category(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> ApiResult<Category> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    if category.user_id != auth.id {
        return Err(ApiError::AccessDenied(
            "You don't have access to this category".to_string(),
        ));
    }

    Ok(category)
}

/// Lists the caller's categories, newest first
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = Category::list_for_user(&state.db, auth.id).await?;
    Ok(Json(categories))
}

/// Creates a category
///
/// # Errors
///
/// - `409 Conflict`: The caller already has a category with this name
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    req.validate().map_err(validation_errors)?;

    if Category::find_by_name(&state.db, auth.id, &req.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Category name already exists".to_string(),
        ));
    }

    let category = Category::create(&state.db, auth.id, req.into_input()).await?;

    tracing::info!(category_id = %category.id, user_id = %auth.id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// Fetches one category
pub async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let category = load_owned_category(&state, &auth, id).await?;
    Ok(Json(category))
}

/// Updates a category
///
/// # Errors
///
/// - `409 Conflict`: Another of the caller's categories has the new name
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    req.validate().map_err(validation_errors)?;

    load_owned_category(&state, &auth, id).await?;

    // The duplicate check must not trip over the category being renamed
    if let Some(existing) = Category::find_by_name(&state.db, auth.id, &req.name).await? {
        if existing.id != id {
            return Err(ApiError::Conflict(
                "Category name already exists".to_string(),
            ));
        }
    }

    let category = Category::update(&state.db, id, req.into_input())
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Deletes a category
///
/// # Errors
///
/// - `409 Conflict`: Tasks still reference the category
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_owned_category(&state, &auth, id).await?;

    let task_count = Category::count_tasks(&state.db, id).await?;
    if task_count > 0 {
        return Err(ApiError::CategoryInUse { task_count });
    }

    Category::delete(&state.db, id).await?;

    tracing::info!(category_id = %id, user_id = %auth.id, "Category deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_defaults_when_absent() {
        let req: CategoryRequest = serde_json::from_str(r#"{"name":"School"}"#).unwrap();
        assert_eq!(req.color, "#007bff");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        let req = CategoryRequest {
            name: String::new(),
            color: "#000000".to_string(),
            description: None,
        };
        assert!(req.validate().is_err());

        let req = CategoryRequest {
            name: "x".repeat(51),
            color: "#000000".to_string(),
            description: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_description_becomes_none() {
        let req = CategoryRequest {
            name: "School".to_string(),
            color: "#000000".to_string(),
            description: Some(String::new()),
        };
        assert!(req.into_input().description.is_none());
    }
}
