/// Category model and database operations
///
/// Categories group a user's tasks and carry a display color. The name is
/// unique per owner (case-sensitive). A category that still has tasks
/// attached cannot be deleted; this referential guard is enforced here at
/// the operation layer rather than left to a database constraint, so the
/// caller gets a distinct error instead of a generic constraint failure.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     color VARCHAR(7) NOT NULL DEFAULT '#007bff',
///     description VARCHAR(200),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     UNIQUE (user_id, name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Category model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique category ID (UUID v4)
    pub id: Uuid,

    /// Display name, unique per owner (case-sensitive)
    pub name: String,

    /// Display color as a hex string (e.g. "#007bff")
    pub color: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// When the category was created
    pub created_at: DateTime<Utc>,

    /// Owning user
    pub user_id: Uuid,
}

/// Input for creating or replacing a category
#[derive(Debug, Clone)]
pub struct CategoryInput {
    /// Display name
    pub name: String,

    /// Display color as a hex string
    pub color: String,

    /// Optional free-text description
    pub description: Option<String>,
}

impl Category {
    /// Creates a new category owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the (owner, name) pair already exists or the
    /// database is unreachable. Callers should check with
    /// [`Category::find_by_name`] first to surface a friendly duplicate
    /// error; the unique constraint is the backstop.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CategoryInput,
    ) -> Result<Self, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, color, description, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, color, description, created_at, user_id
            "#,
        )
        .bind(data.name)
        .bind(data.color)
        .bind(data.description)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    /// Finds a category by ID (not owner-filtered)
    ///
    /// The caller decides between "not found" and "access denied" by
    /// comparing `user_id` against the authenticated identity.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, color, description, created_at, user_id
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Finds a category of `user_id` by exact name
    ///
    /// The match is case-sensitive, mirroring the uniqueness rule.
    pub async fn find_by_name(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, color, description, created_at, user_id
            FROM categories
            WHERE user_id = $1 AND name = $2
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Lists all categories owned by `user_id`, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, color, description, created_at, user_id
            FROM categories
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    /// Replaces the mutable fields of a category
    ///
    /// # Returns
    ///
    /// The updated category, or None if it no longer exists.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: CategoryInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $2, color = $3, description = $4
            WHERE id = $1
            RETURNING id, name, color, description, created_at, user_id
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.color)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Counts tasks still referencing this category
    ///
    /// Used by the delete-time referential guard: a category with a
    /// non-zero count must not be deleted.
    pub async fn count_tasks(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE category_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Deletes a category by ID
    ///
    /// Callers must run the referential guard ([`Category::count_tasks`])
    /// first; this method does not re-check.
    ///
    /// # Returns
    ///
    /// True if the category was deleted, false if it didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_input() {
        let input = CategoryInput {
            name: "School".to_string(),
            color: "#007bff".to_string(),
            description: None,
        };

        assert_eq!(input.name, "School");
        assert!(input.description.is_none());
    }

    // Database-backed tests for the referential guard live with the
    // category route tests.
}
