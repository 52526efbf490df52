/// Task model and database operations
///
/// Tasks are the core entity of Taskfolio: to-do items with an optional due
/// date, a three-state status, a priority, an optional category, and an
/// optional stored attachment.
///
/// # Status cycle
///
/// ```text
/// pending → in_progress → completed → pending
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('Low', 'Medium', 'High');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     due_date DATE,
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'Medium',
///     file_path VARCHAR(500),
///     category_id UUID REFERENCES categories(id),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskfolio_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
/// use taskfolio_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     user_id: Uuid::new_v4(),
///     title: "Finish lab report".to_string(),
///     description: Some("Sections 3 and 4".to_string()),
///     due_date: Some("2025-03-10".parse()?),
///     status: TaskStatus::Pending,
///     priority: TaskPriority::High,
///     category_id: None,
///     file_path: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet (the default)
    Pending,

    /// Work has begun
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Parses a status from its wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    /// Advances to the next status in the cycle
    ///
    /// pending → in_progress → completed → pending
    pub fn next(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

/// Task priority
///
/// Stored and serialized capitalized (`Low`/`Medium`/`High`), matching the
/// form values the clients submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Converts priority to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }

    /// Parses a priority from its wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(TaskPriority::Low),
            "Medium" => Some(TaskPriority::Medium),
            "High" => Some(TaskPriority::High),
            _ => None,
        }
    }

    /// Numeric iCalendar priority (RFC 5545: 1 is most urgent, 9 least)
    pub fn ical_priority(&self) -> u32 {
        match self {
            TaskPriority::High => 1,
            TaskPriority::Medium => 5,
            TaskPriority::Low => 9,
        }
    }

    /// Display color for calendar views
    pub fn color(&self) -> &'static str {
        match self {
            TaskPriority::High => "#dc3545",
            TaskPriority::Medium => "#ffc107",
            TaskPriority::Low => "#28a745",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Short title (required, non-empty)
    pub title: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// Optional due date (date only, no time component)
    pub due_date: Option<NaiveDate>,

    /// Completion status
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// Generated storage name of the attachment, if any
    ///
    /// Never the user-supplied file name; see `storage::AttachmentStore::save`.
    pub file_path: Option<String>,

    /// Optional category reference
    pub category_id: Option<Uuid>,

    /// Owning user
    pub user_id: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<Uuid>,
    pub file_path: Option<String>,
}

/// Input for replacing the mutable fields of a task
///
/// Edits are whole-field replacements: every field here overwrites the
/// stored value, including clearing `due_date` with None. `file_path` is
/// handled separately because replacing an attachment has a storage side
/// effect.
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<Uuid>,
}

/// Conjunctive filters for listing tasks
///
/// Absence of a filter means "no constraint", never "match empty". The
/// free-text filter is a case-insensitive substring match against title OR
/// description.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring to match against title or description
    pub text: Option<String>,

    /// Exact status match
    pub status: Option<TaskStatus>,

    /// Exact priority match
    pub priority: Option<TaskPriority>,

    /// Exact category match
    pub category_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, title, description, due_date, status, priority, \
                            file_path, category_id, user_id, created_at, updated_at";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, due_date, status, priority,
                               file_path, category_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, due_date, status, priority,
                      file_path, category_id, user_id, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.file_path)
        .bind(data.category_id)
        .bind(data.user_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID (not owner-filtered)
    ///
    /// The caller decides between "not found" and "access denied" by
    /// comparing `user_id` against the authenticated identity.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task of `user_id` by its stored attachment name
    ///
    /// Used by the attachment download endpoint to verify the requester
    /// owns a task referencing the file.
    pub async fn find_by_file_name(
        pool: &PgPool,
        user_id: Uuid,
        file_name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 AND file_path = $2"
        ))
        .bind(user_id)
        .bind(file_name)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks owned by `user_id`, intersected with `filter`, newest first
    ///
    /// All filters are conjunctive. The query is built dynamically so that
    /// absent filters add no clause at all.
    pub async fn list_filtered(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1");
        let mut bind_count = 1;

        if filter.text.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${n} OR description ILIKE ${n})",
                n = bind_count
            ));
        }
        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${}", bind_count));
        }
        if filter.category_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND category_id = ${}", bind_count));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(ref text) = filter.text {
            q = q.bind(format!("%{}%", escape_like(text)));
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(category_id) = filter.category_id {
            q = q.bind(category_id);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Lists all due-dated tasks owned by `user_id`
    ///
    /// Used by the calendar bridge; tasks without a due date are excluded
    /// at the query level.
    pub async fn list_due_dated(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE user_id = $1 AND due_date IS NOT NULL \
             ORDER BY due_date ASC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Replaces the mutable fields of a task
    ///
    /// `updated_at` is bumped to now.
    ///
    /// # Returns
    ///
    /// The updated task, or None if it no longer exists.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, due_date = $4, status = $5,
                priority = $6, category_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, due_date, status, priority,
                      file_path, category_id, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.category_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Sets the stored attachment name
    pub async fn set_file_path(
        pool: &PgPool,
        id: Uuid,
        file_path: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET file_path = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(file_path)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the status
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, due_date, status, priority,
                      file_path, category_id, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task by ID
    ///
    /// The stored attachment, if any, must be cleaned up by the caller
    /// (best effort) before the record goes away.
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Escapes LIKE metacharacters so user text matches literally
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cycle_length_three() {
        for start in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed] {
            assert_eq!(start.next().next().next(), start);
        }
        assert_eq!(TaskStatus::Pending.next(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.next(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.next(), TaskStatus::Pending);
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
        assert_eq!(TaskStatus::parse(""), None);
    }

    #[test]
    fn test_priority_parse_is_case_sensitive() {
        assert_eq!(TaskPriority::parse("High"), Some(TaskPriority::High));
        assert_eq!(TaskPriority::parse("high"), None);
        assert_eq!(TaskPriority::parse("Urgent"), None);
    }

    #[test]
    fn test_ical_priority_mapping() {
        assert_eq!(TaskPriority::High.ical_priority(), 1);
        assert_eq!(TaskPriority::Medium.ical_priority(), 5);
        assert_eq!(TaskPriority::Low.ical_priority(), 9);
    }

    #[test]
    fn test_priority_colors() {
        assert_eq!(TaskPriority::High.color(), "#dc3545");
        assert_eq!(TaskPriority::Medium.color(), "#ffc107");
        assert_eq!(TaskPriority::Low.color(), "#28a745");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
    }

    #[test]
    fn test_filter_default_is_unconstrained() {
        let filter = TaskFilter::default();
        assert!(filter.text.is_none());
        assert!(filter.status.is_none());
        assert!(filter.priority.is_none());
        assert!(filter.category_id.is_none());
    }
}
