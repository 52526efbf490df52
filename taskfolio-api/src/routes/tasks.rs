/// Task endpoints
///
/// Task CRUD, status toggling, filtered listing, and attachment download.
/// Create and update accept `multipart/form-data` so an attachment can ride
/// along with the fields; everything else is JSON.
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - List tasks with optional filters
/// - `POST   /v1/tasks` - Create task (multipart)
/// - `GET    /v1/tasks/:id` - Fetch one task
/// - `PUT    /v1/tasks/:id` - Replace a task's fields (multipart)
/// - `DELETE /v1/tasks/:id` - Delete task and its attachment
/// - `POST   /v1/tasks/:id/toggle` - Advance the status cycle
/// - `GET    /v1/uploads/:filename` - Download a stored attachment

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use taskfolio_shared::models::{
    category::Category,
    task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
};
use taskfolio_shared::auth::middleware::AuthUser;
use uuid::Uuid;

/// Raw string fields collected from a multipart task form
///
/// Collected in one pass over the stream, then converted to typed values
/// by [`parse_task_fields`]; the split keeps the conversion testable
/// without a multipart body.
#[derive(Debug, Default)]
pub struct TaskFormFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<String>,

    /// Original file name and contents of the uploaded attachment, if any
    pub file: Option<(String, Vec<u8>)>,
}

/// Typed, validated form values
#[derive(Debug)]
pub struct ParsedTaskFields {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<Uuid>,
}

/// Query parameters for the task list
///
/// Empty strings are treated the same as absent parameters, so a form
/// that submits all its filter inputs blank lists everything.
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub text: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category_id: Option<String>,
}

/// Reads every part of a multipart task form into raw fields
async fn collect_form(multipart: &mut Multipart) -> ApiResult<TaskFormFields> {
    let mut fields = TaskFormFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let original = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

            // Browsers send an empty file part when nothing was picked
            if let Some(original) = original {
                if !original.is_empty() && !bytes.is_empty() {
                    fields.file = Some((original, bytes.to_vec()));
                }
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;

        match name.as_str() {
            "title" => fields.title = Some(value),
            "description" => fields.description = Some(value),
            "due_date" => fields.due_date = Some(value),
            "status" => fields.status = Some(value),
            "priority" => fields.priority = Some(value),
            "category_id" => fields.category_id = Some(value),
            _ => {}
        }
    }

    Ok(fields)
}

/// Converts raw form fields to typed values
///
/// - empty/missing title → validation error
/// - missing status/priority → defaults (pending / Medium); present but
///   unknown → validation error
/// - empty due_date clears the date; a non-empty value must be
///   `YYYY-MM-DD` or the request fails with the offending value echoed
/// - empty category_id means "no category"
pub fn parse_task_fields(fields: &TaskFormFields) -> ApiResult<ParsedTaskFields> {
    let title = fields.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("title", "Title is required"));
    }

    let description = fields
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let due_date = match fields.due_date.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::DateParse {
                field: "due_date",
                value: raw.to_string(),
            }
        })?),
    };

    let status = match fields.status.as_deref() {
        None | Some("") => TaskStatus::Pending,
        Some(raw) => TaskStatus::parse(raw)
            .ok_or_else(|| ApiError::validation("status", "Unknown status"))?,
    };

    let priority = match fields.priority.as_deref() {
        None | Some("") => TaskPriority::Medium,
        Some(raw) => TaskPriority::parse(raw)
            .ok_or_else(|| ApiError::validation("priority", "Unknown priority"))?,
    };

    let category_id = match fields.category_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<Uuid>()
                .map_err(|_| ApiError::validation("category_id", "Invalid category ID"))?,
        ),
    };

    Ok(ParsedTaskFields {
        title,
        description,
        due_date,
        status,
        priority,
        category_id,
    })
}

/// Verifies a referenced category exists and belongs to the caller
async fn check_category(state: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<()> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::validation("category_id", "Unknown category"))?;

    if category.user_id != auth.id {
        return Err(ApiError::validation("category_id", "Unknown category"));
    }

    Ok(())
}

/// Loads a task and enforces ownership
///
/// Missing task → 404; someone else's task → 403.
async fn load_owned_task(state: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if task.user_id != auth.id {
        return Err(ApiError::AccessDenied(
            "You don't have access to this task".to_string(),
        ));
    }

    Ok(task)
}

/// Lists the caller's tasks, intersected with any filters
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let nonempty = |v: Option<String>| v.filter(|s| !s.is_empty());

    let status = match nonempty(query.status) {
        Some(raw) => Some(
            TaskStatus::parse(&raw)
                .ok_or_else(|| ApiError::validation("status", "Unknown status"))?,
        ),
        None => None,
    };

    let priority = match nonempty(query.priority) {
        Some(raw) => Some(
            TaskPriority::parse(&raw)
                .ok_or_else(|| ApiError::validation("priority", "Unknown priority"))?,
        ),
        None => None,
    };

    let category_id = match nonempty(query.category_id) {
        Some(raw) => Some(
            raw.parse::<Uuid>()
                .map_err(|_| ApiError::validation("category_id", "Invalid category ID"))?,
        ),
        None => None,
    };

    let filter = TaskFilter {
        text: nonempty(query.text),
        status,
        priority,
        category_id,
    };

    let tasks = Task::list_filtered(&state.db, auth.id, &filter).await?;

    Ok(Json(tasks))
}

/// Creates a task from a multipart form
///
/// A disallowed attachment extension is skipped silently: the task is
/// still created, just without an attachment reference.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let fields = collect_form(&mut multipart).await?;
    let parsed = parse_task_fields(&fields)?;

    if let Some(category_id) = parsed.category_id {
        check_category(&state, &auth, category_id).await?;
    }

    let file_path = match &fields.file {
        Some((original, contents)) => state.store.save(original, contents).await?,
        None => None,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.id,
            title: parsed.title,
            description: parsed.description,
            due_date: parsed.due_date,
            status: parsed.status,
            priority: parsed.priority,
            category_id: parsed.category_id,
            file_path,
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, user_id = %auth.id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Fetches one task
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_owned_task(&state, &auth, id).await?;
    Ok(Json(task))
}

/// Replaces a task's fields from a multipart form
///
/// Whole-field replacement: an empty due_date clears the stored one. A
/// new attachment replaces the old stored file, which is deleted first
/// (best effort).
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<Task>> {
    let existing = load_owned_task(&state, &auth, id).await?;

    let fields = collect_form(&mut multipart).await?;
    let parsed = parse_task_fields(&fields)?;

    if let Some(category_id) = parsed.category_id {
        check_category(&state, &auth, category_id).await?;
    }

    let mut task = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: parsed.title,
            description: parsed.description,
            due_date: parsed.due_date,
            status: parsed.status,
            priority: parsed.priority,
            category_id: parsed.category_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some((original, contents)) = &fields.file {
        if let Some(stored) = state.store.save(original, contents).await? {
            if let Some(old) = &existing.file_path {
                state.store.delete_best_effort(old).await;
            }
            Task::set_file_path(&state.db, id, Some(&stored)).await?;
            task.file_path = Some(stored);
        }
    }

    Ok(Json(task))
}

/// Deletes a task and its stored attachment
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = load_owned_task(&state, &auth, id).await?;

    // Attachment cleanup never blocks deleting the record
    if let Some(stored) = &task.file_path {
        state.store.delete_best_effort(stored).await;
    }

    Task::delete(&state.db, id).await?;

    tracing::info!(task_id = %id, user_id = %auth.id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Advances a task's status one step along the cycle
///
/// pending → in_progress → completed → pending
pub async fn toggle_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = load_owned_task(&state, &auth, id).await?;

    let updated = Task::set_status(&state.db, id, task.status.next())
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(updated))
}

/// Downloads a stored attachment
///
/// The requester must own a task referencing the file; anything else is
/// reported as 404 so the endpoint leaks nothing about other users'
/// attachments.
pub async fn download_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Task::find_by_file_name(&state.db, auth.id, &filename)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let contents = state.store.read(&filename).await?;

    // The stored name's prefix is internal; offer the sanitized original
    let download_name = filename
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(&filename)
        .to_string();

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        ),
    ];

    Ok((headers, contents))
}
