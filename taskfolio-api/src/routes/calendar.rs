/// Calendar endpoints
///
/// Bridges tasks into calendar form three ways: a JSON event feed for
/// calendar UIs, an iCalendar export, and a push to the user's primary
/// Google Calendar via OAuth.
///
/// # Endpoints
///
/// - `GET  /v1/calendar/events` - Due-dated tasks as calendar events
/// - `GET  /v1/calendar/export` - iCalendar (.ics) download
/// - `GET  /v1/google/auth` - Start the Google OAuth consent flow
/// - `GET  /v1/google/callback` - OAuth redirect target (public)
/// - `POST /v1/google/sync` - Push due-dated tasks to Google Calendar

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use taskfolio_shared::{
    auth::middleware::AuthUser,
    calendar::{google, ics},
    models::task::Task,
};

/// One task rendered as a calendar event
#[derive(Debug, Serialize)]
pub struct CalendarEvent {
    /// Task ID
    pub id: String,

    /// Task title
    pub title: String,

    /// Due date as `YYYY-MM-DD`
    pub start: String,

    /// API URL of the underlying task
    pub url: String,

    /// Priority display color
    pub color: String,
}

/// Query parameters Google appends to the OAuth callback
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Response of the authorize step
#[derive(Debug, Serialize)]
pub struct GoogleAuthResponse {
    /// Consent URL the client should send the user to
    pub auth_url: String,
}

/// Response of the sync step
#[derive(Debug, Serialize)]
pub struct GoogleSyncResponse {
    /// Number of tasks pushed
    pub synced: usize,
}

/// Due-dated tasks as JSON calendar events
///
/// Tasks without a due date are excluded. Colors follow priority:
/// High `#dc3545`, Medium `#ffc107`, Low `#28a745`.
pub async fn calendar_events(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let tasks = Task::list_due_dated(&state.db, auth.id).await?;

    let events = tasks
        .iter()
        .filter_map(|task| {
            let due = task.due_date?;
            Some(CalendarEvent {
                id: task.id.to_string(),
                title: task.title.clone(),
                start: due.format("%Y-%m-%d").to_string(),
                url: format!("/v1/tasks/{}", task.id),
                color: task.priority.color().to_string(),
            })
        })
        .collect();

    Ok(Json(events))
}

/// iCalendar export of all due-dated tasks
///
/// Served as a `text/calendar` attachment named `tasks.ics`; one all-day
/// event per due-dated task.
pub async fn export_ics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let tasks = Task::list_due_dated(&state.db, auth.id).await?;
    let body = ics::export_tasks(&tasks);

    let headers = [
        (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"tasks.ics\"",
        ),
    ];

    Ok((headers, body))
}

/// Starts the Google OAuth consent flow
///
/// Loads the configured client-secrets file, mints a single-use state
/// token bound to the caller, and returns the consent URL. A missing or
/// unreadable secrets file is reported as an upstream condition, not a
/// crash.
pub async fn google_auth(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<GoogleAuthResponse>> {
    let secrets = google::ClientSecrets::load(&state.config.google.client_secrets_file)?;

    let state_token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    state
        .oauth
        .remember_state(state_token.clone(), auth.id)
        .await;

    let auth_url = google::build_auth_url(
        &secrets,
        &state.config.google_redirect_uri(),
        &state_token,
    );

    Ok(Json(GoogleAuthResponse { auth_url }))
}

/// OAuth redirect target
///
/// Public route: Google redirects the browser here with no Authorization
/// header, so the caller's identity comes from the state token minted in
/// [`google_auth`]. Denial and other OAuth errors come back in the
/// `error` query parameter and are reported as one-line upstream
/// conditions.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    if let Some(error) = query.error {
        let message = if error == "access_denied" {
            "Google access was denied".to_string()
        } else {
            format!("Google authorization failed: {}", error)
        };
        return Err(ApiError::ExternalService(message));
    }

    let state_token = query
        .state
        .ok_or_else(|| ApiError::Unauthorized("Missing OAuth state".to_string()))?;

    let user_id = state
        .oauth
        .take_state(&state_token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Unknown or expired OAuth state".to_string()))?;

    let code = query.code.ok_or_else(|| {
        ApiError::ExternalService("Google returned no authorization code".to_string())
    })?;

    let secrets = google::ClientSecrets::load(&state.config.google.client_secrets_file)?;

    let tokens = google::exchange_code(
        &state.http,
        &secrets,
        &code,
        &state.config.google_redirect_uri(),
    )
    .await?;

    state.oauth.set_tokens(user_id, tokens).await;

    tracing::info!(user_id = %user_id, "Google Calendar connected");

    Ok(Json(serde_json::json!({ "status": "connected" })))
}

/// Pushes every due-dated task to the user's primary Google Calendar
///
/// Requires a completed consent flow. The access token is refreshed
/// first when it is expired or about to expire. Inserts run
/// sequentially; the first failure aborts the loop and is reported as
/// one line.
pub async fn google_sync(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<GoogleSyncResponse>> {
    let mut tokens = state
        .oauth
        .get_tokens(auth.id)
        .await
        .ok_or(google::GoogleError::NotAuthenticated)?;

    if tokens.needs_refresh() {
        let secrets = google::ClientSecrets::load(&state.config.google.client_secrets_file)?;
        tokens = google::refresh_tokens(&state.http, &secrets, &tokens).await?;
        state.oauth.set_tokens(auth.id, tokens.clone()).await;
    }

    let tasks = Task::list_due_dated(&state.db, auth.id).await?;
    let synced = google::sync_tasks(&state.http, &tokens.access_token, &tasks).await?;

    Ok(Json(GoogleSyncResponse { synced }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use taskfolio_shared::models::task::{TaskPriority, TaskStatus};
    use uuid::Uuid;

    fn due_task(title: &str, priority: TaskPriority) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            due_date: Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            status: TaskStatus::Pending,
            priority,
            file_path: None,
            category_id: None,
            user_id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_shape() {
        let task = due_task("Exam prep", TaskPriority::High);
        let event = CalendarEvent {
            id: task.id.to_string(),
            title: task.title.clone(),
            start: task.due_date.unwrap().format("%Y-%m-%d").to_string(),
            url: format!("/v1/tasks/{}", task.id),
            color: task.priority.color().to_string(),
        };

        assert_eq!(event.start, "2025-03-10");
        assert_eq!(event.color, "#dc3545");
        assert_eq!(event.url, format!("/v1/tasks/{}", task.id));
    }

    #[test]
    fn test_event_colors_follow_priority() {
        assert_eq!(due_task("a", TaskPriority::High).priority.color(), "#dc3545");
        assert_eq!(
            due_task("b", TaskPriority::Medium).priority.color(),
            "#ffc107"
        );
        assert_eq!(due_task("c", TaskPriority::Low).priority.color(), "#28a745");
    }
}
