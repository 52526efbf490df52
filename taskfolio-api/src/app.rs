/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskfolio_api::{app::AppState, config::Config};
/// use taskfolio_shared::storage::AttachmentStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let store = AttachmentStore::new(&config.uploads.dir).await?;
/// let state = AppState::new(pool, config, store);
/// let app = taskfolio_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskfolio_shared::auth::middleware::authenticate;
use taskfolio_shared::calendar::google::TokenSet;
use taskfolio_shared::storage::AttachmentStore;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Maximum accepted request body, bounds attachment uploads (16 MiB)
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// How long a consent flow may stay pending before its state token dies
const STATE_TTL: Duration = Duration::from_secs(600);

/// A state token waiting for its OAuth callback
#[derive(Debug)]
struct PendingState {
    user_id: Uuid,
    created_at: Instant,
}

/// In-memory Google OAuth session store
///
/// Holds the pending `state` tokens handed out by the authorize step and
/// the token sets obtained after the callback. Both maps are keyed so that
/// one user's OAuth flow can never touch another's tokens. Abandoned
/// consent flows expire after [`STATE_TTL`], so the pending map cannot
/// grow without bound. Entries do not survive a restart; users simply
/// re-run the consent flow.
#[derive(Debug, Default)]
pub struct OauthSessions {
    /// Outstanding anti-forgery state tokens, mapped to the user who
    /// started the flow
    pending_states: RwLock<HashMap<String, PendingState>>,

    /// Per-user Google token sets
    tokens: RwLock<HashMap<Uuid, TokenSet>>,
}

impl OauthSessions {
    /// Records a state token for a user starting the consent flow
    ///
    /// Expired entries from abandoned flows are evicted on the way in.
    pub async fn remember_state(&self, state: String, user_id: Uuid) {
        let mut states = self.pending_states.write().await;
        states.retain(|_, pending| pending.created_at.elapsed() < STATE_TTL);
        states.insert(
            state,
            PendingState {
                user_id,
                created_at: Instant::now(),
            },
        );
    }

    /// Consumes a state token, returning the user who issued it
    ///
    /// Each state is single-use: a replayed callback finds nothing.
    /// Tokens older than [`STATE_TTL`] are treated as unknown.
    pub async fn take_state(&self, state: &str) -> Option<Uuid> {
        let pending = self.pending_states.write().await.remove(state)?;
        if pending.created_at.elapsed() >= STATE_TTL {
            return None;
        }
        Some(pending.user_id)
    }

    /// Stores the token set obtained for a user
    pub async fn set_tokens(&self, user_id: Uuid, tokens: TokenSet) {
        self.tokens.write().await.insert(user_id, tokens);
    }

    /// Returns a copy of the user's current token set, if any
    pub async fn get_tokens(&self, user_id: Uuid) -> Option<TokenSet> {
        self.tokens.read().await.get(&user_id).cloned()
    }
}

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Attachment storage
    pub store: AttachmentStore,

    /// HTTP client for outbound Google API calls
    pub http: reqwest::Client,

    /// Google OAuth session store
    pub oauth: Arc<OauthSessions>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, store: AttachmentStore) -> Self {
        Self {
            db,
            config: Arc::new(config),
            store,
            http: reqwest::Client::new(),
            oauth: Arc::new(OauthSessions::default()),
        }
    }

    /// Gets the session secret for token operations
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                    # Health check (public)
/// ├── /v1/                       # API v1 (versioned)
/// │   ├── /auth/
/// │   │   ├── POST /register     # (public)
/// │   │   ├── POST /login        # (public)
/// │   │   ├── GET  /profile
/// │   │   ├── PUT  /profile
/// │   │   └── PUT  /password
/// │   ├── /tasks/                # Task CRUD, filters, toggle
/// │   ├── /uploads/:filename     # Attachment download
/// │   ├── /categories/           # Category CRUD
/// │   ├── /calendar/             # Calendar feed + iCalendar export
/// │   └── /google/               # Google Calendar OAuth + sync
/// │       └── GET /callback      # (public; identity carried by state)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes open to anonymous callers
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    // Account routes for the authenticated user
    let auth_protected = Router::new()
        .route(
            "/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .route("/password", put(routes::auth::update_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/toggle", post(routes::tasks::toggle_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let upload_routes = Router::new()
        .route("/:filename", get(routes::tasks::download_attachment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/:id",
            get(routes::categories::get_category)
                .put(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let calendar_routes = Router::new()
        .route("/events", get(routes::calendar::calendar_events))
        .route("/export", get(routes::calendar::export_ics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let google_protected = Router::new()
        .route("/auth", get(routes::calendar::google_auth))
        .route("/sync", post(routes::calendar::google_sync))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    // Google redirects the browser here without our Authorization header,
    // so the callback is public; the state token carries the identity.
    let google_public =
        Router::new().route("/callback", get(routes::calendar::google_callback));

    let v1_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .nest("/tasks", task_routes)
        .nest("/uploads", upload_routes)
        .nest("/categories", category_routes)
        .nest("/calendar", calendar_routes)
        .nest("/google", google_protected.merge(google_public));

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Session token authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects the caller's `AuthUser` into request extensions.
async fn session_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let user = authenticate(auth_header, state.session_secret())?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_oauth_state_is_single_use() {
        let sessions = OauthSessions::default();
        let user_id = Uuid::new_v4();

        sessions.remember_state("abc123".to_string(), user_id).await;
        assert_eq!(sessions.take_state("abc123").await, Some(user_id));
        assert_eq!(sessions.take_state("abc123").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_oauth_state_expires() {
        let sessions = OauthSessions::default();
        let user_id = Uuid::new_v4();

        sessions
            .remember_state("stale".to_string(), user_id)
            .await;
        tokio::time::advance(STATE_TTL + Duration::from_secs(1)).await;

        assert_eq!(sessions.take_state("stale").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_states_evicted_on_insert() {
        let sessions = OauthSessions::default();
        let user_id = Uuid::new_v4();

        sessions
            .remember_state("old".to_string(), user_id)
            .await;
        tokio::time::advance(STATE_TTL + Duration::from_secs(1)).await;
        sessions
            .remember_state("fresh".to_string(), user_id)
            .await;

        let states = sessions.pending_states.read().await;
        assert!(!states.contains_key("old"));
        assert!(states.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_oauth_tokens_are_per_user() {
        let sessions = OauthSessions::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        sessions
            .set_tokens(
                alice,
                TokenSet {
                    access_token: "tok-a".to_string(),
                    refresh_token: None,
                    expires_at: None,
                },
            )
            .await;

        assert_eq!(
            sessions.get_tokens(alice).await.map(|t| t.access_token),
            Some("tok-a".to_string())
        );
        assert!(sessions.get_tokens(bob).await.is_none());
    }
}
