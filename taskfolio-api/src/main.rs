//! # Taskfolio API Server
//!
//! JSON API for personal task management: accounts, tasks with due dates
//! and priorities, categories, file attachments, and a calendar bridge
//! (iCalendar export + Google Calendar sync).
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskfolio-api
//! ```

use taskfolio_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskfolio_shared::{
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool,
    },
    storage::AttachmentStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskfolio_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskfolio API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url).await?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&db).await?;

    let store = AttachmentStore::new(&config.uploads.dir).await?;
    tracing::info!("Storing attachments in {}", store.dir().display());

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
