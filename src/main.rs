//! Community Board Backend
//!
//! REST backend for a community board with SQLite persistence: tag
//! reconciliation for posts, nested comment threads and a merged post and
//! review search feed.

mod api;
mod comments;
mod config;
mod db;
mod errors;
mod models;
mod search;
mod tags;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use search::SearchAggregator;
use tags::TagReconciler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub tags: Arc<TagReconciler>,
    pub search: Arc<SearchAggregator<Repository>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the engine components to one repository.
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let tags = Arc::new(TagReconciler::default());
        let search = Arc::new(SearchAggregator::new(
            repo.clone(),
            config.search_timeout,
            config.search_merge,
        ));

        Self {
            repo,
            tags,
            search,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Community Board Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        "Search: {:?} merge, {:?} per-source timeout",
        config.search_merge,
        config.search_timeout
    );

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Users
        .route("/users", get(api::list_users).post(api::create_user))
        .route("/users/{id}", get(api::get_user))
        // Categories
        .route("/categories", get(api::list_categories))
        // Posts
        .route("/posts", get(api::list_posts).post(api::create_post))
        .route(
            "/posts/{id}",
            get(api::get_post)
                .patch(api::update_post)
                .delete(api::delete_post),
        )
        // Comments
        .route("/posts/{id}/comments", post(api::create_comment))
        .route("/comments/{id}/upvote", post(api::upvote_comment))
        // Reviews
        .route("/reviews", post(api::create_review))
        .route("/reviews/{id}", get(api::get_review))
        // Tags
        .route("/tags", get(api::list_tags))
        // Search
        .route("/search", get(api::search));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
