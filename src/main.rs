//! Takween Dashboard Backend
//!
//! REST backend for the Takween HR and project dashboard, with SQLite
//! persistence and Tantivy full-text search over tasks.

mod access;
mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod events;
mod insights;
mod models;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use events::NotificationHub;
use insights::InsightClient;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
    pub hub: NotificationHub,
    pub insights: InsightClient,
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

    tracing::info!("Starting Takween Dashboard Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (TAKWEEN_API_PSK). Authentication is disabled!");
    }
    if config.insight_url.is_none() {
        tracing::info!("No insight service configured; employee insights use the fallback text");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    if config.seed_demo_data && db::seed_demo_data(&repo).await? {
        tracing::info!("Seeded demo departments, employees and projects");
    }

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    tracing::info!("Building search index...");
    let tasks = repo.list_tasks().await?;
    search.rebuild(&tasks).await?;
    tracing::info!("Search index built with {} tasks", tasks.len());

    let hub = NotificationHub::new();
    hub.spawn_log_listener();

    let state = AppState {
        repo,
        search,
        insights: InsightClient::new(config.insight_url.clone()),
        config: Arc::new(config.clone()),
        hub,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Datastore
        .route("/datastore", get(api::get_datastore))
        .route("/datastore/revision", get(api::get_revision))
        // Tasks
        .route("/tasks", get(api::list_tasks).post(api::create_task))
        .route("/tasks/bulk", post(api::bulk_create_tasks))
        .route(
            "/tasks/{id}",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/tasks/{id}/status", put(api::move_task))
        .route("/tasks/{id}/toggle", post(api::toggle_task))
        .route("/tasks/{id}/comments", post(api::add_comment))
        .route("/tasks/{id}/attachments", post(api::add_attachment))
        .route("/board", get(api::get_board))
        // Employees
        .route("/employees", get(api::list_employees))
        .route("/employees/pending", get(api::list_pending_employees))
        .route("/employees/register", post(api::register_employee))
        .route("/employees/{id}", get(api::get_employee))
        .route("/employees/{id}/approve", post(api::approve_employee))
        .route("/employees/{id}/role", put(api::update_employee_role))
        .route("/employees/{id}/insight", get(api::get_employee_insight))
        // Projects
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route(
            "/projects/{id}",
            get(api::get_project).put(api::update_project),
        )
        .route("/projects/{id}/steps", post(api::add_project_step))
        // Sprints
        .route("/sprints", get(api::list_sprints).post(api::create_sprint))
        .route("/sprints/{id}", delete(api::delete_sprint))
        .route("/sprints/{id}/status", put(api::update_sprint_status))
        .route("/sprints/{id}/extensions", post(api::extend_sprint))
        // Settings
        .route(
            "/kpi-rules",
            get(api::list_kpi_rules).post(api::create_kpi_rule),
        )
        .route("/kpi-rules/{id}", delete(api::delete_kpi_rule))
        .route("/departments", get(api::list_departments))
        // Analytics
        .route("/analytics/kpi", get(api::get_kpi_report))
        .route("/analytics/dashboard", get(api::get_dashboard))
        // HR
        .route("/attendance", get(api::list_attendance))
        .route("/attendance/check-in", post(api::check_in))
        .route("/attendance/check-out", post(api::check_out))
        .route(
            "/leave-requests",
            get(api::list_leave_requests).post(api::create_leave_request),
        )
        .route(
            "/leave-requests/{id}/decision",
            put(api::decide_leave_request),
        )
        // Activity and search
        .route("/activity", get(api::list_activity))
        .route("/search", get(api::search_tasks))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
