pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router for the workspace at `root`.
pub fn build_router(root: PathBuf) -> Router {
    router(state::AppState::new(root))
}

/// Build the Router over existing state, e.g. to subscribe to events first.
pub fn router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Config
        .route("/api/config", get(routes::config::get_config))
        // Projects
        .route(
            "/api/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/api/projects/{project}", get(routes::projects::get_project))
        .route("/api/projects/{project}/board", get(routes::board::get_board))
        .route(
            "/api/projects/{project}/task-board",
            get(routes::board::get_task_board),
        )
        // Backlog items
        .route(
            "/api/projects/{project}/items",
            get(routes::items::list_items).post(routes::items::create_item),
        )
        .route(
            "/api/items/{id}",
            get(routes::items::get_item)
                .patch(routes::items::update_item)
                .delete(routes::items::delete_item),
        )
        .route("/api/items/{id}/move", post(routes::items::move_item))
        .route("/api/items/{id}/assign", post(routes::items::assign_item))
        // Epics
        .route(
            "/api/projects/{project}/epics",
            get(routes::epics::list_epics).post(routes::epics::create_epic),
        )
        .route(
            "/api/epics/{id}",
            axum::routing::delete(routes::epics::delete_epic),
        )
        // Sprints
        .route(
            "/api/projects/{project}/sprints",
            get(routes::sprints::list_sprints).post(routes::sprints::create_sprint),
        )
        .route(
            "/api/sprints/{id}",
            axum::routing::delete(routes::sprints::delete_sprint),
        )
        .route("/api/sprints/{id}/start", post(routes::sprints::start_sprint))
        .route(
            "/api/sprints/{id}/complete",
            post(routes::sprints::complete_sprint),
        )
        // Tasks
        .route("/api/projects/{project}/tasks", get(routes::tasks::list_tasks))
        .route("/api/tasks/{id}/move", post(routes::tasks::move_task))
        // Collections
        .route(
            "/api/collections",
            get(routes::collections::list_collections)
                .post(routes::collections::create_collection),
        )
        .route(
            "/api/collections/{id}/import",
            post(routes::collections::import_collection),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on a pre-bound listener, so the caller can learn the
/// actual port first when binding port 0.
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root);

    tracing::info!("engage API listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/projects");
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
