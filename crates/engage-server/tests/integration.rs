use axum::http::StatusCode;
use engage_server::state::{AppState, BoardEvent};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_workspace(dir: &TempDir) {
    engage_core::config::Config::new("test-workspace")
        .save(dir.path())
        .unwrap();
}

fn app(dir: &TempDir) -> axum::Router {
    init_workspace(dir);
    engage_server::build_router(dir.path().to_path_buf())
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

async fn post(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Project ACME with To Do = [A, B, C] and In Progress = [D].
/// Returns the item ids in that order.
async fn scenario(app: &axum::Router) -> Vec<String> {
    let (status, _) = post(app, "/api/projects", json!({ "name": "Acme", "key": "ACME" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let mut ids = Vec::new();
    for (title, status) in [("A", "to_do"), ("B", "to_do"), ("C", "to_do"), ("D", "in_progress")] {
        let (code, item) = post(
            app,
            "/api/projects/ACME/items",
            json!({ "title": title, "status": status }),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED, "{item}");
        ids.push(item["id"].as_str().unwrap().to_string());
    }
    ids
}

fn column_titles(board: &Value, index: usize) -> Vec<String> {
    board["columns"][index]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uninitialized_workspace_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = engage_server::build_router(dir.path().to_path_buf());
    let (status, body) = get(&app, "/api/projects").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not initialized"));
}

#[tokio::test]
async fn project_create_list_and_lookup_by_key() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, created) = post(
        &app,
        "/api/projects",
        json!({ "name": "Acme GTM", "key": "acme", "client": "Acme Corp" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["key"], "ACME");

    let (status, list) = get(&app, "/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, by_key) = get(&app, "/api/projects/acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_key["id"], created["id"]);

    let (status, _) = post(&app, "/api/projects", json!({ "name": "Dup", "key": "ACME" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/projects/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Move engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_item_reorders_board() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let ids = scenario(&app).await;

    let (status, moved) = post(
        &app,
        &format!("/api/items/{}/move", ids[1]),
        json!({ "status": "In Progress", "index": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["status"], "in_progress");
    assert_eq!(moved["order"], 0);

    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 0), vec!["A", "C"]);
    assert_eq!(column_titles(&board, 1), vec!["B", "D"]);
    assert_eq!(board["columns"][1]["label"], "In Progress");
    assert_eq!(board["columns"][0]["items"][1]["order"], 1);
}

#[tokio::test]
async fn move_item_errors_map_to_statuses() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let ids = scenario(&app).await;
    let uri = format!("/api/items/{}/move", ids[0]);

    let (status, _) = post(&app, &uri, json!({ "status": "in_review", "index": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, &uri, json!({ "status": "done", "index": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        &uri,
        json!({ "status": "complete", "index": 0, "project_id": "someone-else" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/items/missing/move",
        json!({ "status": "complete", "index": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 0), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn update_and_delete_item() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let ids = scenario(&app).await;

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/items/{}", ids[2]),
        Some(json!({ "title": "C2", "points": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "C2");

    let (status, _) = send(&app, "DELETE", &format!("/api/items/{}", ids[0]), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 0), vec!["B", "C2"]);

    let (status, item) = get(&app, "/api/items/ACME-3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["order"], 1);
}

#[tokio::test]
async fn item_routes_accept_references() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    scenario(&app).await;

    let (status, moved) = post(
        &app,
        "/api/items/ACME-1/move",
        json!({ "status": "complete", "index": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["status"], "complete");

    let (status, _) = send(&app, "DELETE", "/api/items/ACME-3", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, "/api/items/ACME-3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", "/api/items/ACME-3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 0), vec!["B"]);
    assert_eq!(column_titles(&board, 5), vec!["A"]);
}

// ---------------------------------------------------------------------------
// Sprints and tasks
// ---------------------------------------------------------------------------

async fn sprint_with_items(app: &axum::Router, ids: &[String]) -> String {
    let (status, sprint) = post(app, "/api/projects/ACME/sprints", json!({ "name": "Wave 1" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let sprint_id = sprint["id"].as_str().unwrap().to_string();
    for id in ids {
        let (status, _) = post(
            app,
            &format!("/api/items/{id}/assign"),
            json!({ "sprint_id": sprint_id }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    sprint_id
}

#[tokio::test]
async fn start_without_items_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    scenario(&app).await;
    let sprint_id = sprint_with_items(&app, &[]).await;

    let (status, body) = post(&app, &format!("/api/sprints/{sprint_id}/start"), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    let (_, sprints) = get(&app, "/api/projects/ACME/sprints").await;
    assert_eq!(sprints[0]["status"], "not_started");
}

#[tokio::test]
async fn sprint_start_work_and_complete() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let ids = scenario(&app).await;
    let sprint_id = sprint_with_items(&app, &ids[..2]).await;

    let (status, tasks) = post(&app, &format!("/api/sprints/{sprint_id}/start"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{tasks}");
    let tasks = tasks.as_array().unwrap().clone();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["order"], 0);
    assert_eq!(tasks[1]["order"], 1);

    let complete_uri = format!("/api/sprints/{sprint_id}/complete");
    let (status, body) = post(&app, &complete_uri, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("ACME-1"));

    for (i, t) in tasks.iter().enumerate() {
        let (status, _) = post(
            &app,
            &format!("/api/tasks/{}/move", t["id"].as_str().unwrap()),
            json!({ "status": "complete", "index": i }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 5), vec!["A", "B"]);

    let (status, sprint) = post(&app, &complete_uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sprint["status"], "completed");
    let (_, remaining) = get(&app, "/api/projects/ACME/tasks").await;
    assert!(remaining.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sprint_delete_unassigns_items() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let ids = scenario(&app).await;
    let sprint_id = sprint_with_items(&app, &ids[2..3]).await;
    post(&app, &format!("/api/sprints/{sprint_id}/start"), json!({})).await;

    let (status, body) = send(&app, "DELETE", &format!("/api/sprints/{sprint_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items_unassigned"], 1);

    let (_, item) = get(&app, &format!("/api/items/{}", ids[2])).await;
    assert!(item["sprint_id"].is_null());
    let (_, tasks) = get(&app, "/api/projects/ACME/task-board").await;
    assert!(tasks["columns"][0]["items"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Epics, collections, events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collection_import_under_epic() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    scenario(&app).await;

    let (_, epic) = post(&app, "/api/projects/ACME/epics", json!({ "title": "Launch" })).await;
    let (status, collection) = post(
        &app,
        "/api/collections",
        json!({
            "name": "Launch kit",
            "stories": [{ "title": "Interviews", "points": 3 }, { "title": "Messaging" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, items) = post(
        &app,
        &format!("/api/collections/{}/import", collection["id"].as_str().unwrap()),
        json!({ "project": "ACME", "epic_id": epic["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{items}");
    assert_eq!(items[0]["order"], 3);
    assert_eq!(items[1]["order"], 4);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/epics/{}", epic["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items_removed"], 2);
    let (_, board) = get(&app, "/api/projects/ACME/board").await;
    assert_eq!(column_titles(&board, 0), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn committed_changes_are_broadcast() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    let state = AppState::new(dir.path().to_path_buf());
    let mut rx = state.event_tx.subscribe();
    let app = engage_server::router(state);

    post(&app, "/api/projects", json!({ "name": "Acme", "key": "ACME" })).await;
    assert_eq!(rx.recv().await.unwrap(), BoardEvent::ProjectsChanged);

    let (_, item) = post(&app, "/api/projects/ACME/items", json!({ "title": "A" })).await;
    match rx.recv().await.unwrap() {
        BoardEvent::ItemsChanged { project_id } => assert_eq!(project_id, item["project_id"]),
        other => panic!("unexpected event {other:?}"),
    }

    // Failed mutations broadcast nothing.
    post(&app, "/api/projects", json!({ "name": "Dup", "key": "ACME" })).await;
    assert!(rx.try_recv().is_err());
}
