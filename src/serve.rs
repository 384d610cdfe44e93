use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::database::{Database, DatabaseConfig};
use crate::graph::{Edge, Node};
use crate::layout::{LayoutDirection, directed_layout, grid_layout};
use crate::settings::{BoardSettings, BoardSettingsPatch};
use crate::user_settings::UserSettings;

/// Arguments for running the Backyard board service
#[derive(Debug, Clone, Parser)]
#[command(name = "backyard serve", about = "Start the board settings and layout API server.")]
pub struct ServeArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5151)]
    pub port: u16,

    /// SQLite database file (defaults to BACKYARD_DB_PATH or backyard.db).
    #[arg(long = "database")]
    pub database: Option<std::path::PathBuf>,
}

#[derive(Clone)]
pub struct ServeState {
    db: Database,
}

impl ServeState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsQuery {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsWriteRequest<T> {
    user_id: String,
    settings: T,
}

#[derive(Debug, Serialize)]
struct SettingsPayload {
    settings: Option<BoardSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectedLayoutRequest {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    direction: LayoutDirection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridLayoutRequest {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    cards_per_row: Option<usize>,
}

#[derive(Debug, Serialize)]
struct LayoutPayload {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

pub fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route(
            "/api/settings",
            get(get_settings).post(post_settings).patch(patch_settings),
        )
        .route("/api/layout/directed", post(post_directed_layout))
        .route("/api/layout/grid", post(post_grid_layout))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = DatabaseConfig::default();
    if let Some(path) = args.database.clone() {
        config.path = path;
    }
    let db = Database::new(config).await?;
    let app = router(Arc::new(ServeState::new(db)));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

    tracing::info!("backyard server listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

fn require_user(user_id: Option<String>) -> Result<String, (StatusCode, String)> {
    match user_id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err((StatusCode::BAD_REQUEST, "userId is required".to_string())),
    }
}

async fn get_settings(
    State(state): State<Arc<ServeState>>,
    Query(query): Query<SettingsQuery>,
) -> Result<Json<SettingsPayload>, (StatusCode, String)> {
    let user_id = require_user(query.user_id)?;
    let record = UserSettings::get(state.db.pool(), &user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(SettingsPayload {
        settings: record.map(|record| record.settings),
    }))
}

async fn post_settings(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<SettingsWriteRequest<BoardSettings>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = require_user(Some(request.user_id))?;
    let record = UserSettings::upsert(state.db.pool(), &user_id, &request.settings)
        .await
        .map_err(internal_error)?;
    tracing::debug!(user_id = %user_id, "board settings replaced");
    Ok(Json(SettingsPayload {
        settings: Some(record.settings),
    }))
}

async fn patch_settings(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<SettingsWriteRequest<BoardSettingsPatch>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = require_user(Some(request.user_id))?;
    if request.settings.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no settings fields to update".to_string()));
    }
    let record = UserSettings::patch(state.db.pool(), &user_id, &request.settings)
        .await
        .map_err(internal_error)?;
    tracing::debug!(user_id = %user_id, "board settings patched");
    Ok(Json(SettingsPayload {
        settings: Some(record.settings),
    }))
}

async fn post_directed_layout(
    Json(request): Json<DirectedLayoutRequest>,
) -> Result<Json<LayoutPayload>, (StatusCode, String)> {
    let (nodes, edges) = directed_layout(&request.nodes, &request.edges, request.direction)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    Ok(Json(LayoutPayload {
        nodes: nodes.into_owned(),
        edges: edges.into_owned(),
    }))
}

async fn post_grid_layout(Json(request): Json<GridLayoutRequest>) -> Json<LayoutPayload> {
    Json(LayoutPayload {
        nodes: grid_layout(&request.nodes, request.cards_per_row),
        edges: Vec::new(),
    })
}

fn internal_error(err: anyhow::Error) -> (StatusCode, String) {
    tracing::error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (TempDir, Router) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(DatabaseConfig {
            path: temp_dir.path().join("test.db"),
            max_connections: 1,
        })
        .await
        .unwrap();
        (temp_dir, router(Arc::new(ServeState::new(db))))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn settings_are_null_until_written() {
        let (_dir, app) = test_app().await;
        let (status, body) = send(&app, "GET", "/api/settings?userId=u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "settings": null }));
    }

    #[tokio::test]
    async fn post_then_patch_merges() {
        let (_dir, app) = test_app().await;
        let mut settings = serde_json::to_value(BoardSettings::default()).unwrap();
        settings["strokeWidth"] = json!(2.0);
        settings["edgeColor"] = json!("#000");

        let (status, _) = send(
            &app,
            "POST",
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": settings })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": { "edgeColor": "#fff" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["edgeColor"], json!("#fff"));
        assert_eq!(body["settings"]["strokeWidth"], json!(2.0));

        let (_, body) = send(&app, "GET", "/api/settings?userId=u1", None).await;
        assert_eq!(body["settings"]["edgeColor"], json!("#fff"));
    }

    #[tokio::test]
    async fn missing_user_is_bad_request() {
        let (_dir, app) = test_app().await;
        let (status, _) = send(&app, "GET", "/api/settings", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "PATCH",
            "/api/settings",
            Some(json!({ "userId": "u1", "settings": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn directed_layout_endpoint_rewires_edges() {
        let (_dir, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/layout/directed",
            Some(json!({
                "nodes": [
                    { "id": "a", "position": { "x": 0, "y": 0 } },
                    { "id": "b", "position": { "x": 0, "y": 0 } }
                ],
                "edges": [{ "id": "e1", "source": "a", "target": "b" }],
                "direction": "horizontal"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["edges"][0]["sourceHandle"], json!("right-source"));
        assert_eq!(body["nodes"][1]["targetPosition"], json!("left"));

        let (status, _) = send(
            &app,
            "POST",
            "/api/layout/directed",
            Some(json!({
                "nodes": [{ "id": "a", "position": { "x": 0, "y": 0 } }],
                "edges": [{ "id": "e1", "source": "a", "target": "nope" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn grid_layout_endpoint_packs_rows() {
        let (_dir, app) = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/layout/grid",
            Some(json!({
                "nodes": [
                    { "id": "a", "position": { "x": 0, "y": 0 } },
                    { "id": "b", "position": { "x": 0, "y": 0 } },
                    { "id": "c", "position": { "x": 0, "y": 0 } }
                ],
                "cardsPerRow": 2
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"][1]["position"]["y"], body["nodes"][0]["position"]["y"]);
        assert_eq!(body["nodes"][2]["position"]["x"], body["nodes"][0]["position"]["x"]);
    }
}
