//! API Service - HTTP front for energy audit sessions
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /template - Blank CSV template
//! - POST /preview - Run the ingestion pipeline without saving
//! - POST /sessions - Ingest a CSV into a new audit session
//! - GET /sessions - List sessions (newest first)
//! - GET /sessions/:id - Full session
//! - DELETE /sessions/:id - Remove a session
//! - GET /sessions/:id/report - Report for an analyzed session

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use energy_ingest::config::StoreSettings;
use energy_ingest::report::Report;
use energy_ingest::template::csv_template;
use energy_ingest::{
    ingest, AnyStore, AuditSession, BuildingInfo, IngestError, IngestOptions,
    ResolveMode, SessionStore, SessionSummary, StoreError, UsageBuckets,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Uploaded CSVs are small; this is generous
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// State
// ============================================================================

struct AppState {
    store: AnyStore,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct SessionsResponse {
    sessions: Vec<SessionSummary>,
}

fn default_true() -> bool {
    true
}

/// Pipeline switches shared by preview and session creation
#[derive(Deserialize)]
struct IngestFlags {
    #[serde(default)]
    lenient: bool,
    #[serde(default = "default_true")]
    include_other: bool,
}

impl IngestFlags {
    fn options(&self) -> IngestOptions {
        IngestOptions {
            mode: if self.lenient {
                ResolveMode::Lenient
            } else {
                ResolveMode::Strict
            },
            buckets: if self.include_other {
                UsageBuckets::WithOther
            } else {
                UsageBuckets::SystemsOnly
            },
        }
    }
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    building: BuildingInfo,
    csv: String,
    #[serde(flatten)]
    flags: IngestFlags,
}

#[derive(Deserialize)]
struct PreviewRequest {
    csv: String,
    #[serde(flatten)]
    flags: IngestFlags,
}

#[derive(Deserialize)]
struct ReportQuery {
    format: Option<String>,
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn ingest_error(e: IngestError) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        other => {
            error!("store failure: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn template_handler() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"energy_audit_template.csv\"",
            ),
        ],
        csv_template(),
    )
}

async fn preview_handler(Json(req): Json<PreviewRequest>) -> Response {
    match ingest(&req.csv, &req.flags.options()) {
        Ok(ingestion) => Json(ingestion).into_response(),
        Err(e) => ingest_error(e),
    }
}

async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let session = match AuditSession::start(req.building, &req.csv, &req.flags.options()) {
        Ok(s) => s,
        Err(e) => return ingest_error(e),
    };

    if let Err(e) = state.store.put(&session).await {
        return store_error(e);
    }

    info!(
        "created session {} ({} records, {} warnings)",
        session.id,
        session.ingestion.records.len(),
        session.ingestion.warnings.len()
    );
    (StatusCode::CREATED, Json(session)).into_response()
}

async fn list_sessions_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list().await {
        Ok(sessions) => Json(SessionsResponse {
            sessions: sessions.iter().map(AuditSession::summary).collect(),
        })
        .into_response(),
        Err(e) => store_error(e),
    }
}

async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.store.get(id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => store_error(e),
    }
}

async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.store.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error(e),
    }
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ReportQuery>,
) -> Response {
    let session = match state.store.get(id).await {
        Ok(s) => s,
        Err(e) => return store_error(e),
    };

    let Some(report) = Report::from_session(&session) else {
        return error_response(
            StatusCode::CONFLICT,
            format!("Session {} has not been analyzed yet", id),
        );
    };

    match params.format.as_deref() {
        Some("json") => Json(report).into_response(),
        _ => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            report.to_text(),
        )
            .into_response(),
    }
}

// ============================================================================
// Router
// ============================================================================

fn router(state: Arc<AppState>) -> Router {
    // CORS for web frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/template", get(template_handler))
        .route("/preview", post(preview_handler))
        .route(
            "/sessions",
            get(list_sessions_handler).post(create_session_handler),
        )
        .route(
            "/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/:id/report", get(report_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = StoreSettings::from_env().context("Invalid store configuration")?;
    let bind = std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    println!("=== Energy Audit API ===");
    println!("Opening session store...");

    let store = AnyStore::open(&settings)
        .await
        .context("Failed to open session store")?;

    println!("Store: {}", store.describe());

    let app = router(Arc::new(AppState { store }));

    println!("API listening on http://{}", bind);
    println!("\nEndpoints:");
    println!("  GET    /health");
    println!("  GET    /template");
    println!("  POST   /preview");
    println!("  POST   /sessions");
    println!("  GET    /sessions");
    println!("  GET    /sessions/:id");
    println!("  DELETE /sessions/:id");
    println!("  GET    /sessions/:id/report?format=text|json");

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use energy_ingest::template::template_header;
    use energy_ingest::FsStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(dir: &tempfile::TempDir) -> Router {
        router(Arc::new(AppState {
            store: AnyStore::Fs(FsStore::new(dir.path())),
        }))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn building() -> Value {
        json!({
            "name": "Main Office",
            "type": "commercial",
            "size": 25000,
            "location": "Austin, TX"
        })
    }

    async fn create(app: &Router) -> Value {
        let (status, body) = send(
            app,
            post_json("/sessions", json!({ "building": building(), "csv": csv_template() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&body).unwrap()
    }

    // -------------------------------------------------------------------------
    // Basics
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(&app(&dir), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["ok"], true);
    }

    #[tokio::test]
    async fn test_template_is_csv() {
        let dir = tempfile::tempdir().unwrap();
        let resp = app(&dir).oneshot(get("/template")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), csv_template());
    }

    // -------------------------------------------------------------------------
    // Preview
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_preview_returns_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let csv = format!("{}\n2024-01-01,100,0,0,0,0,0,0,0,0,0,0,0\n", template_header());
        let (status, body) = send(&app(&dir), post_json("/preview", json!({ "csv": csv }))).await;
        assert_eq!(status, StatusCode::OK);

        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["records"].as_array().unwrap().len(), 1);
        assert_eq!(v["records"][0]["label"], "2024-01-01");
        assert_eq!(v["records"][0]["electricity"], 100.0);
        assert_eq!(v["summary"]["recordCount"], 1);

        // nothing persisted
        let (_, body) = send(&app(&dir), get("/sessions")).await;
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert!(v["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_missing_headers_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            &app(&dir),
            post_json("/preview", json!({ "csv": "Date,Electricity\n2024-01-01,5\n" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert!(v["error"]
            .as_str()
            .unwrap()
            .starts_with("Missing required headers: "));
    }

    #[tokio::test]
    async fn test_preview_empty_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(&app(&dir), post_json("/preview", json!({ "csv": "" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            v["error"],
            "CSV file must contain headers and at least one row of data"
        );
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let created = create(&app).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["building"]["name"], "Main Office");
        assert_eq!(created["ingestion"]["records"].as_array().unwrap().len(), 7);

        let (status, body) = send(&app, get(&format!("/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched["id"], created["id"]);

        let (_, body) = send(&app, get("/sessions")).await;
        let list: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(list["sessions"].as_array().unwrap().len(), 1);
        assert_eq!(list["sessions"][0]["buildingName"], "Main Office");
        assert_eq!(list["sessions"][0]["analyzed"], false);

        let del = Request::builder()
            .method("DELETE")
            .uri(format!("/sessions/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, del).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get(&format!("/sessions/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_invalid_building_is_422() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = building();
        b["size"] = json!(0);
        let (status, _) = send(
            &app(&dir),
            post_json("/sessions", json!({ "building": b, "csv": csv_template() })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_create_without_other_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            &app(&dir),
            post_json(
                "/sessions",
                json!({ "building": building(), "csv": csv_template(), "include_other": false }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["ingestion"]["usageByArea"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(&app(&dir), get(&format!("/sessions/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Report
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_report_requires_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let created = create(&app).await;
        let uri = format!("/sessions/{}/report", created["id"].as_str().unwrap());
        let (status, _) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_report_for_analyzed_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let app = app(&dir);

        let created = create(&app).await;
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        let mut session = store.get(id).await.unwrap();
        session.record_analysis("**Findings**\n\nHVAC dominates usage.".to_string());
        store.put(&session).await.unwrap();

        let (status, body) = send(&app, get(&format!("/sessions/{}/report", id))).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("Energy Audit Report - Main Office\n"));
        assert!(text.contains("FINDINGS\nHVAC dominates usage."));

        let (status, body) = send(&app, get(&format!("/sessions/{}/report?format=json", id))).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["title"], "Energy Audit Report - Main Office");
        assert_eq!(v["analysis"][0]["isHeader"], true);
    }
}
