//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use sdlcflow::aggregate::Artifact;
use sdlcflow::core::RunStatus;
use sdlcflow::errors::SdlcflowError;
use sdlcflow::store::OutputStore;
use sdlcflow::workflow::SdlcWorkflow;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "sdlcflow";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    workflow: Option<Arc<SdlcWorkflow>>,
    store: OutputStore,
}

impl AppState {
    /// Creates state around a ready workflow.
    pub fn new(workflow: SdlcWorkflow, store: OutputStore) -> Self {
        Self {
            workflow: Some(Arc::new(workflow)),
            store,
        }
    }

    /// Creates state for a server whose agents could not be set up.
    ///
    /// Read-only routes keep working; `/analyze` answers 500.
    pub fn without_workflow(store: OutputStore) -> Self {
        Self {
            workflow: None,
            store,
        }
    }
}

/// A JSON `{"error": ...}` response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SdlcflowError> for ApiError {
    fn from(err: SdlcflowError) -> Self {
        let status = match &err {
            SdlcflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SdlcflowError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Builds the router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/results/latest", get(latest_results))
        .route("/outputs", get(list_outputs))
        .route("/outputs/{name}", get(read_output))
        .route("/status/{agent}", get(agent_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "agents_available": state.workflow.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    requirements: String,
    #[serde(default)]
    project_key: Option<String>,
}

async fn analyze(State(state): State<AppState>, Json(request): Json<AnalyzeRequest>) -> ApiResult {
    let Some(workflow) = state.workflow.as_ref() else {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Agent pipeline not available",
        ));
    };
    if request.requirements.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Requirements field is required",
        ));
    }

    let artifact = workflow
        .process(&request.requirements, request.project_key.as_deref())
        .await?;

    if artifact.status != RunStatus::Completed {
        let message = artifact
            .diagnostics
            .first()
            .cloned()
            .unwrap_or_else(|| format!("Pipeline {}", artifact.status));
        error!(status = %artifact.status, error = %message, "Analysis failed");
        return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message));
    }

    if let Err(e) = state.store.persist(&artifact).await {
        warn!(error = %e, "Failed to persist artifacts");
    }
    info!(summary = %artifact.jira_artifacts.summary, "Analysis completed");

    Ok(Json(json!({
        "status": "success",
        "results": results_body(&artifact),
        "diagnostics": artifact.diagnostics,
    })))
}

fn results_body(artifact: &Artifact) -> Value {
    json!({
        "business_requirements": artifact.business_requirements,
        "jira_artifacts": artifact.jira_artifacts,
        "technical_design": artifact.technical_design,
        "diagrams": artifact.diagrams,
    })
}

async fn latest_results(State(state): State<AppState>) -> ApiResult {
    let latest = state.store.load_latest().await?;
    Ok(Json(json!({
        "status": "success",
        "results": {
            "business_requirements": latest.business_requirements.unwrap_or_default(),
            "jira_artifacts": latest.jira_artifacts.unwrap_or_else(|| json!({})),
            "technical_design": latest.technical_design.unwrap_or_default(),
            "diagrams": latest.diagrams,
        },
    })))
}

async fn list_outputs(State(state): State<AppState>) -> ApiResult {
    let files = state.store.list().await?;
    Ok(Json(json!({ "files": files })))
}

async fn read_output(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult {
    let content = state.store.read(&name).await.map_err(|e| match e {
        SdlcflowError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, "File not found"),
        other => other.into(),
    })?;
    Ok(Json(json!({ "filename": name, "content": content })))
}

async fn agent_status(Path(agent): Path<String>) -> Json<Value> {
    Json(json!({
        "agent": agent,
        "status": "ready",
        "last_execution": null,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use pretty_assertions::assert_eq;
    use sdlcflow::config::SdlcConfig;
    use sdlcflow::testing::{RecordingTrackerClient, ScriptedProvider};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BACKLOG: &str = r#"{"epics": [{"key": "E1", "title": "Accounts"}, {"key": "E2", "title": "Billing"}], "stories": []}"#;

    fn app(provider: ScriptedProvider, dir: &TempDir) -> Router {
        let workflow = SdlcWorkflow::new(
            Arc::new(provider),
            Arc::new(RecordingTrackerClient::new()),
            &SdlcConfig::default(),
        )
        .unwrap();
        router(AppState::new(workflow, OutputStore::new(dir.path())))
    }

    fn scripted() -> ScriptedProvider {
        ScriptedProvider::new()
            .respond("Senior Business Analyst", "# Requirements")
            .respond(
                "Senior System Architect",
                "```mermaid\ngraph TD\n    A[Web] --> B[API]\n```",
            )
            .respond("Senior Project Manager", BACKLOG)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(scripted(), &dir), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["agents_available"], true);

        let bare = router(AppState::without_workflow(OutputStore::new(dir.path())));
        let (_, body) = send(bare, get("/health")).await;
        assert_eq!(body["agents_available"], false);
    }

    #[tokio::test]
    async fn test_analyze_success_persists() {
        let dir = TempDir::new().unwrap();
        let app = app(scripted(), &dir);
        let (status, body) = send(
            app.clone(),
            post_json("/analyze", &json!({"requirements": "Users need accounts"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(
            body["results"]["jira_artifacts"]["summary"],
            "Created 2 epics and 0 stories in Jira"
        );
        assert_eq!(body["results"]["diagrams"][0]["title"], "Diagram 1");

        let (status, body) = send(app.clone(), get("/outputs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["files"],
            json!(["business_requirements.md", "jira_artifacts.json", "technical_design.md"])
        );

        let (_, body) = send(app, get("/results/latest")).await;
        assert_eq!(body["results"]["business_requirements"], "# Requirements");
        assert_eq!(body["results"]["jira_artifacts"]["epics"][1]["title"], "Billing");
    }

    #[tokio::test]
    async fn test_analyze_requires_requirements() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            app(scripted(), &dir),
            post_json("/analyze", &json!({"requirements": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Requirements field is required");
    }

    #[tokio::test]
    async fn test_analyze_stage_failure() {
        let dir = TempDir::new().unwrap();
        let provider = scripted().fail("Senior System Architect", "model overloaded");
        let (status, body) = send(
            app(provider, &dir),
            post_json("/analyze", &json!({"requirements": "Users need accounts"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("model overloaded"));
        assert!(OutputStore::new(dir.path()).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_without_workflow() {
        let dir = TempDir::new().unwrap();
        let app = router(AppState::without_workflow(OutputStore::new(dir.path())));
        let (status, _) = send(app, post_json("/analyze", &json!({"requirements": "x"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_read_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("technical_design.md"), "# Design").unwrap();
        let app = app(scripted(), &dir);

        let (status, body) = send(app.clone(), get("/outputs/technical_design.md")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"filename": "technical_design.md", "content": "# Design"}));

        let (status, body) = send(app.clone(), get("/outputs/missing.md")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found");

        let (status, _) = send(app, get("/outputs/..%2Fsecret.md")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_status() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app(scripted(), &dir), get("/status/architect")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"agent": "architect", "status": "ready", "last_execution": null})
        );
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/analyze")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app(scripted(), &dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
