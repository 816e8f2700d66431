use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use goalplan_core::generator::OllamaGenerator;
use goalplan_core::{GoalRequest, Plan, PlanError, Planner, warm_up};

use crate::config::GoalplanConfig;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared, read-only state handed to every request.
///
/// `model_warm` is decided once by the startup warm-up and never changes
/// afterwards.
#[derive(Clone)]
pub struct AppState {
    planner: Arc<Planner>,
    model_warm: bool,
}

impl AppState {
    pub fn new(planner: Planner, model_warm: bool) -> Self {
        Self {
            planner: Arc::new(planner),
            model_warm,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError(PlanError);

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        Self(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let kind = self.0.kind();
        let body = match &self.0 {
            PlanError::ParseFailed { source, raw_output } => json!({
                "kind": kind,
                "error": "Failed to parse JSON from model output",
                "parse_error": source.to_string(),
                "raw_output": raw_output,
            }),
            PlanError::GenerationFailed {
                exit_code,
                stdout,
                stderr,
                ..
            } => json!({
                "kind": kind,
                "error": self.0.to_string(),
                "exit_code": exit_code,
                "stdout": stdout,
                "stderr": stderr,
            }),
            other => json!({ "kind": kind, "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model_warm: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Allow the configured browser origins with any method and header.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-plan", post(generate_plan))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &GoalplanConfig, skip_warmup: bool) -> Result<()> {
    tracing::info!(
        binary = %config.binary.display(),
        model = %config.model,
        "using model executable"
    );
    let generator = Arc::new(OllamaGenerator::new(&config.binary, &config.model));

    let model_warm = if skip_warmup {
        tracing::info!("skipping model warm-up");
        false
    } else {
        warm_up(generator.as_ref(), config.warmup_timeout).await
    };

    let planner = Planner::new(generator, config.pipeline);
    let app = build_router(
        AppState::new(planner, model_warm),
        cors_layer(&config.allowed_origins)?,
    );

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind, config.port))?;
    tracing::info!("goalplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("goalplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model_warm: state.model_warm,
    })
}

async fn generate_plan(
    State(state): State<AppState>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<Plan>, AppError> {
    let plan = state.planner.generate_plan(&request.goal).await?;
    Ok(Json(plan))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use goalplan_core::{PipelineConfig, Planner};
    use goalplan_test_utils::{PODCAST_OUTPUT, Scripted, ScriptedGenerator};

    use super::{AppState, build_router, cors_layer};
    use crate::config::ServerSection;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn app(generator: ScriptedGenerator, model_warm: bool) -> axum::Router {
        let planner = Planner::new(Arc::new(generator), PipelineConfig::default());
        let cors = cors_layer(&ServerSection::default().allowed_origins).unwrap();
        build_router(AppState::new(planner, model_warm), cors)
    }

    fn plan_request(goal: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate-plan")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "goal": goal }).to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_reports_warm_flag() {
        for warm in [true, false] {
            let resp = app(ScriptedGenerator::default(), warm)
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let json = body_json(resp).await;
            assert_eq!(json, serde_json::json!({ "ok": true, "model_warm": warm }));
        }
    }

    #[tokio::test]
    async fn test_generate_plan_success() {
        let resp = app(ScriptedGenerator::replying(PODCAST_OUTPUT), true)
            .oneshot(plan_request("Launch a podcast"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["goal"], "Launch a podcast");
        assert_eq!(json["totalDuration"], 30);
        assert_eq!(json["tasks"][0]["id"], 1);
        assert_eq!(json["tasks"][0]["priority"], "high");
        assert_eq!(json["tasks"][0]["effort"], "medium");
        assert_eq!(json["analysis"]["complexity"], "medium");

        let expected = chrono::Utc::now()
            .date_naive()
            .checked_add_days(chrono::Days::new(30))
            .unwrap();
        let completion = json["estimatedCompletion"].as_str().unwrap();
        // Allow for the date rolling over between the request and this check.
        let parsed = chrono::NaiveDate::parse_from_str(completion, "%Y-%m-%d").unwrap();
        assert!(
            parsed == expected || parsed + chrono::Days::new(1) == expected,
            "unexpected completion date {completion}"
        );
    }

    #[tokio::test]
    async fn test_generate_plan_timeout_is_504() {
        let resp = app(ScriptedGenerator::new([Scripted::TimedOut]), true)
            .oneshot(plan_request("g"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "generation_timeout");
        assert!(json["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_generate_plan_parse_failure_is_500_with_diagnostics() {
        let output = "Here is a plan: {\"goal\": \"g\", \"tasks\": [";
        let resp = app(ScriptedGenerator::replying(output), true)
            .oneshot(plan_request("g"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "parse_failed");
        assert_eq!(json["error"], "Failed to parse JSON from model output");
        assert!(
            json["parse_error"]
                .as_str()
                .unwrap()
                .contains("balanced JSON")
        );
        assert_eq!(json["raw_output"], output);
    }

    #[tokio::test]
    async fn test_generate_plan_process_failure_is_500() {
        let generator = ScriptedGenerator::new([Scripted::exit(1, "", "model not found")]);
        let resp = app(generator, false)
            .oneshot(plan_request("g"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["kind"], "generation_failed");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["stderr"], "model not found");
    }

    #[tokio::test]
    async fn test_generate_plan_invalid_schema_is_500() {
        let generator = ScriptedGenerator::replying(
            r#"{"goal": "g", "totalDuration": 3, "tasks": {"id": 1}, "analysis": {}}"#,
        );
        let resp = app(generator, true)
            .oneshot(plan_request("g"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["kind"], "invalid_schema");
    }

    #[tokio::test]
    async fn test_generate_plan_rejects_missing_goal() {
        let resp = app(ScriptedGenerator::default(), true)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate-plan")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"objective": "x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_cors_preflight_from_dev_origin() {
        for origin in ["http://localhost:5173", "http://127.0.0.1:5173"] {
            let resp = app(ScriptedGenerator::default(), true)
                .oneshot(
                    Request::builder()
                        .method("OPTIONS")
                        .uri("/api/generate-plan")
                        .header("origin", origin)
                        .header("access-control-request-method", "POST")
                        .header("access-control-request-headers", "content-type")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let headers = resp.headers();
            assert_eq!(headers["access-control-allow-origin"], origin);
            assert_eq!(headers["access-control-allow-credentials"], "true");
            assert_eq!(headers["access-control-allow-methods"], "POST");
        }
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let resp = app(ScriptedGenerator::default(), true)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            resp.headers().get("access-control-allow-origin").is_none(),
            "unknown origins must not be allowed"
        );
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        assert!(cors_layer(&["http://ok.example".into(), "bad\norigin".into()]).is_err());
    }
}
