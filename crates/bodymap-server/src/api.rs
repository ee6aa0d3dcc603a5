use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, Request, State,
    },
    http::{HeaderMap, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use bodymap_core::input::{
    AssignmentPatch, FinalOptionPatch, MainColorPatch, NewAssignment, NewFinalOption,
    NewMainColor, NewSubFeeling, SubFeelingPatch,
};
use bodymap_core::preview::AssignmentPreview;
use bodymap_core::{
    AdminRef, Assignment, AssignmentId, AssignmentManager, AssignmentQuery, AssignmentSummary,
    NodeId,
};
use bodymap_store::Database;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::envelope::{Envelope, Reply};
use crate::error::ServerError;

/// Header carrying the acting admin's id.
const ADMIN_ID_HEADER: &str = "x-admin-id";

#[derive(Clone)]
pub struct AppState {
    /// One SQLite connection, one operation at a time.
    pub manager: Arc<Mutex<AssignmentManager<Database>>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(database: Database, config: ServerConfig) -> Self {
        Self {
            manager: Arc::new(Mutex::new(AssignmentManager::new(database))),
            config: Arc::new(config),
        }
    }

    /// Run one manager operation under the database lock on the blocking
    /// pool; rusqlite calls never run on an async worker.
    async fn run<T, F>(&self, op: F) -> Result<T, ServerError>
    where
        F: FnOnce(&AssignmentManager<Database>) -> bodymap_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let manager = self.manager.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            // Each write is one conditional statement; poisoning leaves no
            // partial state.
            let manager = manager.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            op(&manager)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database task failed");
            ServerError::Internal("Internal server error".into())
        })?;

        outcome.map_err(|e| ServerError::from_domain(e, self.config.expose_error_details))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let assignments = Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route(
            "/:id",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
        .route("/:id/duplicate", post(duplicate_assignment))
        .route("/:id/preview", get(preview_assignment))
        .route("/:id/publish", post(publish_assignment))
        .route("/:id/unpublish", post(unpublish_assignment))
        .route("/:id/main-colors", post(add_main_color))
        .route(
            "/:id/main-colors/:color_id",
            put(update_main_color).delete(delete_main_color),
        )
        .route("/:id/main-colors/:color_id/sub-feelings", post(add_sub_feeling))
        .route(
            "/:id/main-colors/:color_id/sub-feelings/:sub_feeling_id",
            put(update_sub_feeling).delete(delete_sub_feeling),
        )
        .route(
            "/:id/main-colors/:color_id/sub-feelings/:sub_feeling_id/final-options",
            post(set_final_options),
        )
        .route(
            "/:id/main-colors/:color_id/sub-feelings/:sub_feeling_id/final-options/:option_id",
            put(update_final_option),
        )
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/body-assignments", assignments)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Admin gate
// ---------------------------------------------------------------------------

async fn require_admin(
    State(config): State<Arc<ServerConfig>>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(expected) = &config.admin_token {
        verify_admin_token(req.headers(), expected)?;
    }
    Ok(next.run(req).await)
}

fn verify_admin_token(headers: &HeaderMap, expected: &str) -> Result<(), ServerError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .ok_or(ServerError::Unauthorized)?;

    // Constant-time comparison to prevent timing attacks on admin token.
    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Unauthorized);
    }

    Ok(())
}

fn actor(headers: &HeaderMap) -> Option<AdminRef> {
    headers
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| AdminRef(id.to_string()))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type ApiResult<T> = Result<Reply<T>, ServerError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<Envelope<HealthResponse>> {
    Json(Envelope::success(
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
        "Service is healthy",
    ))
}

async fn list_assignments(
    State(state): State<AppState>,
    query: Result<Query<AssignmentQuery>, QueryRejection>,
) -> ApiResult<Vec<AssignmentSummary>> {
    let Query(query) = query.map_err(|rejection| ServerError::Rejected {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let found = state.run(move |m| m.list_assignments(&query)).await?;
    Ok(Reply::ok(found, "Body Assignments retrieved successfully"))
}

async fn create_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewAssignment>, JsonRejection>,
) -> ApiResult<Assignment> {
    let input = json_body(payload)?;
    let actor = actor(&headers);
    let created = state
        .run(move |m| m.create_assignment(input, actor.as_ref()))
        .await?;
    Ok(Reply::created(created, "Body Assignment created successfully"))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Assignment> {
    let id = AssignmentId(id);
    let found = state.run(move |m| m.get_assignment(&id)).await?;
    Ok(Reply::ok(found, "Body Assignment retrieved successfully"))
}

async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<AssignmentPatch>, JsonRejection>,
) -> ApiResult<Assignment> {
    let patch = json_body(payload)?;
    let id = AssignmentId(id);
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.update_assignment(&id, patch, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Body Assignment updated successfully"))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = AssignmentId(id);
    state.run(move |m| m.delete_assignment(&id)).await?;
    Ok(Reply::ok((), "Body Assignment deleted successfully"))
}

async fn duplicate_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Assignment> {
    let id = AssignmentId(id);
    let actor = actor(&headers);
    let copy = state.run(move |m| m.duplicate(&id, actor.as_ref())).await?;
    Ok(Reply::created(copy, "Body Assignment duplicated successfully"))
}

async fn preview_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AssignmentPreview> {
    let id = AssignmentId(id);
    let preview = state.run(move |m| m.preview(&id)).await?;
    Ok(Reply::ok(preview, "Preview data retrieved successfully"))
}

async fn publish_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Assignment> {
    let id = AssignmentId(id);
    let actor = actor(&headers);
    let published = state.run(move |m| m.publish(&id, actor.as_ref())).await?;
    Ok(Reply::ok(published, "Body Assignment published successfully"))
}

async fn unpublish_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Assignment> {
    let id = AssignmentId(id);
    let actor = actor(&headers);
    let unpublished = state.run(move |m| m.unpublish(&id, actor.as_ref())).await?;
    Ok(Reply::ok(unpublished, "Body Assignment unpublished successfully"))
}

// -- Main colors -------------------------------------------------------------

async fn add_main_color(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<NewMainColor>, JsonRejection>,
) -> ApiResult<Assignment> {
    let input = json_body(payload)?;
    let id = AssignmentId(id);
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.add_main_color(&id, input, actor.as_ref()))
        .await?;
    Ok(Reply::created(updated, "Main color added successfully"))
}

async fn update_main_color(
    State(state): State<AppState>,
    Path((id, color_id)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<MainColorPatch>, JsonRejection>,
) -> ApiResult<Assignment> {
    let patch = json_body(payload)?;
    let (id, color_id) = (AssignmentId(id), NodeId(color_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.update_main_color(&id, &color_id, patch, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Main color updated successfully"))
}

async fn delete_main_color(
    State(state): State<AppState>,
    Path((id, color_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Assignment> {
    let (id, color_id) = (AssignmentId(id), NodeId(color_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.delete_main_color(&id, &color_id, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Main color deleted successfully"))
}

// -- Sub-feelings ------------------------------------------------------------

async fn add_sub_feeling(
    State(state): State<AppState>,
    Path((id, color_id)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<NewSubFeeling>, JsonRejection>,
) -> ApiResult<Assignment> {
    let input = json_body(payload)?;
    let (id, color_id) = (AssignmentId(id), NodeId(color_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.add_sub_feeling(&id, &color_id, input, actor.as_ref()))
        .await?;
    Ok(Reply::created(updated, "Sub-feeling added successfully"))
}

async fn update_sub_feeling(
    State(state): State<AppState>,
    Path((id, color_id, sub_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    payload: Result<Json<SubFeelingPatch>, JsonRejection>,
) -> ApiResult<Assignment> {
    let patch = json_body(payload)?;
    let (id, color_id, sub_id) = (AssignmentId(id), NodeId(color_id), NodeId(sub_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.update_sub_feeling(&id, &color_id, &sub_id, patch, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Sub-feeling updated successfully"))
}

async fn delete_sub_feeling(
    State(state): State<AppState>,
    Path((id, color_id, sub_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> ApiResult<Assignment> {
    let (id, color_id, sub_id) = (AssignmentId(id), NodeId(color_id), NodeId(sub_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.delete_sub_feeling(&id, &color_id, &sub_id, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Sub-feeling deleted successfully"))
}

// -- Final options -----------------------------------------------------------

#[derive(Deserialize)]
struct FinalOptionsRequest {
    #[serde(default)]
    options: Option<Vec<NewFinalOption>>,
}

async fn set_final_options(
    State(state): State<AppState>,
    Path((id, color_id, sub_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    payload: Result<Json<FinalOptionsRequest>, JsonRejection>,
) -> ApiResult<Assignment> {
    let options = json_body(payload)?.options.unwrap_or_default();
    let (id, color_id, sub_id) = (AssignmentId(id), NodeId(color_id), NodeId(sub_id));
    let actor = actor(&headers);
    let updated = state
        .run(move |m| m.set_final_options(&id, &color_id, &sub_id, options, actor.as_ref()))
        .await?;
    Ok(Reply::ok(updated, "Final options set successfully"))
}

async fn update_final_option(
    State(state): State<AppState>,
    Path((id, color_id, sub_id, option_id)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    payload: Result<Json<FinalOptionPatch>, JsonRejection>,
) -> ApiResult<Assignment> {
    let patch = json_body(payload)?;
    let (id, color_id, sub_id, option_id) = (
        AssignmentId(id),
        NodeId(color_id),
        NodeId(sub_id),
        NodeId(option_id),
    );
    let actor = actor(&headers);
    let updated = state
        .run(move |m| {
            m.update_final_option(&id, &color_id, &sub_id, &option_id, patch, actor.as_ref())
        })
        .await?;
    Ok(Reply::ok(updated, "Final option updated successfully"))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const BASE: &str = "/api/body-assignments";

    fn router_with(config: ServerConfig) -> Router {
        let db = Database::open_in_memory().unwrap();
        build_router(AppState::new(db, config))
    }

    fn router() -> Router {
        router_with(ServerConfig::default())
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-id", "admin-7");
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn create(app: &Router, title: &str) -> String {
        let (status, json) = call(app, "POST", BASE, Some(json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::CREATED);
        json["body"]["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = call(&router(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["body"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_and_get_wraps_envelope() {
        let app = router();
        let id = create(&app, "Body Map").await;

        let (status, json) = call(&app, "GET", &format!("{BASE}/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Body Assignment retrieved successfully");
        assert_eq!(json["body"]["title"], "Body Map");
        assert_eq!(json["body"]["createdBy"], "admin-7");
        assert_eq!(json["body"]["published"], false);
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let app = router();

        let (status, json) = call(&app, "POST", BASE, Some(json!({ "title": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
        assert!(json["body"].is_null());

        let (status, json) = call(&app, "GET", &format!("{BASE}/missing"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Body Assignment not found");

        let id = create(&app, "Body Map").await;
        let (status, json) = call(&app, "POST", &format!("{BASE}/{id}/publish"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Cannot publish assignment without main colors");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = router();
        let request = Request::builder()
            .method("POST")
            .uri(BASE)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn test_oversized_body_keeps_413() {
        let config = ServerConfig {
            max_body_bytes: 64,
            ..Default::default()
        };
        let app = router_with(config);
        let title = "x".repeat(200);

        let (status, json) = call(&app, "POST", BASE, Some(json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn test_published_filter_is_lenient() {
        let app = router();
        let draft = create(&app, "Draft").await;

        for raw in ["1", "yes", "false"] {
            let (status, json) = call(&app, "GET", &format!("{BASE}?published={raw}"), None).await;
            assert_eq!(status, StatusCode::OK);
            let rows = json["body"].as_array().unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["_id"], draft.as_str());
        }

        let (_, json) = call(&app, "GET", &format!("{BASE}?published=true"), None).await;
        assert!(json["body"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_tree_and_preview() {
        let app = router();
        let id = create(&app, "Body Map").await;

        let (status, json) = call(
            &app,
            "POST",
            &format!("{BASE}/{id}/main-colors"),
            Some(json!({ "hex": "#FF0000", "feeling": "Anger", "audioFile": "a.mp3" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let color = json["body"]["mainColors"][0]["_id"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            "POST",
            &format!("{BASE}/{id}/main-colors"),
            Some(json!({ "hex": "#ff0000", "feeling": "Rage" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "This color already exists in the assignment");

        let (status, json) = call(
            &app,
            "POST",
            &format!("{BASE}/{id}/main-colors/{color}/sub-feelings"),
            Some(json!({ "hex": "#aa0000", "subFeeling": "Irritated" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let sub = json["body"]["mainColors"][0]["subFeelings"][0]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let options_uri = format!("{BASE}/{id}/main-colors/{color}/sub-feelings/{sub}/final-options");
        let (status, json) = call(&app, "POST", &options_uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Exactly 2 final options are required");

        let (status, json) = call(
            &app,
            "POST",
            &options_uri,
            Some(json!({ "options": [
                { "hex": "#111111", "feeling": "Release" },
                { "hex": "#222222", "feeling": "Hold" }
            ] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let option = json["body"]["mainColors"][0]["subFeelings"][0]["finalOptions"][1]["_id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, json) = call(
            &app,
            "PUT",
            &format!("{options_uri}/{option}"),
            Some(json!({ "hex": "#111111" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "This color already exists in final options");

        let (status, _) = call(&app, "POST", &format!("{BASE}/{id}/publish"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(&app, "GET", &format!("{BASE}/{id}/preview"), None).await;
        assert_eq!(status, StatusCode::OK);
        let color = &json["body"]["mainColors"][0];
        assert_eq!(color["audioUrl"], "a.mp3");
        assert_eq!(color["hasAudio"], true);
        assert_eq!(color["subFeelings"][0]["finalOptions"].as_array().unwrap().len(), 2);

        let (status, json) = call(&app, "GET", &format!("{BASE}?published=true"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["body"][0]["mainColorCount"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_delete() {
        let app = router();
        let id = create(&app, "Body Map").await;

        let (status, json) = call(&app, "POST", &format!("{BASE}/{id}/duplicate"), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["body"]["title"], "Body Map (Copy)");
        assert_ne!(json["body"]["_id"].as_str().unwrap(), id);

        let (status, json) = call(&app, "DELETE", &format!("{BASE}/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["body"].is_null());

        let (status, _) = call(&app, "DELETE", &format!("{BASE}/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = call(&app, "GET", BASE, None).await;
        assert_eq!(json["body"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_token_gate() {
        let config = ServerConfig {
            admin_token: Some("s3cret".into()),
            ..Default::default()
        };
        let app = router_with(config);

        let (status, json) = call(&app, "GET", BASE, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["status"], "error");

        let request = Request::builder()
            .uri(BASE)
            .header("authorization", "Bearer wrong!")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri(BASE)
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Health stays open.
        let (status, _) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_actor_header() {
        let mut headers = HeaderMap::new();
        assert!(actor(&headers).is_none());
        headers.insert(ADMIN_ID_HEADER, "  ".parse().unwrap());
        assert!(actor(&headers).is_none());
        headers.insert(ADMIN_ID_HEADER, "admin-1".parse().unwrap());
        assert_eq!(actor(&headers), Some(AdminRef("admin-1".into())));
    }
}
