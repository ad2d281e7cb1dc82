//! Axum router and server lifecycle for the console API.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::EngineResult;
use crate::ops::{self, ChatTarget, NewTask, TaskPatch};
use crate::types::{Actor, ChatMessage, PromotionSummary, RewriteSummary, Task};
use crate::workspace::Workspace;

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiServer {
    workspace: Arc<Workspace>,
}

impl ApiServer {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    interaction_log_failures: u64,
}

async fn health(State(state): State<ApiServer>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        interaction_log_failures: state
            .workspace()
            .logger()
            .map_or(0, |logger| logger.failure_count()),
    })
}

fn default_actor() -> Actor {
    Actor::User
}

#[derive(Debug, Deserialize)]
struct ActorParams {
    #[serde(default = "default_actor")]
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskRequest {
    #[serde(flatten)]
    patch: TaskPatch,
    #[serde(default = "default_actor")]
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct RewriteRequest {
    tasks: Vec<Task>,
    #[serde(default = "default_actor")]
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct PromoteRequest {
    destination: String,
    #[serde(default = "default_actor")]
    actor: Actor,
}

#[derive(Debug, Deserialize)]
struct PostChatRequest {
    #[serde(default = "default_actor")]
    speaker: Actor,
    message: String,
}

async fn list_tasks(State(state): State<ApiServer>) -> EngineResult<Json<Vec<Task>>> {
    ops::list_tasks(state.workspace()).map(Json)
}

async fn create_task(
    State(state): State<ApiServer>,
    Json(new): Json<NewTask>,
) -> EngineResult<(StatusCode, Json<Task>)> {
    let task = ops::create_task(state.workspace(), new)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn rewrite_tasks(
    State(state): State<ApiServer>,
    Json(request): Json<RewriteRequest>,
) -> EngineResult<Json<RewriteSummary>> {
    ops::rewrite_tasks(state.workspace(), &request.tasks, request.actor).map(Json)
}

async fn get_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
) -> EngineResult<Json<Task>> {
    ops::get_task(state.workspace(), &task_id).map(Json)
}

async fn update_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> EngineResult<Json<Task>> {
    ops::update_task(state.workspace(), &task_id, request.patch, request.actor).map(Json)
}

async fn delete_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
    Query(params): Query<ActorParams>,
) -> EngineResult<Json<Task>> {
    ops::delete_task(state.workspace(), &task_id, params.actor).map(Json)
}

async fn promote_task(
    State(state): State<ApiServer>,
    Path(task_id): Path<String>,
    Json(request): Json<PromoteRequest>,
) -> EngineResult<Json<PromotionSummary>> {
    ops::promote_task(
        state.workspace(),
        &task_id,
        &request.destination,
        request.actor,
    )
    .map(Json)
}

async fn post_chat(
    state: &ApiServer,
    target: ChatTarget,
    request: PostChatRequest,
) -> EngineResult<(StatusCode, Json<ChatMessage>)> {
    let message = ops::post_chat(state.workspace(), &target, request.speaker, &request.message)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_loop_chat(
    State(state): State<ApiServer>,
    Path(loop_id): Path<String>,
) -> EngineResult<Json<Vec<ChatMessage>>> {
    ops::list_chat(state.workspace(), &ChatTarget::Loop(loop_id)).map(Json)
}

async fn post_loop_chat(
    State(state): State<ApiServer>,
    Path(loop_id): Path<String>,
    Json(request): Json<PostChatRequest>,
) -> EngineResult<(StatusCode, Json<ChatMessage>)> {
    post_chat(&state, ChatTarget::Loop(loop_id), request).await
}

async fn list_thread_chat(
    State(state): State<ApiServer>,
    Path(thread_id): Path<String>,
) -> EngineResult<Json<Vec<ChatMessage>>> {
    ops::list_chat(state.workspace(), &ChatTarget::Thread(thread_id)).map(Json)
}

async fn post_thread_chat(
    State(state): State<ApiServer>,
    Path(thread_id): Path<String>,
    Json(request): Json<PostChatRequest>,
) -> EngineResult<(StatusCode, Json<ChatMessage>)> {
    post_chat(&state, ChatTarget::Thread(thread_id), request).await
}

/// Build the router with all routes.
pub fn build_router(state: ApiServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/tasks",
            get(list_tasks).post(create_task).put(rewrite_tasks),
        )
        .route(
            "/api/tasks/{task_id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{task_id}/promote", post(promote_task))
        .route(
            "/api/loops/{loop_id}/chat",
            get(list_loop_chat).post(post_loop_chat),
        )
        .route(
            "/api/threads/{thread_id}/chat",
            get(list_thread_chat).post(post_thread_chat),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server on `port` (0 picks a free port).
///
/// Returns a sender that triggers graceful shutdown and the bound address.
pub async fn start_server(
    workspace: Arc<Workspace>,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(ApiServer::new(workspace));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}

/// Serve until Ctrl-C.
pub async fn serve(workspace: Arc<Workspace>, port: u16) -> anyhow::Result<()> {
    let (shutdown_tx, _) = start_server(workspace, port).await?;
    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    Ok(())
}
