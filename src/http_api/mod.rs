use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{Calendar, Day, Plan, PlanError, PlanMetadata, Resource, ScheduleSummary, Task};

/// Shared plan behind one lock: edits and scheduling passes never overlap.
#[derive(Clone)]
pub struct AppState {
    plan: Arc<RwLock<Plan>>,
}

impl AppState {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan: Arc::new(RwLock::new(plan)),
        }
    }

    pub fn with_shared(plan: Arc<RwLock<Plan>>) -> Self {
        Self { plan }
    }

    fn plan(&self) -> Arc<RwLock<Plan>> {
        self.plan.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<PlanError> for ApiError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::NoWorkingTime { .. }
            | PlanError::SpanOutOfRange { .. }
            | PlanError::CyclicPredecessors { .. } => {
                ApiError::Conflict(value.to_string())
            }
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// A task as the API shows it: the stored fields plus what the plan
/// derives for the row.
#[derive(Debug, Serialize)]
pub struct TaskView {
    pub index: usize,
    pub parent: Option<usize>,
    pub summary: bool,
    pub milestone: bool,
    pub late: bool,
    #[serde(flatten)]
    pub task: Task,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            index: task.index(),
            parent: task.parent(),
            summary: task.is_summary(),
            milestone: task.is_milestone(),
            late: task.is_late(),
            task: task.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PlanView {
    metadata: PlanMetadata,
    task_count: usize,
    day_count: usize,
    calendar_count: usize,
    resource_count: usize,
    late_tasks: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    value: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plan", get(get_plan))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:index", get(get_task))
        .route("/tasks/:index/:section", put(set_task_text))
        .route("/days", get(list_days))
        .route("/calendars", get(list_calendars))
        .route("/resources", get(list_resources))
        .route("/schedule", post(schedule_plan))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, plan: Plan) -> std::io::Result<()> {
    let state = AppState::new(plan);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "plan API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_plan(State(state): State<AppState>) -> Json<PlanView> {
    let plan = state.plan();
    let guard = plan.read();
    Json(PlanView {
        metadata: guard.metadata().clone(),
        task_count: guard.task_count(),
        day_count: guard.day_count(),
        calendar_count: guard.calendar_count(),
        resource_count: guard.resource_count(),
        late_tasks: guard.late_tasks(),
    })
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskView>> {
    let plan = state.plan();
    let tasks = plan.read().tasks().iter().map(TaskView::from).collect();
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<TaskView>, ApiError> {
    let plan = state.plan();
    let task = plan.read().task(index).map(TaskView::from);
    task.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {index} not found")))
}

async fn set_task_text(
    State(state): State<AppState>,
    Path((index, section)): Path<(usize, usize)>,
    Json(payload): Json<TextPayload>,
) -> Result<Json<TaskView>, ApiError> {
    let plan = state.plan();
    let mut guard = plan.write();
    if guard.task(index).is_none() {
        return Err(ApiError::not_found(format!("task {index} not found")));
    }
    guard.set_task_text(index, section, &payload.value)?;
    let updated = guard
        .task(index)
        .map(TaskView::from)
        .ok_or_else(|| ApiError::not_found(format!("task {index} not found")))?;
    Ok(Json(updated))
}

async fn list_days(State(state): State<AppState>) -> Json<Vec<Day>> {
    let plan = state.plan();
    let days = plan.read().days().to_vec();
    Json(days)
}

async fn list_calendars(State(state): State<AppState>) -> Json<Vec<Calendar>> {
    let plan = state.plan();
    let calendars = plan.read().calendars().to_vec();
    Json(calendars)
}

async fn list_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    let plan = state.plan();
    let resources = plan.read().resources().to_vec();
    Json(resources)
}

async fn schedule_plan(State(state): State<AppState>) -> Result<Json<ScheduleSummary>, ApiError> {
    let plan = state.plan();
    let summary = plan.write().schedule()?;
    Ok(Json(summary))
}
