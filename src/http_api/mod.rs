use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::task_validation::DATE_FORMAT;
use crate::{
    ScheduleError, Task, TaskDraft, TaskId, TaskPatch, TaskPlacement, TaskService, TimeOfDay,
    ValidationErrors,
};

#[derive(Clone)]
pub struct AppState {
    service: Arc<TaskService>,
}

impl AppState {
    pub fn new(service: TaskService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn with_shared(service: Arc<TaskService>) -> Self {
        Self { service }
    }

    fn service(&self) -> &TaskService {
        &self.service
    }
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(Vec<Task>),
    Validation(ValidationErrors),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::Validation(errors) => ApiError::Validation(errors),
            ScheduleError::Conflict { overlaps } => ApiError::Conflict(overlaps),
            ScheduleError::NotFound(id) => ApiError::not_found(format!("task {id} not found")),
            ScheduleError::DuplicateId(id) => {
                ApiError::Internal(format!("task {id} already exists"))
            }
            ScheduleError::Persistence(err) => {
                error!(error = %err, "storage failure");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(json!({ "error": "not_found", "message": message }));
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Conflict(overlaps) => {
                let body = Json(json!({
                    "error": "conflict",
                    "message": format!("task overlaps {} existing task(s)", overlaps.len()),
                    "overlaps": overlaps,
                }));
                (StatusCode::CONFLICT, body).into_response()
            }
            ApiError::Validation(fields) => {
                let body = Json(json!({
                    "error": "validation_failed",
                    "message": fields.to_string(),
                    "fields": fields,
                }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(json!({ "error": "invalid_request", "message": message }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                let body = Json(json!({ "error": "internal_error", "message": message }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

impl DateQuery {
    fn date(&self) -> Result<NaiveDate, ApiError> {
        let raw = self
            .date
            .as_deref()
            .ok_or_else(|| ApiError::invalid("date parameter is required"))?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|_| ApiError::invalid(format!("invalid date '{raw}' (expected YYYY-MM-DD)")))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ForceQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelocatePayload {
    start_time: String,
}

#[derive(Debug, Serialize)]
struct CurrentTaskBody {
    date: NaiveDate,
    time: TimeOfDay,
    task: Option<Task>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/:id/relocate", post(relocate_task))
        .route("/layout", get(day_layout))
        .route("/current", get(current_task))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, service: TaskService) -> std::io::Result<()> {
    let state = AppState::new(service);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "day planner HTTP API listening");
    axum::serve(listener, app).await
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("task {raw} not found")))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let Query(query) = query?;
    let date = query.date()?;
    Ok(Json(state.service().list(date)?))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&task_id)?;
    Ok(Json(state.service().get(id)?))
}

async fn create_task(
    State(state): State<AppState>,
    force: Result<Query<ForceQuery>, QueryRejection>,
    draft: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Query(force) = force?;
    let Json(draft) = draft?;
    let created = state.service().create(&draft, force.force)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    force: Result<Query<ForceQuery>, QueryRejection>,
    patch: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&task_id)?;
    let Query(force) = force?;
    let Json(patch) = patch?;
    if patch.is_empty() {
        return Err(ApiError::invalid("update payload contains no fields"));
    }
    Ok(Json(state.service().update(id, &patch, force.force)?))
}

async fn relocate_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    force: Result<Query<ForceQuery>, QueryRejection>,
    payload: Result<Json<RelocatePayload>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&task_id)?;
    let Query(force) = force?;
    let Json(payload) = payload?;
    let start: TimeOfDay = payload
        .start_time
        .parse()
        .map_err(|err: crate::TimeError| {
            ApiError::Validation(ValidationErrors::single("startTime", err.to_string()))
        })?;
    Ok(Json(state.service().relocate(id, start, force.force)?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&task_id)?;
    state.service().delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn day_layout(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> Result<Json<Vec<TaskPlacement>>, ApiError> {
    let Query(query) = query?;
    let date = query.date()?;
    Ok(Json(state.service().layout(date)?))
}

async fn current_task(State(state): State<AppState>) -> Result<Json<CurrentTaskBody>, ApiError> {
    let (date, time, task) = state.service().current_task()?;
    Ok(Json(CurrentTaskBody { date, time, task }))
}
