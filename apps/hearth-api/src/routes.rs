use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};

use hearth_service::{
	AggregateRequest, AggregateResponse, BatchSearchRequest, BatchSearchSlot, BatchStoreRequest,
	BatchStoreResponse, Error as ServiceError, GetPendingRemindersRequest, Manifest,
	MarkReminderSentRequest, MarkReminderSentResponse, PendingReminder, ScheduleReminderRequest,
	ScheduleReminderResponse, SearchRequest, SearchResponse, SoftDeleteRequest, SoftDeleteResponse,
	StoreRequest, StoreResponse, UpdateFieldsRequest, UpdateFieldsResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/manifest", get(manifest))
		.route("/v1/memory/store", post(store))
		.route("/v1/memory/search", post(search))
		.route("/v1/memory/aggregate", post(aggregate))
		.route("/v1/memory/batch_store", post(batch_store))
		.route("/v1/memory/batch_search", post(batch_search))
		.route("/v1/memory/update_fields", post(update_fields))
		.route("/v1/memory/soft_delete", post(soft_delete))
		.route("/v1/reminders/schedule", post(schedule_reminder))
		.route("/v1/reminders/pending", post(pending_reminders))
		.route("/v1/reminders/mark_sent", post(mark_reminder_sent))
		.with_state(state)
}

async fn health() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}

async fn manifest(State(state): State<AppState>) -> Json<Manifest> {
	Json(state.service.manifest())
}

async fn store(
	State(state): State<AppState>,
	Json(payload): Json<StoreRequest>,
) -> Result<Json<StoreResponse>, ApiError> {
	let response = state.service.store(payload).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(flatten_search(response)?))
}

async fn aggregate(
	State(state): State<AppState>,
	Json(payload): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, ApiError> {
	let response = state.service.aggregate(payload).await?;

	Ok(Json(response))
}

async fn batch_store(
	State(state): State<AppState>,
	Json(payload): Json<BatchStoreRequest>,
) -> Result<Json<BatchStoreResponse>, ApiError> {
	let response = state.service.batch_store(payload).await?;

	Ok(Json(response))
}

async fn batch_search(
	State(state): State<AppState>,
	Json(payload): Json<BatchSearchRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
	let response = state.service.batch_search(payload).await?;
	let mut slots = Vec::with_capacity(response.slots.len());

	for slot in response.slots {
		match slot {
			BatchSearchSlot::Hit(hit) => slots.push(Value::Array(flatten_search(hit)?)),
			BatchSearchSlot::Miss { error } => slots.push(json!({ "error": error })),
		}
	}

	Ok(Json(slots))
}

async fn update_fields(
	State(state): State<AppState>,
	Json(payload): Json<UpdateFieldsRequest>,
) -> Result<Json<UpdateFieldsResponse>, ApiError> {
	let response = state.service.update_fields(payload).await?;

	Ok(Json(response))
}

async fn soft_delete(
	State(state): State<AppState>,
	Json(payload): Json<SoftDeleteRequest>,
) -> Result<Json<SoftDeleteResponse>, ApiError> {
	let response = state.service.soft_delete(payload).await?;

	Ok(Json(response))
}

async fn schedule_reminder(
	State(state): State<AppState>,
	Json(payload): Json<ScheduleReminderRequest>,
) -> Result<Json<ScheduleReminderResponse>, ApiError> {
	let response = state.service.schedule_reminder(payload).await?;

	Ok(Json(response))
}

async fn pending_reminders(
	State(state): State<AppState>,
	Json(payload): Json<GetPendingRemindersRequest>,
) -> Result<Json<Vec<PendingReminder>>, ApiError> {
	let response = state.service.get_pending_reminders(payload).await?;

	Ok(Json(response.reminders))
}

async fn mark_reminder_sent(
	State(state): State<AppState>,
	Json(payload): Json<MarkReminderSentRequest>,
) -> Result<Json<MarkReminderSentResponse>, ApiError> {
	let response = state.service.mark_reminder_sent(payload).await?;

	Ok(Json(response))
}

/// The wire shape for search is a bare array: result objects first, then one
/// trailing `{"_meta": {...}}` element.
fn flatten_search(response: SearchResponse) -> Result<Vec<Value>, ApiError> {
	let mut rows = Vec::with_capacity(response.results.len() + 1);

	for item in &response.results {
		rows.push(serde_json::to_value(item).map_err(ApiError::internal)?);
	}

	let meta = serde_json::to_value(&response.meta).map_err(ApiError::internal)?;

	rows.push(json!({ "_meta": meta }));

	Ok(rows)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	success: bool,
	error_code: &'static str,
	error: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn internal(err: serde_json::Error) -> Self {
		Self {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			error_code: "internal_error",
			message: err.to_string(),
		}
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::InvalidRequest { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
			ServiceError::Unavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "backing_store_unavailable"),
			ServiceError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
		};

		Self { status, error_code, message: err.to_string() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { success: false, error_code: self.error_code, error: self.message };

		(self.status, Json(body)).into_response()
	}
}
