use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use concierge_domain::index::CollectionInfo;
use concierge_service::{AnalyticsSnapshot, ChatReply, ChatRequest, Error, SyncReport, sync};

use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 4_000;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
	pub user_id: String,
	pub chat_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncrementalSyncRequest {
	#[serde(default, deserialize_with = "crate::time_serde::deserialize_option")]
	pub since: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::ContextTooLong { message } | Error::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message, None),
			Error::Storage { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message, None),
			Error::Qdrant { message } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "index_unavailable", message, None),
			Error::Timeout { operation } => json_error(
				StatusCode::GATEWAY_TIMEOUT,
				"timeout",
				format!("Timed out waiting for {operation}."),
				None,
			),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/chat", post(chat))
		.route("/v1/chat/reset", post(reset))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/sync", post(sync_all))
		.route("/v1/admin/sync/incremental", post(sync_incremental))
		.route("/v1/admin/sync/status", get(sync_status))
		.route("/v1/admin/analytics", get(analytics))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
	let mut blank = Vec::new();

	for (field, value) in
		[("user_id", &payload.user_id), ("chat_id", &payload.chat_id), ("message", &payload.message)]
	{
		if value.trim().is_empty() {
			blank.push(format!("$.{field}"));
		}
	}

	if !blank.is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Fields must be non-empty.",
			Some(blank),
		));
	}
	if payload.message.chars().count() > MAX_MESSAGE_CHARS {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("Message must be at most {MAX_MESSAGE_CHARS} characters."),
			Some(vec!["$.message".to_string()]),
		));
	}

	Ok(Json(state.service.handle_message(payload).await))
}

async fn reset(
	State(state): State<AppState>,
	Json(payload): Json<ResetRequest>,
) -> Result<StatusCode, ApiError> {
	if payload.user_id.trim().is_empty() || payload.chat_id.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"user_id and chat_id must be non-empty.",
			None,
		));
	}

	state.service.reset_conversation(&payload.user_id, &payload.chat_id).await;

	Ok(StatusCode::NO_CONTENT)
}

async fn sync_all(State(state): State<AppState>) -> Result<Json<SyncReport>, ApiError> {
	tracing::info!("Manual full sync requested.");

	let report = state.service.sync_all().await?;

	Ok(Json(report))
}

async fn sync_incremental(
	State(state): State<AppState>,
	payload: Option<Json<IncrementalSyncRequest>>,
) -> Result<Json<SyncReport>, ApiError> {
	let lookback_hours = state.service.cfg.sync.initial_lookback_hours;
	let since = payload
		.and_then(|Json(body)| body.since)
		.unwrap_or_else(|| sync::lookback_start(OffsetDateTime::now_utc(), lookback_hours));

	tracing::info!(%since, "Manual incremental sync requested.");

	let report = state.service.sync_incremental(since).await?;

	Ok(Json(report))
}

async fn sync_status(State(state): State<AppState>) -> Result<Json<CollectionInfo>, ApiError> {
	let info = state.service.sync_status().await?;

	Ok(Json(info))
}

async fn analytics(State(state): State<AppState>) -> Json<AnalyticsSnapshot> {
	Json(state.service.analytics.snapshot())
}
