use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::{
    AssignmentAck, AssignmentRequest, ClassroomRecord, EnrollmentRecord, ErrorResponse, GradeLevel,
    Id, RosterQuery,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Status code for a store failure; the body carries the message
pub fn error_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        StoreError::Http { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        StoreError::Transport(_) | StoreError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let message = error
        .server_message()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    (error_status(&error), Json(ErrorResponse::new(&message)))
}

pub async fn list_grade_levels<S: Store>(
    State(store): State<AppState<S>>,
    Path(school_id): Path<Id>,
) -> ApiResult<Vec<GradeLevel>> {
    store
        .list_grade_levels(&school_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_unassigned<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<RosterQuery>,
) -> ApiResult<Vec<EnrollmentRecord>> {
    store
        .list_unassigned(&query.context())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_classrooms<S: Store>(
    State(store): State<AppState<S>>,
    Query(query): Query<RosterQuery>,
) -> ApiResult<Vec<ClassroomRecord>> {
    store
        .list_classrooms(&query.context())
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn assign<S: Store>(
    State(store): State<AppState<S>>,
    RequestJson(request): RequestJson<AssignmentRequest>,
) -> ApiResult<AssignmentAck> {
    match store.assign(&request).await {
        Ok(ack) => {
            info!(
                "Enrollment '{}' assigned to {:?}",
                ack.enrollment_id, ack.classroom_id
            );
            Ok(Json(ack))
        }
        Err(e) => {
            warn!("Assignment of '{}' refused: {}", request.enrollment_id, e);
            Err(error_response(e))
        }
    }
}
