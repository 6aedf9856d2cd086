use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Filter catalog
        .route(
            "/schools/:school_id/grade-levels",
            get(handlers::list_grade_levels::<S>),
        )
        // Roster
        .route(
            "/enrollments/unassigned",
            get(handlers::list_unassigned::<S>),
        )
        .route("/classrooms", get(handlers::list_classrooms::<S>))
        // Assignments
        .route("/assignments", post(handlers::assign::<S>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentRequest, ClassroomRecord, EnrollmentRecord, ErrorResponse, GradeLevel};
    use crate::store::memory::MemoryStore;
    use crate::store::testing::{fixture_context, fixture_store};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router::<MemoryStore>().with_state(Arc::new(fixture_store()))
    }

    async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn roster_query() -> &'static str {
        "school_id=1&grade_level_id=5&period=2024%2F2025&period_kind=academic_year_name"
    }

    fn post_assignment(request: &AssignmentRequest) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/assignments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(request).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_grade_levels_and_unknown_school() {
        let response = app()
            .oneshot(Request::get("/schools/1/grade-levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let levels: Vec<GradeLevel> = read_json(response).await;
        assert_eq!(levels.len(), 2);

        let response = app()
            .oneshot(Request::get("/schools/99/grade-levels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_roster_queries() {
        let response = app()
            .oneshot(
                Request::get(format!("/enrollments/unassigned?{}", roster_query()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let unassigned: Vec<EnrollmentRecord> = read_json(response).await;
        assert_eq!(unassigned.len(), 3);

        let response = app()
            .oneshot(
                Request::get(format!("/classrooms?{}", roster_query()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let classrooms: Vec<ClassroomRecord> = read_json(response).await;
        let seven_a = classrooms.iter().find(|c| c.classroom_id == "7A").unwrap();
        assert_eq!(seven_a.occupant_enrollments.len(), 2);
    }

    #[tokio::test]
    async fn test_full_classroom_is_a_conflict() {
        let request = AssignmentRequest::new(
            "e-ada".to_string(),
            Some("7A".to_string()),
            &fixture_context(),
        );
        let response = app().oneshot(post_assignment(&request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: ErrorResponse = read_json(response).await;
        assert!(body.error.contains("full"));
    }

    #[tokio::test]
    async fn test_assign_and_unknown_enrollment() {
        let store = Arc::new(fixture_store());
        let app = create_router::<MemoryStore>().with_state(store.clone());

        let request = AssignmentRequest::new(
            "e-ada".to_string(),
            Some("7B".to_string()),
            &fixture_context(),
        );
        let response = app.clone().oneshot(post_assignment(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.classroom_of("e-ada"), Some(Some("7B".to_string())));

        let request = AssignmentRequest::new("e-nobody".to_string(), None, &fixture_context());
        let response = app.oneshot(post_assignment(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
