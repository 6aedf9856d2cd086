use crate::config::RemoteConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    AssignmentAck, AssignmentRequest, ClassroomRecord, EnrollmentRecord, ErrorResponse,
    FilterContext, GradeLevel, Id, RosterQuery,
};
use crate::store::traits::{AssignmentStore, ClassroomStore, EnrollmentStore, GradeLevelStore, Store};
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `Store` backed by the remote roster REST API
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, request_timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RemoteConfig) -> StoreResult<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()));
        }

        // Error bodies are best-effort; a missing or foreign body yields no message
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .map(|e| e.error)
            .filter(|m| !m.trim().is_empty());
        debug!("Roster API answered {} with {:?}", status, message);

        Err(status_error(status, message))
    }
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Transport(error.to_string())
    }
}

/// A missing body leaves the message empty so no server text is shown to the user
fn status_error(status: StatusCode, message: Option<String>) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::Conflict {
            message: message.unwrap_or_default(),
        },
        StatusCode::NOT_FOUND => StoreError::NotFound(message.unwrap_or_default()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            StoreError::Invalid(message.unwrap_or_default())
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreError::Timeout,
        _ => StoreError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait::async_trait]
impl GradeLevelStore for HttpStore {
    async fn list_grade_levels(&self, school_id: &Id) -> StoreResult<Vec<GradeLevel>> {
        let url = self.url(&format!("/schools/{}/grade-levels", school_id));
        self.send(self.client.get(url)).await
    }
}

#[async_trait::async_trait]
impl EnrollmentStore for HttpStore {
    async fn list_unassigned(&self, context: &FilterContext) -> StoreResult<Vec<EnrollmentRecord>> {
        let query = RosterQuery::from(context);
        let request = self.client.get(self.url("/enrollments/unassigned")).query(&query);
        self.send(request).await
    }
}

#[async_trait::async_trait]
impl ClassroomStore for HttpStore {
    async fn list_classrooms(&self, context: &FilterContext) -> StoreResult<Vec<ClassroomRecord>> {
        let query = RosterQuery::from(context);
        let request = self.client.get(self.url("/classrooms")).query(&query);
        self.send(request).await
    }
}

#[async_trait::async_trait]
impl AssignmentStore for HttpStore {
    async fn assign(&self, request: &AssignmentRequest) -> StoreResult<AssignmentAck> {
        let builder = self.client.post(self.url("/assignments")).json(request);
        self.send(builder).await
    }
}

impl Store for HttpStore {}
