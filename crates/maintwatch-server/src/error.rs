//! Mapping of pipeline errors onto HTTP responses.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use maintwatch_core::{ArtifactError, InferenceError, InsufficientData, SensorUnavailable};

#[derive(Debug)]
pub enum ApiError {
    Sensor(SensorUnavailable),
    InsufficientData { retry_after_secs: u64 },
    Inference(InferenceError),
    /// A reload candidate failed to load or self-check.
    ArtifactRejected(ArtifactError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<&'static str>>,
}

impl ApiError {
    pub fn insufficient(_: InsufficientData, retry_after_secs: u64) -> Self {
        Self::InsufficientData { retry_after_secs }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Sensor(_) | Self::InsufficientData { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Inference(InferenceError::InvalidFeatureVector { .. }) => StatusCode::BAD_REQUEST,
            Self::Inference(InferenceError::ModelUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ArtifactRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Sensor(_) => "sensor_unavailable",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Inference(InferenceError::InvalidFeatureVector { .. }) => {
                "invalid_feature_vector"
            }
            Self::Inference(InferenceError::ModelUnavailable { .. }) => "model_unavailable",
            Self::ArtifactRejected(_) => "artifact_rejected",
            Self::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Sensor(e) => e.to_string(),
            Self::InsufficientData { .. } => InsufficientData.to_string(),
            Self::Inference(e) => e.to_string(),
            Self::ArtifactRejected(e) => e.to_string(),
            Self::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::warn!("{}: {}", self.code(), self.message());
        }
        let fields = match &self {
            Self::Inference(e @ InferenceError::InvalidFeatureVector { .. }) => {
                Some(e.invalid_fields())
            }
            _ => None,
        };
        let body = Json(ErrorBody {
            error: self.code(),
            message: self.message(),
            fields,
        });

        let mut response = (status, body).into_response();
        if let Self::InsufficientData { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<SensorUnavailable> for ApiError {
    fn from(err: SensorUnavailable) -> Self {
        Self::Sensor(err)
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        Self::Inference(err)
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        Self::ArtifactRejected(err)
    }
}
