use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::aggregator::EmptyDatasetError;
use crate::services::loader::LoadError;

#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    Load(LoadError),
    EmptyDataset(EmptyDatasetError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Load(err) => write!(f, "Load error: {}", err),
            AppError::EmptyDataset(err) => write!(f, "Empty dataset: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Load(err)
    }
}

impl From<EmptyDatasetError> for AppError {
    fn from(err: EmptyDatasetError) -> Self {
        AppError::EmptyDataset(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Local file trouble is on us, upstream fetch trouble is a bad
            // gateway.
            AppError::Load(LoadError::Io(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Load(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::EmptyDataset(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
