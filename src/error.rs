use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures while loading the song catalog. Always fatal at startup.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("catalog object unreachable: {0}")]
    Unreachable(#[from] object_store::Error),

    #[error("invalid catalog store configuration: {0}")]
    Config(String),

    #[error("catalog is malformed: {0}")]
    Malformed(String),

    #[error("catalog is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Malformed(err.to_string())
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Catalog load error: {0}")]
    Load(#[from] LoadError),

    #[error("Event source connection error: {0}")]
    Connect(String),

    #[error("Event source error: {0}")]
    EventSource(String),

    #[error("Batch {batch_id} failed: {reason}")]
    BatchProcessing { batch_id: u64, reason: String },

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Connect(_) | AppError::EventSource(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
