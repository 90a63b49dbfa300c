use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server-side failures for the /analyze endpoint.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Empty filename")]
    EmptyFilename,

    #[error("Cannot read image")]
    UnreadableImage,

    #[error("Upload error: {0}")]
    Multipart(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    fn status(&self) -> StatusCode {
        match self {
            AnalysisError::MissingFile
            | AnalysisError::EmptyFilename
            | AnalysisError::UnreadableImage
            | AnalysisError::Multipart(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Pipeline(_) | AnalysisError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        AnalysisError::Internal(err.to_string())
    }
}

// Failures surface to the frontend as {"error": "..."} with the
// matching HTTP status, mirroring the JSON the upload script expects.
impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("analyze request failed: {}", self);
        } else {
            tracing::debug!("analyze request rejected: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Client-side failures for one submission attempt. All are terminal for
/// that attempt only; the client returns to idle afterwards.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select an image.")]
    NoFileSelected,

    #[error("{message}")]
    Server { message: String },

    #[error("{0}")]
    Transport(String),
}

impl UploadError {
    /// The status line shown to the user for this failure.
    pub fn status_line(&self) -> String {
        match self {
            UploadError::NoFileSelected => self.to_string(),
            _ => format!("Error: {}", self),
        }
    }
}
