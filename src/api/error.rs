//! Maps [`Error`] onto HTTP responses with a `{"error": "..."}` body.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

impl Error {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::HalaqahNotFound { .. }
            | Self::EnrollmentNotFound { .. }
            | Self::PairingNotFound { .. }
            | Self::SubmissionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. }
            | Self::AlreadyEnrolled
            | Self::NotOnWaitlist { .. }
            | Self::HalaqahFull { .. }
            | Self::WaitlistFull { .. }
            | Self::PairingExists
            | Self::PairFull
            | Self::AlreadyInPair
            | Self::PairedElsewhere
            | Self::NotEditable
            | Self::AlreadyApproved => StatusCode::BAD_REQUEST,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
