use actix_web::{http::StatusCode, ResponseError};

use crate::screenshot::CaptureError;

pub type Result<T> = actix_web::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Service Unavailable: {0}")]
    Unavailable(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<CaptureError> for Error {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::RateLimited { .. } | CaptureError::Busy => {
                Self::TooManyRequests(error.to_string())
            }
            CaptureError::CaptureFailed(_) | CaptureError::InvalidCapture(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screenshot::frame::FrameDefect;

    #[test]
    fn test_capture_error_status_codes() {
        let rate_limited: Error = CaptureError::RateLimited {
            retry_after_seconds: 2.0,
        }
        .into();
        assert_eq!(rate_limited.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let busy: Error = CaptureError::Busy.into();
        assert_eq!(busy.status_code(), StatusCode::TOO_MANY_REQUESTS);

        let failed: Error = CaptureError::CaptureFailed("tool crashed".to_string()).into();
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid: Error = CaptureError::InvalidCapture(FrameDefect::AllBlack).into();
        assert_eq!(invalid.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
