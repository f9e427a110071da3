use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use thiserror::Error;

use crate::pdf::PdfError;
use crate::repo::StoreError;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Unauthorized Access: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<StoreError> for RestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingReference(kind, id) => {
                Self::ValidationError(format!("Unknown {} {}", kind, id))
            }
            StoreError::Database(e) => {
                tracing::error!(error.cause_chain = ?e, "Store operation failed");
                Self::InternalError("Database error".into())
            }
        }
    }
}

impl From<PdfError> for RestError {
    fn from(e: PdfError) -> Self {
        tracing::error!(error.cause_chain = ?e, "PDF operation failed");
        Self::InternalError("PDF error".into())
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the logs
        let body = match self {
            Self::Other(e) => {
                tracing::error!(error.cause_chain = ?e, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).body(body)
    }
}
