use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::blockchain::{LedgerError, MiningError, ValidationError};

/// Errors surfaced by the HTTP layer. `Display` is the public message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed write request.
    #[error("payload parsing error")]
    PayloadInvalid(String),
    /// Search was abandoned because its request went away.
    #[error("block creation error")]
    Cancelled(String),
    #[error("block creation error")]
    BlockCreation(String),
    /// Another writer kept moving the tail and the retry budget ran out.
    #[error("stale tail")]
    StaleTail(String),
    /// The ledger refused a block its own factory built.
    #[error("{}", .0.kind())]
    ValidationFailed(ValidationError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    fn detail(&self) -> Option<String> {
        match self {
            Self::PayloadInvalid(d)
            | Self::Cancelled(d)
            | Self::BlockCreation(d)
            | Self::StaleTail(d) => Some(d.clone()),
            Self::ValidationFailed(e) => Some(e.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(e) => Self::ValidationFailed(e),
            LedgerError::StaleTail { .. } => Self::StaleTail(err.to_string()),
            LedgerError::Mining(MiningError::Cancelled { .. }) => Self::Cancelled(err.to_string()),
            LedgerError::Mining(MiningError::NonceSpaceExhausted)
            | LedgerError::DifficultyOutOfRange { .. } => Self::BlockCreation(err.to_string()),
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        Self::BlockCreation(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadInvalid(_) => StatusCode::BAD_REQUEST,
            Self::StaleTail(_) => StatusCode::CONFLICT,
            Self::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BlockCreation(_) | Self::ValidationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            detail: self.detail(),
        })
    }
}
