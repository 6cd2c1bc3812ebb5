use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::types::{RoomId, UserId};

pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised by the broker and its transport
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("user with id {0} already exists")]
    DuplicateUser(UserId),

    #[error("chat room named {0} already exists")]
    DuplicateRoom(String),

    #[error("chat room {0} not found")]
    RoomNotFound(RoomId),

    #[error("no live stream for user {0}")]
    RecipientUnavailable(UserId),

    #[error("stream transport failed: {0}")]
    StreamTransport(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("startup failed: {0}")]
    Startup(String),
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::DuplicateUser(_) => "DUPLICATE_USER",
            RelayError::DuplicateRoom(_) => "DUPLICATE_ROOM",
            RelayError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RelayError::RecipientUnavailable(_) => "RECIPIENT_UNAVAILABLE",
            RelayError::StreamTransport(_) => "STREAM_TRANSPORT",
            RelayError::InvalidInput(_) => "INVALID_INPUT",
            RelayError::Startup(_) => "STARTUP",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RelayError::DuplicateUser(_) | RelayError::DuplicateRoom(_) => StatusCode::CONFLICT,
            RelayError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::RecipientUnavailable(_)
            | RelayError::StreamTransport(_)
            | RelayError::Startup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
