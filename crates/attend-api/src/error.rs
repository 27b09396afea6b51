//! API error type and [`axum::response::IntoResponse`] implementation.

use attend_core::Error as CoreError;
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("password hashing failed: {0}")]
  Hashing(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Core(e) if e.is_authentication() => StatusCode::UNAUTHORIZED,
      ApiError::Core(e) => match e {
        CoreError::NotAuthorized
        | CoreError::NotTeacher
        | CoreError::NoSubjectAssigned
        | CoreError::SubjectNotAssigned(_) => StatusCode::FORBIDDEN,
        CoreError::UnknownCredential | CoreError::CourseOrPersonNotFound => StatusCode::NOT_FOUND,
        CoreError::AlreadyRecorded { .. } | CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        CoreError::AmbiguousSubject(_)
        | CoreError::EmptySubject
        | CoreError::InvalidRollNumber(_)
        | CoreError::InvalidPolicy(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::BadRequest(m) => m.clone(),
      // Internal details stay in the log.
      _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
        tracing::error!(error = %self, "request failed");
        "Internal server error".to_string()
      }
      _ => self.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
