//! Error types for `attend-core`.
//!
//! Every variant is a caller-facing outcome; the `Display` text is the
//! message shown to the user.

use thiserror::Error;

use crate::course::Subject;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Not authenticated")]
  NotAuthenticated,

  #[error("Session expired")]
  SessionExpired,

  #[error("Not authorized")]
  NotAuthorized,

  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("You do not have teacher privileges")]
  NotTeacher,

  #[error("No subject assigned to teacher")]
  NoSubjectAssigned,

  #[error("subject {0} is not assigned to this teacher")]
  SubjectNotAssigned(Subject),

  /// The teacher teaches several subjects and the scan did not name one.
  #[error("teacher has several subjects; choose one of: {}", .0.iter().map(Subject::as_str).collect::<Vec<_>>().join(", "))]
  AmbiguousSubject(Vec<Subject>),

  #[error("Fingerprint not recognized")]
  UnknownCredential,

  #[error("{name} already marked for {subject} today")]
  AlreadyRecorded { name: String, subject: Subject },

  #[error("Course name is required")]
  EmptySubject,

  #[error("Course or person not found")]
  CourseOrPersonNotFound,

  #[error("{0} already exists")]
  AlreadyExists(String),

  #[error("invalid roll number {0:?}: expected 11 digits")]
  InvalidRollNumber(String),

  #[error("invalid attendance policy: {0}")]
  InvalidPolicy(String),

  #[error("operation failed: {0}")]
  OperationFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a collaborator failure. The message is logged here so callers do
  /// not have to.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    tracing::error!(error = %err, "store operation failed");
    Self::OperationFailed(Box::new(err))
  }

  /// Whether the error means the caller could not be identified at all, as
  /// opposed to being identified but lacking permission.
  pub fn is_authentication(&self) -> bool {
    matches!(self, Self::NotAuthenticated | Self::SessionExpired | Self::InvalidCredentials)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
