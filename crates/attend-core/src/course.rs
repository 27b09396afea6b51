//! Subjects and the admin-managed courses that carry them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::person::RollNumber;

/// An opaque subject label (e.g. `IOT`). The closed set of subjects is the
/// set of courses in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
  pub fn new(label: impl Into<String>) -> Self { Self(label.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A course: one subject, at most one teacher at a time, and the students
/// enrolled in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub course_id:     i64,
  pub subject:       Subject,
  pub teacher_email: Option<String>,
  pub enrolled:      Vec<RollNumber>,
}
