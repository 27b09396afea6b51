//! People on the roster and the identifiers used to find them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── RollNumber ──────────────────────────────────────────────────────────────

/// A stable, unique, 11-digit student identifier (e.g. `20260000002`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RollNumber(String);

impl RollNumber {
  pub const LEN: usize = 11;

  /// Validate and wrap a roll number. Surrounding whitespace is ignored.
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.len() == Self::LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(trimmed.to_owned()))
    } else {
      Err(Error::InvalidRollNumber(raw.to_owned()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for RollNumber {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<RollNumber> for String {
  fn from(value: RollNumber) -> Self { value.0 }
}

impl fmt::Display for RollNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── ScanCredential ──────────────────────────────────────────────────────────

/// The identifier a physical scanner reports (e.g. `FP-0002`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCredential(String);

impl ScanCredential {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ScanCredential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// A student known to the roster. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub name:        String,
  pub roll_number: RollNumber,
  /// Unique across the roster when present.
  pub credential:  Option<ScanCredential>,
}
