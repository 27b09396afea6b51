//! Attendance events (the append-only unit of the ledger) and the derived
//! absence records computed from them.
//!
//! Events are never updated or deleted. Absence is never stored: an
//! [`AbsenceRecord`] only exists as the result of a query.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{course::Subject, person::RollNumber};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The status a scan receives, a pure function of its time of day.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  Present,
  Late,
  SeriouslyLate,
}

impl Status {
  /// Human-readable form used in user-facing messages.
  pub fn describe(self) -> &'static str {
    match self {
      Self::Present => "present",
      Self::Late => "late",
      Self::SeriouslyLate => "seriously late",
    }
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A recorded scan. At most one exists per `(roll_number, subject, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
  /// Store-assigned, monotonically increasing.
  pub event_id:     i64,
  pub roll_number:  RollNumber,
  pub student_name: String,
  pub subject:      Subject,
  /// Email of the teacher who recorded the scan.
  pub recorded_by:  String,
  pub recorded_at:  DateTime<Utc>,
  /// Calendar date of `recorded_at` in the reporting timezone.
  pub date:         NaiveDate,
  pub status:       Status,
}

/// Input to [`crate::store::Ledger::append_if_absent`]. The id is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub roll_number:  RollNumber,
  pub student_name: String,
  pub subject:      Subject,
  pub recorded_by:  String,
  pub recorded_at:  DateTime<Utc>,
  pub date:         NaiveDate,
  pub status:       Status,
}

impl NewEvent {
  pub fn into_event(self, event_id: i64) -> AttendanceEvent {
    AttendanceEvent {
      event_id,
      roll_number: self.roll_number,
      student_name: self.student_name,
      subject: self.subject,
      recorded_by: self.recorded_by,
      recorded_at: self.recorded_at,
      date: self.date,
      status: self.status,
    }
  }
}

/// Result of a conditional append.
#[derive(Debug, Clone)]
pub enum AppendOutcome {
  Appended(AttendanceEvent),
  /// An event for the same `(roll_number, subject, date)` already existed;
  /// nothing was written.
  Duplicate,
}

/// Order events most recent first. Equal timestamps fall back to the higher
/// event id so the order is total.
pub fn sort_newest_first(events: &mut [AttendanceEvent]) {
  events.sort_by(|a, b| {
    b.recorded_at
      .cmp(&a.recorded_at)
      .then_with(|| b.event_id.cmp(&a.event_id))
  });
}

// ─── Derived absence ─────────────────────────────────────────────────────────

/// Marker status for derived absence records; serialises as `"absent"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentStatus {
  #[default]
  Absent,
}

/// An expected `(person, subject)` pair with no event on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceRecord {
  pub student_name: String,
  pub roll_number:  RollNumber,
  pub subject:      Subject,
  pub date:         NaiveDate,
  pub status:       AbsentStatus,
}
