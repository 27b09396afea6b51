//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision,
//! dates as `YYYY-MM-DD`, and enums by their lower-case wire names.

use std::str::FromStr as _;

use attend_core::{
  course::{Course, Subject},
  event::{AttendanceEvent, Status},
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::decode("recorded_at", s, e))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::decode("date", s, e))
}

pub fn decode_roll(s: &str) -> Result<RollNumber> {
  RollNumber::parse(s).map_err(|e| Error::decode("roll_number", s, e))
}

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|e| Error::decode("status", s, e))
}

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|e| Error::decode("role", s, e))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `people` row.
pub struct RawPerson {
  pub roll_number: String,
  pub name:        String,
  pub credential:  Option<String>,
}

impl RawPerson {
  pub const COLUMNS: &'static str = "roll_number, name, credential";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { roll_number: row.get(0)?, name: row.get(1)?, credential: row.get(2)? })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      roll_number: decode_roll(&self.roll_number)?,
      name:        self.name,
      credential:  self.credential.map(ScanCredential::new),
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:     i64,
  pub roll_number:  String,
  pub student_name: String,
  pub subject:      String,
  pub recorded_by:  String,
  pub recorded_at:  String,
  pub date:         String,
  pub status:       String,
}

impl RawEvent {
  pub const COLUMNS: &'static str =
    "event_id, roll_number, student_name, subject, recorded_by, recorded_at, date, status";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      roll_number:  row.get(1)?,
      student_name: row.get(2)?,
      subject:      row.get(3)?,
      recorded_by:  row.get(4)?,
      recorded_at:  row.get(5)?,
      date:         row.get(6)?,
      status:       row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<AttendanceEvent> {
    Ok(AttendanceEvent {
      event_id:     self.event_id,
      roll_number:  decode_roll(&self.roll_number)?,
      student_name: self.student_name,
      subject:      Subject::new(self.subject),
      recorded_by:  self.recorded_by,
      recorded_at:  decode_dt(&self.recorded_at)?,
      date:         decode_date(&self.date)?,
      status:       decode_status(&self.status)?,
    })
  }
}

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub email:         String,
  pub name:          String,
  pub role:          String,
  pub roll_number:   Option<String>,
  pub phone:         Option<String>,
  pub password_hash: String,
}

impl RawAccount {
  pub const COLUMNS: &'static str = "email, name, role, roll_number, phone, password_hash";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      email:         row.get(0)?,
      name:          row.get(1)?,
      role:          row.get(2)?,
      roll_number:   row.get(3)?,
      phone:         row.get(4)?,
      password_hash: row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      email:         self.email,
      name:          self.name,
      role:          decode_role(&self.role)?,
      roll_number:   self.roll_number.as_deref().map(decode_roll).transpose()?,
      phone:         self.phone,
      password_hash: self.password_hash,
    })
  }
}

/// A `courses` row plus the roll numbers enrolled in it.
pub struct RawCourse {
  pub course_id:     i64,
  pub subject:       String,
  pub teacher_email: Option<String>,
  pub enrolled:      Vec<String>,
}

impl RawCourse {
  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:     self.course_id,
      subject:       Subject::new(self.subject),
      teacher_email: self.teacher_email,
      enrolled:      self
        .enrolled
        .iter()
        .map(|r| decode_roll(r))
        .collect::<Result<_>>()?,
    })
  }
}
