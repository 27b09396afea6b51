//! Status classification and the reporting timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset as _, Timelike as _, Utc};

use crate::{Error, Result, event::Status};

/// Minutes since midnight for a time of day. Seconds are ignored.
pub fn minutes_since_midnight(time: NaiveTime) -> u32 { time.hour() * 60 + time.minute() }

/// Thresholds and timezone that turn a scan instant into a status and a
/// reporting date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
  /// Last minute (inclusive) that still counts as present.
  present_cutoff: u32,
  /// Last minute (inclusive) that still counts as late.
  late_cutoff:    u32,
  utc_offset:     FixedOffset,
}

impl Default for AttendancePolicy {
  /// 08:10 / 08:30, reporting in UTC.
  fn default() -> Self {
    Self { present_cutoff: 8 * 60 + 10, late_cutoff: 8 * 60 + 30, utc_offset: Utc.fix() }
  }
}

impl AttendancePolicy {
  pub fn new(present_cutoff: NaiveTime, late_cutoff: NaiveTime, utc_offset: FixedOffset) -> Result<Self> {
    let present = minutes_since_midnight(present_cutoff);
    let late = minutes_since_midnight(late_cutoff);
    if late < present {
      return Err(Error::InvalidPolicy(format!(
        "late cutoff {late_cutoff} is before present cutoff {present_cutoff}"
      )));
    }
    Ok(Self { present_cutoff: present, late_cutoff: late, utc_offset })
  }

  /// Build an offset from whole minutes east of UTC.
  pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
    minutes
      .checked_mul(60)
      .and_then(FixedOffset::east_opt)
      .ok_or_else(|| Error::InvalidPolicy(format!("utc offset of {minutes} minutes is out of range")))
  }

  pub fn utc_offset(&self) -> FixedOffset { self.utc_offset }

  /// Classify a time of day given in minutes since midnight. Total: every
  /// input maps to exactly one status, and each cutoff minute belongs to the
  /// lower bracket.
  pub fn classify(&self, minutes: u32) -> Status {
    if minutes <= self.present_cutoff {
      Status::Present
    } else if minutes <= self.late_cutoff {
      Status::Late
    } else {
      Status::SeriouslyLate
    }
  }

  /// Classify an instant by its local time of day.
  pub fn classify_at(&self, at: DateTime<Utc>) -> Status {
    self.classify(minutes_since_midnight(at.with_timezone(&self.utc_offset).time()))
  }

  /// The calendar date an instant falls on in the reporting timezone.
  pub fn reporting_date(&self, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&self.utc_offset).date_naive()
  }
}
