//! Plain-text tables for terminal output.

use attend_core::{
  event::{AbsenceRecord, AttendanceEvent},
  person::Person,
};
use chrono::FixedOffset;

/// Left-align `rows` under `header`, padding each column to its widest cell.
pub fn table<const N: usize>(header: [&str; N], rows: &[[String; N]]) -> String {
  let mut widths = header.map(str::len);
  for row in rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let line = |cells: [&str; N]| {
    let mut out = String::new();
    for (i, (cell, w)) in cells.iter().zip(widths).enumerate() {
      if i + 1 == N {
        out.push_str(cell);
      } else {
        out.push_str(&format!("{cell:<w$}  "));
      }
    }
    out.trim_end().to_string()
  };

  let mut out = line(header);
  out.push('\n');
  for row in rows {
    out.push_str(&line(std::array::from_fn(|i| row[i].as_str())));
    out.push('\n');
  }
  out
}

pub fn events(events: &[AttendanceEvent], offset: FixedOffset) -> String {
  if events.is_empty() {
    return "No attendance records.\n".to_string();
  }
  let rows: Vec<[String; 5]> = events
    .iter()
    .map(|e| {
      [
        e.recorded_at.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        e.roll_number.to_string(),
        e.student_name.clone(),
        e.subject.to_string(),
        e.status.describe().to_string(),
      ]
    })
    .collect();
  table(["TIME", "ROLL", "NAME", "SUBJECT", "STATUS"], &rows)
}

pub fn absentees(records: &[AbsenceRecord]) -> String {
  if records.is_empty() {
    return "Nobody is absent.\n".to_string();
  }
  let rows: Vec<[String; 4]> = records
    .iter()
    .map(|r| {
      [r.date.to_string(), r.roll_number.to_string(), r.student_name.clone(), r.subject.to_string()]
    })
    .collect();
  table(["DATE", "ROLL", "NAME", "SUBJECT"], &rows)
}

pub fn roster(people: &[Person]) -> String {
  let rows: Vec<[String; 3]> = people
    .iter()
    .map(|p| {
      [
        p.roll_number.to_string(),
        p.name.clone(),
        p.credential.as_ref().map(|c| c.as_str().to_owned()).unwrap_or_else(|| "-".into()),
      ]
    })
    .collect();
  table(["ROLL", "NAME", "CREDENTIAL"], &rows)
}
