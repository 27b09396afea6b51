//! Handlers for recorded attendance.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/history` | The caller's own events, newest first |
//! | `GET`  | `/records` | Teacher's ledger; optional `?date=` |
//! | `GET`  | `/export` | Teacher's ledger as CSV; optional `?date=` |

use attend_core::{event::AttendanceEvent, service::ExportSummary, store::Store};
use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};

use crate::{ApiState, Caller, error::ApiError, scans::DateParams};

/// `GET /history`
pub async fn history<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<Vec<AttendanceEvent>>, ApiError> {
  Ok(Json(state.attendance.history_for(&ctx).await?))
}

/// `GET /records[?date=<date>]`
pub async fn list<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<AttendanceEvent>>, ApiError> {
  Ok(Json(state.attendance.ledger_for(&ctx, params.date).await?))
}

/// `GET /export[?date=<date>]`
pub async fn export<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Query(params): Query<DateParams>,
) -> Result<impl IntoResponse, ApiError> {
  let summary = state.attendance.export_for(&ctx, params.date).await?;
  let filename = match summary.date {
    Some(date) => format!("attendance-{date}.csv"),
    None => "attendance.csv".to_string(),
  };
  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    to_csv(&summary),
  ))
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

const CSV_HEADER: &str = "id,roll_number,student_name,subject,recorded_at,status";

/// Quote a field if it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
  if value.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_owned()
  }
}

pub fn to_csv(summary: &ExportSummary) -> String {
  let mut out = String::from(CSV_HEADER);
  out.push('\n');
  for e in &summary.records {
    let row = [
      e.event_id.to_string(),
      e.roll_number.to_string(),
      csv_field(&e.student_name),
      csv_field(e.subject.as_str()),
      e.recorded_at.to_rfc3339(),
      e.status.to_string(),
    ];
    out.push_str(&row.join(","));
    out.push('\n');
  }
  out
}
