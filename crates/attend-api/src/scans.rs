//! Handlers for the scan station.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/roster` | Teachers only |
//! | `POST` | `/scans` | Body: `{"credential":"FP-0002","subject"?:"IOT"}`; 201 |
//! | `GET`  | `/absentees` | Optional `?date=YYYY-MM-DD`, default today |

use attend_core::{
  event::AbsenceRecord,
  person::Person,
  service::{ScanReceipt, ScanRequest},
  store::Store,
};
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{ApiState, Caller, error::ApiError};

/// `?date=` filter shared by the date-scoped endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
  pub date: Option<NaiveDate>,
}

/// `GET /roster`
pub async fn roster<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<Vec<Person>>, ApiError> {
  Ok(Json(state.attendance.roster_for(&ctx).await?))
}

/// `POST /scans`
pub async fn record<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Json(request): Json<ScanRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let receipt: ScanReceipt = state.attendance.record_scan(&ctx, &request, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}

/// `GET /absentees[?date=<date>]`
pub async fn absentees<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<AbsenceRecord>>, ApiError> {
  let now = Utc::now();
  let date = params.date.unwrap_or_else(|| state.attendance.policy().reporting_date(now));
  Ok(Json(state.attendance.absentees_for(&ctx, date, now).await?))
}
