//! Handlers for `/admin` endpoints. Every route requires the admin role.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/overview` | Courses, teachers, students |
//! | `POST` | `/admin/courses` | Body: `{"subject":"IOT"}`; 201 |
//! | `POST` | `/admin/courses/{id}/teacher` | Body: `{"email":…}`; replaces the teacher |
//! | `POST` | `/admin/courses/{id}/students` | Body: `{"roll_number":…}`; idempotent |
//! | `POST` | `/admin/students` | Same body as `/auth/register`; 201 |
//! | `POST` | `/admin/teachers` | Body: `{"name","email","password","phone"?}`; 201 |

use attend_core::{
  Error as CoreError,
  admin::{AdminOverview, TeacherRegistration},
  course::{Course, Subject},
  identity::{AuthorizationContext, Role},
  person::RollNumber,
  store::Store,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{ApiState, Caller, auth::RegisterBody, error::ApiError, identity::hash_password};

/// `GET /admin/overview`
pub async fn overview<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<AdminOverview>, ApiError> {
  Ok(Json(state.attendance.overview(&ctx).await?))
}

// ─── Courses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CourseBody {
  pub subject: String,
}

/// `POST /admin/courses`
pub async fn create_course<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<CourseBody>,
) -> Result<impl IntoResponse, ApiError> {
  let course = state.attendance.create_course(&ctx, Subject::new(body.subject.trim())).await?;
  Ok((StatusCode::CREATED, Json(course)))
}

#[derive(Debug, Deserialize)]
pub struct TeacherBody {
  pub email: String,
}

/// `POST /admin/courses/{id}/teacher`
pub async fn assign_teacher<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<i64>,
  Json(body): Json<TeacherBody>,
) -> Result<Json<Course>, ApiError> {
  Ok(Json(state.attendance.assign_teacher(&ctx, id, &body.email).await?))
}

#[derive(Debug, Deserialize)]
pub struct EnrollBody {
  pub roll_number: String,
}

/// `POST /admin/courses/{id}/students`
pub async fn enroll_student<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<i64>,
  Json(body): Json<EnrollBody>,
) -> Result<Json<Course>, ApiError> {
  let roll_number = RollNumber::parse(&body.roll_number)?;
  Ok(Json(state.attendance.enroll_student(&ctx, id, &roll_number).await?))
}

// ─── People ──────────────────────────────────────────────────────────────────

/// Refuse non-admins before any password is hashed.
fn require_admin(ctx: &AuthorizationContext) -> Result<(), ApiError> {
  if ctx.is(Role::Admin) { Ok(()) } else { Err(CoreError::NotAuthorized.into()) }
}

/// `POST /admin/students`
pub async fn register_student<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&ctx)?;
  let account = state.attendance.register_student(&ctx, body.into_registration()?).await?;
  Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
pub struct NewTeacherBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
  #[serde(default)]
  pub phone:    Option<String>,
}

/// `POST /admin/teachers`
pub async fn register_teacher<S: Store>(
  State(state): State<ApiState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<NewTeacherBody>,
) -> Result<impl IntoResponse, ApiError> {
  require_admin(&ctx)?;
  if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
    return Err(ApiError::BadRequest("name, email and password are required".into()));
  }
  let registration = TeacherRegistration {
    name:          body.name.trim().to_owned(),
    email:         body.email,
    phone:         body.phone,
    password_hash: hash_password(&body.password).map_err(|e| ApiError::Hashing(e.to_string()))?,
  };
  let account = state.attendance.register_teacher(&ctx, registration).await?;
  Ok((StatusCode::CREATED, Json(account)))
}
