//! Handlers for session endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"email","password","role"?}`; returns a bearer token |
//! | `POST` | `/auth/logout` | 204; unknown tokens are ignored |
//! | `POST` | `/auth/register` | Student self-registration, no scan credential; 201 |
//! | `GET`  | `/me` | The resolved caller |

use attend_core::{
  admin::StudentRegistration,
  identity::{Account, AuthorizationContext, Role},
  person::{RollNumber, ScanCredential},
  store::Store,
};
use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
  ApiState, Caller,
  error::ApiError,
  identity::{Issued, bearer_token, hash_password},
};

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
  /// The portal being logged into, e.g. `"teacher"`.
  #[serde(default)]
  pub role:     Option<Role>,
}

/// `POST /auth/login`
pub async fn login<S: Store>(
  State(state): State<ApiState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Issued>, ApiError> {
  let issued = state.identity.login(&body.email, &body.password, body.role, Utc::now()).await?;
  Ok(Json(issued))
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S: Store>(State(state): State<ApiState<S>>, headers: HeaderMap) -> StatusCode {
  if let Some(token) = bearer_token(&headers) {
    state.identity.logout(token);
  }
  StatusCode::NO_CONTENT
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:        String,
  pub email:       String,
  pub password:    String,
  pub roll_number: String,
  #[serde(default)]
  pub phone:       Option<String>,
  /// Only honoured on the admin route. Self-registration never binds a
  /// credential; an admin does that.
  #[serde(default)]
  pub credential:  Option<String>,
}

impl RegisterBody {
  /// Validate and hash into a registration the core accepts.
  pub(crate) fn into_registration(self) -> Result<StudentRegistration, ApiError> {
    if self.name.trim().is_empty() || self.email.trim().is_empty() {
      return Err(ApiError::BadRequest("name and email are required".into()));
    }
    if self.password.is_empty() {
      return Err(ApiError::BadRequest("password is required".into()));
    }
    let roll_number = RollNumber::parse(&self.roll_number)?;
    let password_hash = hash_password(&self.password).map_err(|e| ApiError::Hashing(e.to_string()))?;
    Ok(StudentRegistration {
      name: self.name.trim().to_owned(),
      email: self.email,
      roll_number,
      phone: self.phone,
      credential: self.credential.filter(|c| !c.trim().is_empty()).map(ScanCredential::new),
      password_hash,
    })
  }
}

/// `POST /auth/register`
pub async fn register<S: Store>(
  State(state): State<ApiState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  let registration = RegisterBody { credential: None, ..body }.into_registration()?;
  let account: Account = state.attendance.register(registration).await?;
  Ok((StatusCode::CREATED, Json(account)))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me(Caller(ctx): Caller) -> Json<AuthorizationContext> { Json(ctx) }
