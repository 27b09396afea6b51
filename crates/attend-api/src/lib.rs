//! JSON REST API for the attendance portal.
//!
//! Exposes an axum [`Router`] backed by any [`attend_core::store::Store`].
//! Callers authenticate with `Authorization: Bearer <token>` obtained from
//! `POST /auth/login`. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", attend_api::api_router(state))
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod identity;
pub mod records;
pub mod scans;

use std::sync::Arc;

use attend_core::{Attendance, identity::AuthorizationContext, store::Store};
use axum::{
  Router,
  extract::FromRequestParts,
  http::request::Parts,
  routing::{get, post},
};
use chrono::Utc;

pub use error::ApiError;
pub use identity::Identity;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state for every handler.
pub struct ApiState<S> {
  pub attendance: Attendance<S>,
  pub identity:   Arc<Identity<S>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { attendance: self.attendance.clone(), identity: Arc::clone(&self.identity) }
  }
}

impl<S: Store> ApiState<S> {
  pub fn new(attendance: Attendance<S>, session_ttl: chrono::Duration) -> Self {
    let identity = Arc::new(Identity::new(Arc::clone(attendance.store()), session_ttl));
    Self { attendance, identity }
  }
}

// ─── Caller extractor ────────────────────────────────────────────────────────

/// The authenticated caller. Extraction fails with 401 when the bearer
/// token is missing, unknown or expired.
pub struct Caller(pub AuthorizationContext);

impl<S: Store> FromRequestParts<ApiState<S>> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &ApiState<S>) -> Result<Self, Self::Rejection> {
    let token = identity::bearer_token(&parts.headers).ok_or(attend_core::Error::NotAuthenticated)?;
    let ctx = state.identity.resolve(token, Utc::now()).await?;
    Ok(Caller(ctx))
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Store>(state: ApiState<S>) -> Router<()> {
  Router::new()
    // Session
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/auth/register", post(auth::register::<S>))
    .route("/me", get(auth::me))
    // Scanning
    .route("/roster", get(scans::roster::<S>))
    .route("/scans", post(scans::record::<S>))
    .route("/absentees", get(scans::absentees::<S>))
    // Records
    .route("/history", get(records::history::<S>))
    .route("/records", get(records::list::<S>))
    .route("/export", get(records::export::<S>))
    // Admin
    .route("/admin/overview", get(admin::overview::<S>))
    .route("/admin/courses", post(admin::create_course::<S>))
    .route("/admin/courses/{id}/teacher", post(admin::assign_teacher::<S>))
    .route("/admin/courses/{id}/students", post(admin::enroll_student::<S>))
    .route("/admin/students", post(admin::register_student::<S>))
    .route("/admin/teachers", post(admin::register_teacher::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
