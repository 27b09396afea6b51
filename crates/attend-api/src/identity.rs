//! The identity provider: password login, opaque bearer sessions, and
//! resolution of a token into an [`AuthorizationContext`].
//!
//! Tokens are 32 random bytes, URL-safe base64 on the wire. Only their
//! SHA-256 digest is kept server-side, so a leaked session table does not
//! yield usable tokens.

use std::{
  collections::HashMap,
  sync::{Arc, LazyLock, Mutex, PoisonError},
};

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use attend_core::{
  Error, Result,
  admin::normalize_email,
  identity::{Account, AuthorizationContext, Role},
  store::Store,
};
use axum::http::{HeaderMap, header::AUTHORIZATION};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// Default session lifetime: one week.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 7 * 24;

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> std::result::Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

/// Verified against when the email is unknown, so that path costs the same
/// argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<String> =
  LazyLock::new(|| hash_password(&new_token()).unwrap_or_default());

// ─── Tokens ──────────────────────────────────────────────────────────────────

fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Sessions ────────────────────────────────────────────────────────────────

struct Session {
  email:      String,
  expires_at: DateTime<Utc>,
}

/// A freshly issued session.
#[derive(Debug, Clone, Serialize)]
pub struct Issued {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub user:       AuthorizationContext,
}

/// Password login and session resolution over an [`Accounts`] store.
///
/// [`Accounts`]: attend_core::store::Accounts
pub struct Identity<S> {
  store:    Arc<S>,
  ttl:      Duration,
  /// Keyed by token digest.
  sessions: Mutex<HashMap<String, Session>>,
}

impl<S: Store> Identity<S> {
  pub fn new(store: Arc<S>, ttl: Duration) -> Self {
    Self { store, ttl, sessions: Mutex::new(HashMap::new()) }
  }

  fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
    self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Verify `email`/`password` and open a session.
  ///
  /// `portal` is the role the login form is for, if any. Logging into the
  /// teacher portal with a non-teacher account fails with
  /// [`Error::NotTeacher`]; any other mismatch with [`Error::NotAuthorized`].
  pub async fn login(
    &self,
    email: &str,
    password: &str,
    portal: Option<Role>,
    now: DateTime<Utc>,
  ) -> Result<Issued> {
    let email = normalize_email(email);
    let account = match self.store.find_account(&email).await.map_err(Error::store)? {
      Some(account) => verify_password(password, &account.password_hash).then_some(account),
      None => {
        verify_password(password, &DUMMY_HASH);
        None
      }
    };
    let Some(account) = account else {
      tracing::warn!(%email, "login rejected");
      return Err(Error::InvalidCredentials);
    };

    match portal {
      Some(Role::Teacher) if account.role != Role::Teacher => return Err(Error::NotTeacher),
      Some(role) if role != account.role => return Err(Error::NotAuthorized),
      _ => {}
    }

    let user = self.context_for(&account).await?;
    let token = new_token();
    let expires_at = now + self.ttl;
    {
      let mut sessions = self.sessions();
      sessions.retain(|_, s| s.expires_at > now);
      sessions.insert(digest(&token), Session { email: account.email.clone(), expires_at });
    }

    tracing::info!(email = %account.email, role = %account.role, "login");
    Ok(Issued { token, expires_at, user })
  }

  /// End the session for `token`. Unknown tokens are ignored.
  pub fn logout(&self, token: &str) {
    if let Some(session) = self.sessions().remove(&digest(token)) {
      tracing::info!(email = %session.email, "logout");
    }
  }

  /// Resolve `token` into the caller's context. Subjects are read fresh from
  /// the catalog on every call so reassignments apply immediately.
  pub async fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<AuthorizationContext> {
    let key = digest(token);
    let email = {
      let mut sessions = self.sessions();
      match sessions.get(&key) {
        None => return Err(Error::NotAuthenticated),
        Some(s) if s.expires_at <= now => {
          sessions.remove(&key);
          return Err(Error::SessionExpired);
        }
        Some(s) => s.email.clone(),
      }
    };

    let account = self
      .store
      .find_account(&email)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotAuthenticated)?;
    self.context_for(&account).await
  }

  async fn context_for(&self, account: &Account) -> Result<AuthorizationContext> {
    let subjects = if account.role == Role::Teacher {
      self.store.subjects_for_teacher(&account.email).await.map_err(Error::store)?
    } else {
      Vec::new()
    };
    Ok(AuthorizationContext::for_account(account, subjects))
  }
}
