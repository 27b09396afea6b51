//! Async HTTP client wrapping the attendance JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use attend_core::{
  event::{AbsenceRecord, AttendanceEvent},
  identity::AuthorizationContext,
  person::Person,
  service::ScanReceipt,
};
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

/// Connection settings for the attendance API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub email:    String,
  pub password: String,
}

#[derive(Deserialize)]
struct LoginResponse {
  token: String,
  user:  AuthorizationContext,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the attendance REST API.
///
/// Holds the bearer token obtained by [`ApiClient::login`].
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
  token:  Option<String>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config, token: None })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Turn a non-success response into an error carrying the server's message.
  async fn check(what: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|b| b.error)
      .unwrap_or_else(|_| status.to_string());
    Err(anyhow!("{what}: {message}"))
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, date: Option<NaiveDate>) -> Result<T> {
    let mut req = self.auth(self.client.get(self.url(path)));
    if let Some(date) = date {
      req = req.query(&[("date", date.to_string())]);
    }
    let resp = req.send().await.with_context(|| format!("GET {path} failed"))?;
    Self::check(&format!("GET {path}"), resp)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising GET {path}"))
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// `POST /api/auth/login`. `portal` is e.g. `Some("teacher")`.
  pub async fn login(&mut self, portal: Option<&str>) -> Result<AuthorizationContext> {
    if self.config.email.is_empty() {
      return Err(anyhow!("no email configured; pass --email or set ATTEND_EMAIL"));
    }
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .json(&json!({
        "email": self.config.email,
        "password": self.config.password,
        "role": portal,
      }))
      .send()
      .await
      .context("POST /auth/login failed")?;
    let body: LoginResponse = Self::check("login", resp)
      .await?
      .json()
      .await
      .context("deserialising login response")?;
    self.token = Some(body.token);
    Ok(body.user)
  }

  /// `POST /api/auth/logout`
  pub async fn logout(&mut self) -> Result<()> {
    if self.token.is_none() {
      return Ok(());
    }
    let resp = self
      .auth(self.client.post(self.url("/auth/logout")))
      .send()
      .await
      .context("POST /auth/logout failed")?;
    Self::check("logout", resp).await?;
    self.token = None;
    Ok(())
  }

  // ── Scanning ──────────────────────────────────────────────────────────────

  /// `POST /api/scans`
  pub async fn scan(&self, credential: &str, subject: Option<&str>) -> Result<ScanReceipt> {
    let resp = self
      .auth(self.client.post(self.url("/scans")))
      .json(&json!({ "credential": credential, "subject": subject }))
      .send()
      .await
      .context("POST /scans failed")?;
    Self::check("scan", resp).await?.json().await.context("deserialising scan receipt")
  }

  /// `GET /api/roster`
  pub async fn roster(&self) -> Result<Vec<Person>> { self.get_json("/roster", None).await }

  /// `GET /api/absentees[?date=]`
  pub async fn absentees(&self, date: Option<NaiveDate>) -> Result<Vec<AbsenceRecord>> {
    self.get_json("/absentees", date).await
  }

  // ── Records ───────────────────────────────────────────────────────────────

  /// `GET /api/history`
  pub async fn history(&self) -> Result<Vec<AttendanceEvent>> { self.get_json("/history", None).await }

  /// `GET /api/records[?date=]`
  pub async fn records(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceEvent>> {
    self.get_json("/records", date).await
  }

  /// `GET /api/export[?date=]`, returned as CSV text.
  pub async fn export(&self, date: Option<NaiveDate>) -> Result<String> {
    let mut req = self.auth(self.client.get(self.url("/export")));
    if let Some(date) = date {
      req = req.query(&[("date", date.to_string())]);
    }
    let resp = req.send().await.context("GET /export failed")?;
    Self::check("export", resp).await?.text().await.context("reading export body")
  }
}
