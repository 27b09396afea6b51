//! Runtime server configuration, deserialised from `config.toml` layered
//! with `ATTEND_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use attend_core::policy::AttendancePolicy;
use chrono::NaiveTime;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Offset of the reporting timezone from UTC, in minutes.
  pub utc_offset_minutes: i32,
  /// `HH:MM`; scans at or before this minute are present.
  pub present_cutoff:     String,
  /// `HH:MM`; scans at or before this minute (and after `present_cutoff`)
  /// are late.
  pub late_cutoff:        String,
  pub session_ttl_hours:  i64,
  /// Seed demo accounts, courses and records on startup.
  pub seed_demo:          bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               3000,
      store_path:         PathBuf::from("~/.local/share/attend/attend.db"),
      utc_offset_minutes: 0,
      present_cutoff:     "08:10".to_string(),
      late_cutoff:        "08:30".to_string(),
      session_ttl_hours:  attend_api::identity::DEFAULT_SESSION_TTL_HOURS,
      seed_demo:          false,
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ATTEND"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn policy(&self) -> anyhow::Result<AttendancePolicy> {
    let present = parse_cutoff("present_cutoff", &self.present_cutoff)?;
    let late = parse_cutoff("late_cutoff", &self.late_cutoff)?;
    let offset = AttendancePolicy::offset_from_minutes(self.utc_offset_minutes)?;
    Ok(AttendancePolicy::new(present, late, offset)?)
  }

  pub fn session_ttl(&self) -> anyhow::Result<chrono::Duration> {
    anyhow::ensure!(self.session_ttl_hours > 0, "session_ttl_hours must be positive");
    chrono::Duration::try_hours(self.session_ttl_hours).context("session_ttl_hours is out of range")
  }
}

fn parse_cutoff(name: &str, value: &str) -> anyhow::Result<NaiveTime> {
  NaiveTime::parse_from_str(value, "%H:%M")
    .with_context(|| format!("{name} must be HH:MM, got {value:?}"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
