//! `attend`: scan station and reporting client for the attendance server.
//!
//! # Usage
//!
//! ```
//! attend --url http://localhost:3000 --email bob.teacher@example.com --password teacher123 scan FP-0002
//! attend --config ~/.config/attend/config.toml station
//! attend history
//! ```

mod client;
mod render;

use std::{
  io::{self, BufRead as _, Write as _},
  path::PathBuf,
};

use anyhow::{Context, Result};
use attend_core::policy::AttendancePolicy;
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "attend", about = "Scan station and reports for the attendance portal")]
struct Args {
  /// Path to a TOML config file (url, email, password, utc_offset_minutes).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the attendance server (default: http://localhost:3000).
  #[arg(long, env = "ATTEND_URL")]
  url: Option<String>,

  /// Account email.
  #[arg(long, env = "ATTEND_EMAIL")]
  email: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "ATTEND_PASSWORD")]
  password: Option<String>,

  /// Offset of the reporting timezone from UTC, in minutes, for display.
  #[arg(long, env = "ATTEND_UTC_OFFSET_MINUTES")]
  utc_offset_minutes: Option<i32>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record one scan.
  Scan {
    credential: String,
    /// Subject to record against; required for multi-subject teachers.
    #[arg(short, long)]
    subject:    Option<String>,
  },
  /// Read credentials from stdin, one per line, and record each.
  Station {
    #[arg(short, long)]
    subject: Option<String>,
  },
  /// List students and their scan credentials.
  Roster,
  /// Show who has no record on a date (default: today).
  Absentees {
    #[arg(short, long)]
    date: Option<NaiveDate>,
  },
  /// Show your own attendance.
  History,
  /// Show the records you have taken.
  Records {
    #[arg(short, long)]
    date: Option<NaiveDate>,
  },
  /// Download your records as CSV.
  Export {
    #[arg(short, long)]
    date:   Option<NaiveDate>,
    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },
}

impl Command {
  /// The portal to log into for this command.
  fn portal(&self) -> Option<&'static str> {
    match self {
      Command::Scan { .. } | Command::Station { .. } | Command::Roster => Some("teacher"),
      _ => None,
    }
  }
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:                String,
  #[serde(default)]
  email:              String,
  #[serde(default)]
  password:           String,
  #[serde(default)]
  utc_offset_minutes: i32,
}

fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_owned()))
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: pick(args.url, &file_cfg.url).unwrap_or_else(|| "http://localhost:3000".to_string()),
    email:    pick(args.email, &file_cfg.email).unwrap_or_default(),
    password: pick(args.password, &file_cfg.password).unwrap_or_default(),
  };
  let offset_minutes = args.utc_offset_minutes.unwrap_or(file_cfg.utc_offset_minutes);
  let offset = AttendancePolicy::offset_from_minutes(offset_minutes)?;

  let mut client = ApiClient::new(api_config)?;
  let user = client.login(args.command.portal()).await?;
  tracing::info!(email = %user.email, role = %user.role, "logged in");

  let result = run(&client, args.command, offset).await;
  client.logout().await.ok();
  result
}

async fn run(client: &ApiClient, command: Command, offset: FixedOffset) -> Result<()> {
  match command {
    Command::Scan { credential, subject } => {
      let receipt = client.scan(&credential, subject.as_deref()).await?;
      println!("{}", receipt.message);
    }
    Command::Station { subject } => station(client, subject.as_deref()).await?,
    Command::Roster => print!("{}", render::roster(&client.roster().await?)),
    Command::Absentees { date } => print!("{}", render::absentees(&client.absentees(date).await?)),
    Command::History => print!("{}", render::events(&client.history().await?, offset)),
    Command::Records { date } => print!("{}", render::events(&client.records(date).await?, offset)),
    Command::Export { date, output } => {
      let csv = client.export(date).await?;
      match output {
        Some(path) => {
          std::fs::write(&path, csv).with_context(|| format!("writing {}", path.display()))?;
          eprintln!("Wrote {}", path.display());
        }
        None => print!("{csv}"),
      }
    }
  }
  Ok(())
}

/// Record every credential read from stdin. Rejected scans are reported
/// and the station keeps going.
async fn station(client: &ApiClient, subject: Option<&str>) -> Result<()> {
  eprintln!("Scan station ready. One credential per line; Ctrl-D to stop.");
  let stdin = io::stdin();
  let mut line = String::new();
  loop {
    eprint!("> ");
    io::stderr().flush().ok();
    line.clear();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    let credential = line.trim();
    if credential.is_empty() {
      continue;
    }
    match client.scan(credential, subject).await {
      Ok(receipt) => println!("{}", receipt.message),
      Err(e) => println!("rejected: {e:#}"),
    }
  }
  Ok(())
}
