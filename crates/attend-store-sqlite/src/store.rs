//! [`SqliteStore`], the SQLite implementation of the collaborator traits.

use std::{collections::BTreeMap, path::Path};

use attend_core::{
  course::{Course, Subject},
  event::{AppendOutcome, AttendanceEvent, NewEvent},
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
  store::{Accounts, Catalog, EventQuery, Ledger, Roster},
};
use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{RawAccount, RawCourse, RawEvent, RawPerson, encode_date, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load courses (optionally one) with their enrolments, ordered by id.
  async fn load_courses(&self, only: Option<i64>) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(move |conn| {
        let mut courses: BTreeMap<i64, RawCourse> = BTreeMap::new();

        let mut stmt = conn.prepare(
          "SELECT course_id, subject, teacher_email FROM courses
           WHERE ?1 IS NULL OR course_id = ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![only], |row| {
          Ok(RawCourse {
            course_id:     row.get(0)?,
            subject:       row.get(1)?,
            teacher_email: row.get(2)?,
            enrolled:      Vec::new(),
          })
        })?;
        for row in rows {
          let raw = row?;
          courses.insert(raw.course_id, raw);
        }

        let mut stmt = conn.prepare(
          "SELECT course_id, roll_number FROM enrollments
           WHERE ?1 IS NULL OR course_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt.query_map(rusqlite::params![only], |row| {
          Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
          let (course_id, roll) = row?;
          if let Some(course) = courses.get_mut(&course_id) {
            course.enrolled.push(roll);
          }
        }

        Ok(courses.into_values().collect())
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

impl Roster for SqliteStore {
  type Error = crate::Error;

  async fn resolve_credential(&self, credential: &ScanCredential) -> Result<Option<Person>> {
    let credential = credential.as_str().to_owned();

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM people WHERE credential = ?1", RawPerson::COLUMNS),
              rusqlite::params![credential],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn get_person(&self, roll_number: &RollNumber) -> Result<Option<Person>> {
    let roll = roll_number.as_str().to_owned();

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM people WHERE roll_number = ?1", RawPerson::COLUMNS),
              rusqlite::params![roll],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn list_people(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {} FROM people ORDER BY roll_number", RawPerson::COLUMNS))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn insert_person(&self, person: Person) -> Result<bool> {
    let roll       = person.roll_number.as_str().to_owned();
    let name       = person.name;
    let credential = person.credential.map(|c| c.as_str().to_owned());

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO people (roll_number, name, credential) VALUES (?1, ?2, ?3)",
          rusqlite::params![roll, name, credential],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(inserted)
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

impl Ledger for SqliteStore {
  type Error = crate::Error;

  async fn exists(&self, roll_number: &RollNumber, subject: &Subject, date: NaiveDate) -> Result<bool> {
    let roll     = roll_number.as_str().to_owned();
    let subject  = subject.as_str().to_owned();
    let date_str = encode_date(date);

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM events WHERE roll_number = ?1 AND subject = ?2 AND date = ?3",
              rusqlite::params![roll, subject, date_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(found)
  }

  async fn append_if_absent(&self, event: NewEvent) -> Result<AppendOutcome> {
    let roll        = event.roll_number.as_str().to_owned();
    let name        = event.student_name.clone();
    let subject     = event.subject.as_str().to_owned();
    let recorded_by = event.recorded_by.clone();
    let at_str      = encode_dt(event.recorded_at);
    let date_str    = encode_date(event.date);
    let status      = event.status.as_ref().to_owned();

    // The UNIQUE key decides; this holds across connections and processes.
    let event_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO events (
             roll_number, student_name, subject, recorded_by, recorded_at, date, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![roll, name, subject, recorded_by, at_str, date_str, status],
        )?;
        Ok((changed == 1).then(|| conn.last_insert_rowid()))
      })
      .await?;

    Ok(match event_id {
      Some(id) => AppendOutcome::Appended(event.into_event(id)),
      None => AppendOutcome::Duplicate,
    })
  }

  async fn query(&self, query: &EventQuery) -> Result<Vec<AttendanceEvent>> {
    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    let mut push = |column: &str, value: String| {
      params.push(value);
      conds.push(format!("{column} = ?{}", params.len()));
    };
    if let Some(roll) = &query.roll_number {
      push("roll_number", roll.as_str().to_owned());
    }
    if let Some(subject) = &query.subject {
      push("subject", subject.as_str().to_owned());
    }
    if let Some(date) = query.date {
      push("date", encode_date(date));
    }
    if let Some(teacher) = &query.recorded_by {
      push("recorded_by", teacher.clone());
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!("SELECT {} FROM events {where_clause}", RawEvent::COLUMNS);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

impl Catalog for SqliteStore {
  type Error = crate::Error;

  async fn create_course(&self, subject: &Subject) -> Result<Option<Course>> {
    let label = subject.as_str().to_owned();

    let course_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO courses (subject) VALUES (?1)",
          rusqlite::params![label],
        )?;
        Ok((changed == 1).then(|| conn.last_insert_rowid()))
      })
      .await?;

    Ok(course_id.map(|course_id| Course {
      course_id,
      subject: subject.clone(),
      teacher_email: None,
      enrolled: Vec::new(),
    }))
  }

  async fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
    Ok(self.load_courses(Some(course_id)).await?.into_iter().next())
  }

  async fn list_courses(&self) -> Result<Vec<Course>> { self.load_courses(None).await }

  async fn assign_teacher(&self, course_id: i64, teacher_email: &str) -> Result<bool> {
    let email = teacher_email.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE courses SET teacher_email = ?2 WHERE course_id = ?1",
          rusqlite::params![course_id, email],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn enroll(&self, course_id: i64, roll_number: &RollNumber) -> Result<bool> {
    let roll = roll_number.as_str().to_owned();

    let exists = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM courses WHERE course_id = ?1",
            rusqlite::params![course_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          tx.execute(
            "INSERT OR IGNORE INTO enrollments (course_id, roll_number) VALUES (?1, ?2)",
            rusqlite::params![course_id, roll],
          )?;
        }
        tx.commit()?;
        Ok(exists)
      })
      .await?;

    Ok(exists)
  }

  async fn subjects_for_teacher(&self, teacher_email: &str) -> Result<Vec<Subject>> {
    let email = teacher_email.to_owned();

    let labels: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT subject FROM courses WHERE teacher_email = ?1 ORDER BY course_id")?;
        let rows = stmt
          .query_map(rusqlite::params![email], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(labels.into_iter().map(Subject::new).collect())
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

impl Accounts for SqliteStore {
  type Error = crate::Error;

  async fn insert_account(&self, account: Account) -> Result<bool> {
    let role = account.role.as_ref().to_owned();
    let roll = account.roll_number.as_ref().map(|r| r.as_str().to_owned());

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO accounts (email, name, role, roll_number, phone, password_hash)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            account.email,
            account.name,
            role,
            roll,
            account.phone,
            account.password_hash,
          ],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(inserted)
  }

  async fn insert_student(&self, account: Account, person: Person) -> Result<bool> {
    let role       = account.role.as_ref().to_owned();
    let roll       = person.roll_number.as_str().to_owned();
    let credential = person.credential.map(|c| c.as_str().to_owned());

    let inserted = self
      .conn
      .call(move |conn| {
        // Dropping the transaction without commit rolls back the account row.
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "INSERT OR IGNORE INTO accounts (email, name, role, roll_number, phone, password_hash)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            account.email,
            account.name,
            role,
            roll,
            account.phone,
            account.password_hash,
          ],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        let changed = tx.execute(
          "INSERT OR IGNORE INTO people (roll_number, name, credential) VALUES (?1, ?2, ?3)",
          rusqlite::params![roll, person.name, credential],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn find_account(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM accounts WHERE email = ?1", RawAccount::COLUMNS),
              rusqlite::params![email],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn list_accounts(&self, role: Option<Role>) -> Result<Vec<Account>> {
    let role = role.map(|r| r.as_ref().to_owned());

    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM accounts WHERE ?1 IS NULL OR role = ?1 ORDER BY email",
          RawAccount::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![role], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAccount::into_account).collect()
  }
}
