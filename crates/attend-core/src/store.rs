//! Collaborator traits and supporting query types.
//!
//! The traits are implemented by storage backends ([`crate::memory`] and
//! `attend-store-sqlite`). The decision core and the HTTP layer depend on
//! these abstractions, never on a concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  course::{Course, Subject},
  event::{AppendOutcome, AttendanceEvent, NewEvent},
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Ledger::query`]. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
  pub roll_number: Option<RollNumber>,
  pub subject:     Option<Subject>,
  pub date:        Option<NaiveDate>,
  /// Email of the recording teacher.
  pub recorded_by: Option<String>,
}

impl EventQuery {
  pub fn matches(&self, event: &AttendanceEvent) -> bool {
    self.roll_number.as_ref().is_none_or(|r| *r == event.roll_number)
      && self.subject.as_ref().is_none_or(|s| *s == event.subject)
      && self.date.is_none_or(|d| d == event.date)
      && self.recorded_by.as_deref().is_none_or(|t| t == event.recorded_by)
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

/// Maps scan credentials and roll numbers to people.
pub trait Roster: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve_credential<'a>(
    &'a self,
    credential: &'a ScanCredential,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn get_person<'a>(
    &'a self,
    roll_number: &'a RollNumber,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  /// All people, ordered by roll number.
  fn list_people(&self) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Insert a person. Returns `false` without writing if the roll number or
  /// credential is already taken.
  fn insert_person(&self, person: Person) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The append-only attendance ledger.
pub trait Ledger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn exists<'a>(
    &'a self,
    roll_number: &'a RollNumber,
    subject: &'a Subject,
    date: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Append `event` unless one already exists for its
  /// `(roll_number, subject, date)`. The check and the write are a single
  /// atomic step: of any number of concurrent calls for one key, exactly one
  /// returns [`AppendOutcome::Appended`].
  fn append_if_absent(
    &self,
    event: NewEvent,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  /// All events matching `query`, in no particular order.
  fn query<'a>(
    &'a self,
    query: &'a EventQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + 'a;
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Courses, their teachers, and enrolments.
pub trait Catalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create a course for `subject`. Returns `None` if one already exists.
  fn create_course<'a>(
    &'a self,
    subject: &'a Subject,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + 'a;

  fn get_course(&self, course_id: i64) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// All courses, ordered by id.
  fn list_courses(&self) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  /// Make `teacher_email` the sole teacher of the course, replacing any
  /// previous one. Returns `false` if the course does not exist.
  fn assign_teacher<'a>(
    &'a self,
    course_id: i64,
    teacher_email: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Enrol a student; enrolling twice is a no-op. Returns `false` if the
  /// course does not exist.
  fn enroll<'a>(
    &'a self,
    course_id: i64,
    roll_number: &'a RollNumber,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Subjects taught by `teacher_email`, in course order.
  fn subjects_for_teacher<'a>(
    &'a self,
    teacher_email: &'a str,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + 'a;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Login identities, consulted by the identity provider.
pub trait Accounts: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert an account. Returns `false` without writing if the email, or a
  /// student's roll number, is already taken.
  fn insert_account(&self, account: Account) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert a student's account and roster entry as one step. Returns
  /// `false` and writes neither if any email, roll number or credential is
  /// already taken.
  fn insert_student(
    &self,
    account: Account,
    person: Person,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_account<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Accounts ordered by email, optionally restricted to one role.
  fn list_accounts(
    &self,
    role: Option<Role>,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// Everything the service layer needs from a backend.
pub trait Store: Roster + Ledger + Catalog + Accounts + 'static {}

impl<T> Store for T where T: Roster + Ledger + Catalog + Accounts + 'static {}
