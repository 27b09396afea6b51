//! [`Attendance`], the decision core.
//!
//! Decides whether a scan may be recorded and with what status, derives
//! absentee views by set difference against the ledger, and projects the
//! ledger into per-student and per-teacher histories.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  course::Subject,
  event::{AbsenceRecord, AbsentStatus, AppendOutcome, AttendanceEvent, NewEvent, sort_newest_first},
  identity::{AuthorizationContext, Role},
  person::{Person, RollNumber, ScanCredential},
  policy::AttendancePolicy,
  store::{EventQuery, Store},
};

// ─── Request / response types ────────────────────────────────────────────────

/// A scan reported by a teacher's scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
  pub credential: ScanCredential,
  /// Which of the teacher's subjects to record against. May be omitted when
  /// the teacher has exactly one.
  #[serde(default)]
  pub subject:    Option<Subject>,
}

/// A scan that passed the eligibility gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligible {
  pub person:  Person,
  pub subject: Subject,
}

/// The outcome of a recorded scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReceipt {
  pub event:   AttendanceEvent,
  /// e.g. `"Swan Pyae Aung marked present for IOT"`.
  pub message: String,
}

/// Records selected for export, with their count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
  pub date:    Option<NaiveDate>,
  pub count:   usize,
  pub records: Vec<AttendanceEvent>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The attendance decision core over any [`Store`].
///
/// Cloning is cheap; the store is reference-counted.
pub struct Attendance<S> {
  pub(crate) store:  Arc<S>,
  pub(crate) policy: AttendancePolicy,
}

impl<S> Clone for Attendance<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store), policy: self.policy } }
}

impl<S: Store> Attendance<S> {
  pub fn new(store: Arc<S>, policy: AttendancePolicy) -> Self { Self { store, policy } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn policy(&self) -> &AttendancePolicy { &self.policy }

  // ── Eligibility gate ─────────────────────────────────────────────────────

  /// Check, in order: teacher role, an active subject, a known credential,
  /// and no existing event for the person, subject and `date`.
  ///
  /// The final check is advisory: [`Self::record_scan`] repeats it
  /// atomically through [`crate::store::Ledger::append_if_absent`].
  pub async fn can_record(
    &self,
    ctx: &AuthorizationContext,
    request: &ScanRequest,
    date: NaiveDate,
  ) -> Result<Eligible> {
    if !ctx.is(Role::Teacher) {
      return Err(Error::NotAuthorized);
    }

    let subject = active_subject(ctx, request.subject.as_ref())?;

    let person = self
      .store
      .resolve_credential(&request.credential)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UnknownCredential)?;

    let recorded = self
      .store
      .exists(&person.roll_number, &subject, date)
      .await
      .map_err(Error::store)?;
    if recorded {
      return Err(Error::AlreadyRecorded { name: person.name, subject });
    }

    Ok(Eligible { person, subject })
  }

  /// Run the gate for a scan made at `now`, classify it, and append exactly
  /// one event.
  pub async fn record_scan(
    &self,
    ctx: &AuthorizationContext,
    request: &ScanRequest,
    now: DateTime<Utc>,
  ) -> Result<ScanReceipt> {
    let date = self.policy.reporting_date(now);
    let Eligible { person, subject } = match self.can_record(ctx, request, date).await {
      Ok(eligible) => eligible,
      Err(err) => {
        tracing::warn!(teacher = %ctx.email, credential = %request.credential, %err, "scan refused");
        return Err(err);
      }
    };

    let status = self.policy.classify_at(now);
    let new_event = NewEvent {
      roll_number: person.roll_number.clone(),
      student_name: person.name.clone(),
      subject: subject.clone(),
      recorded_by: ctx.email.clone(),
      recorded_at: now,
      date,
      status,
    };

    match self.store.append_if_absent(new_event).await.map_err(Error::store)? {
      AppendOutcome::Appended(event) => {
        tracing::info!(
          roll_number = %event.roll_number,
          subject = %event.subject,
          status = %event.status,
          "attendance recorded"
        );
        let message = format!("{} marked {} for {}", person.name, status.describe(), subject);
        Ok(ScanReceipt { event, message })
      }
      // Lost a race with a concurrent scan for the same key.
      AppendOutcome::Duplicate => {
        tracing::warn!(roll_number = %person.roll_number, %subject, "concurrent duplicate scan");
        Err(Error::AlreadyRecorded { name: person.name, subject })
      }
    }
  }

  /// The scan-station roster: every person with their credential.
  pub async fn roster_for(&self, ctx: &AuthorizationContext) -> Result<Vec<Person>> {
    if !ctx.is(Role::Teacher) {
      return Err(Error::NotAuthorized);
    }
    self.store.list_people().await.map_err(Error::store)
  }

  // ── Absentees ────────────────────────────────────────────────────────────

  /// Expected `(person, subject)` pairs with no event on `date`.
  ///
  /// Teachers see every person against their own subjects; students see
  /// themselves against every subject in the catalog. A `date` after the
  /// current reporting date yields nothing.
  pub async fn absentees_for(
    &self,
    ctx: &AuthorizationContext,
    date: NaiveDate,
    now: DateTime<Utc>,
  ) -> Result<Vec<AbsenceRecord>> {
    if ctx.is(Role::Admin) || (ctx.is(Role::Student) && ctx.roll_number.is_none()) {
      return Err(Error::NotAuthorized);
    }
    if date > self.policy.reporting_date(now) {
      return Ok(Vec::new());
    }

    let (people, subjects, query) = match &ctx.roll_number {
      Some(roll_number) if ctx.is(Role::Student) => {
        let person = self
          .store
          .get_person(roll_number)
          .await
          .map_err(Error::store)?
          .unwrap_or_else(|| Person {
            name:        ctx.name.clone(),
            roll_number: roll_number.clone(),
            credential:  None,
          });
        let subjects: Vec<Subject> = self
          .store
          .list_courses()
          .await
          .map_err(Error::store)?
          .into_iter()
          .map(|c| c.subject)
          .collect();
        let query = EventQuery {
          roll_number: Some(roll_number.clone()),
          date: Some(date),
          ..Default::default()
        };
        (vec![person], subjects, query)
      }
      _ => {
        let people = self.store.list_people().await.map_err(Error::store)?;
        (people, ctx.subjects.clone(), EventQuery { date: Some(date), ..Default::default() })
      }
    };

    let recorded: HashSet<_> = self
      .store
      .query(&query)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|e| (e.roll_number, e.subject))
      .collect();

    Ok(absentees(&people, &subjects, &recorded, date))
  }

  // ── History ──────────────────────────────────────────────────────────────

  /// The caller's own attendance, most recent first. Callers without a roll
  /// number have no history.
  pub async fn history_for(&self, ctx: &AuthorizationContext) -> Result<Vec<AttendanceEvent>> {
    let Some(roll_number) = ctx.roll_number.clone() else {
      return Ok(Vec::new());
    };
    self
      .query_sorted(EventQuery { roll_number: Some(roll_number), ..Default::default() })
      .await
  }

  /// Events recorded by the calling teacher, optionally on one date, most
  /// recent first.
  pub async fn ledger_for(
    &self,
    ctx: &AuthorizationContext,
    date: Option<NaiveDate>,
  ) -> Result<Vec<AttendanceEvent>> {
    if !ctx.is(Role::Teacher) {
      return Err(Error::NotAuthorized);
    }
    self
      .query_sorted(EventQuery { recorded_by: Some(ctx.email.clone()), date, ..Default::default() })
      .await
  }

  /// The teacher's ledger prepared for export.
  pub async fn export_for(
    &self,
    ctx: &AuthorizationContext,
    date: Option<NaiveDate>,
  ) -> Result<ExportSummary> {
    let records = self.ledger_for(ctx, date).await?;
    tracing::info!(teacher = %ctx.email, count = records.len(), "attendance exported");
    Ok(ExportSummary { date, count: records.len(), records })
  }

  async fn query_sorted(&self, query: EventQuery) -> Result<Vec<AttendanceEvent>> {
    let mut events = self.store.query(&query).await.map_err(Error::store)?;
    sort_newest_first(&mut events);
    Ok(events)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Pick the subject a teacher is recording against.
fn active_subject(ctx: &AuthorizationContext, requested: Option<&Subject>) -> Result<Subject> {
  match (requested, ctx.subjects.as_slice()) {
    (_, []) => Err(Error::NoSubjectAssigned),
    (Some(subject), assigned) if assigned.contains(subject) => Ok(subject.clone()),
    (Some(subject), _) => Err(Error::SubjectNotAssigned(subject.clone())),
    (None, [only]) => Ok(only.clone()),
    (None, several) => Err(Error::AmbiguousSubject(several.to_vec())),
  }
}

/// The cartesian product of `people` and `subjects`, minus `recorded` pairs.
fn absentees(
  people: &[Person],
  subjects: &[Subject],
  recorded: &HashSet<(RollNumber, Subject)>,
  date: NaiveDate,
) -> Vec<AbsenceRecord> {
  people
    .iter()
    .flat_map(|person| {
      subjects
        .iter()
        .filter(|subject| !recorded.contains(&(person.roll_number.clone(), (*subject).clone())))
        .map(move |subject| AbsenceRecord {
          student_name: person.name.clone(),
          roll_number:  person.roll_number.clone(),
          subject:      subject.clone(),
          date,
          status:       AbsentStatus::Absent,
        })
    })
    .collect()
}
