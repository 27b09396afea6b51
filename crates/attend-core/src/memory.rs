//! [`MemoryStore`]: an in-process implementation of every collaborator
//! trait, used by tests and by servers started without a database file.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::NaiveDate;

use crate::{
  course::{Course, Subject},
  event::{AppendOutcome, AttendanceEvent, NewEvent},
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
  store::{Accounts, Catalog, EventQuery, Ledger, Roster},
};

#[derive(Default)]
struct Inner {
  people:        BTreeMap<RollNumber, Person>,
  by_credential: HashMap<ScanCredential, RollNumber>,
  events:        Vec<AttendanceEvent>,
  event_keys:    HashSet<(RollNumber, Subject, NaiveDate)>,
  courses:       BTreeMap<i64, Course>,
  accounts:      BTreeMap<String, Account>,
}

/// Keyed in-memory store. One mutex guards all state, so every trait method
/// (including the ledger's check-then-append) is atomic.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl Inner {
  fn person_conflicts(&self, person: &Person) -> bool {
    self.people.contains_key(&person.roll_number)
      || person
        .credential
        .as_ref()
        .is_some_and(|c| self.by_credential.contains_key(c))
  }

  fn put_person(&mut self, person: Person) {
    if let Some(credential) = &person.credential {
      self.by_credential.insert(credential.clone(), person.roll_number.clone());
    }
    self.people.insert(person.roll_number.clone(), person);
  }

  fn account_conflicts(&self, account: &Account) -> bool {
    self.accounts.contains_key(&account.email)
      || account.roll_number.as_ref().is_some_and(|roll| {
        self
          .accounts
          .values()
          .any(|a| a.roll_number.as_ref() == Some(roll))
      })
  }
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // State is never left half-written, so a poisoned lock is still usable.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

impl Roster for MemoryStore {
  type Error = Infallible;

  async fn resolve_credential(&self, credential: &ScanCredential) -> Result<Option<Person>, Infallible> {
    let inner = self.lock();
    Ok(
      inner
        .by_credential
        .get(credential)
        .and_then(|roll| inner.people.get(roll))
        .cloned(),
    )
  }

  async fn get_person(&self, roll_number: &RollNumber) -> Result<Option<Person>, Infallible> {
    Ok(self.lock().people.get(roll_number).cloned())
  }

  async fn list_people(&self) -> Result<Vec<Person>, Infallible> {
    Ok(self.lock().people.values().cloned().collect())
  }

  async fn insert_person(&self, person: Person) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    if inner.person_conflicts(&person) {
      return Ok(false);
    }
    inner.put_person(person);
    Ok(true)
  }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

impl Ledger for MemoryStore {
  type Error = Infallible;

  async fn exists(&self, roll_number: &RollNumber, subject: &Subject, date: NaiveDate) -> Result<bool, Infallible> {
    Ok(
      self
        .lock()
        .event_keys
        .contains(&(roll_number.clone(), subject.clone(), date)),
    )
  }

  async fn append_if_absent(&self, event: NewEvent) -> Result<AppendOutcome, Infallible> {
    let mut inner = self.lock();
    let key = (event.roll_number.clone(), event.subject.clone(), event.date);
    if !inner.event_keys.insert(key) {
      return Ok(AppendOutcome::Duplicate);
    }
    let event_id = inner.events.last().map_or(1, |e| e.event_id + 1);
    let event = event.into_event(event_id);
    inner.events.push(event.clone());
    Ok(AppendOutcome::Appended(event))
  }

  async fn query(&self, query: &EventQuery) -> Result<Vec<AttendanceEvent>, Infallible> {
    Ok(
      self
        .lock()
        .events
        .iter()
        .filter(|e| query.matches(e))
        .cloned()
        .collect(),
    )
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

impl Catalog for MemoryStore {
  type Error = Infallible;

  async fn create_course(&self, subject: &Subject) -> Result<Option<Course>, Infallible> {
    let mut inner = self.lock();
    if inner.courses.values().any(|c| c.subject == *subject) {
      return Ok(None);
    }
    let course_id = inner.courses.keys().next_back().map_or(1, |id| id + 1);
    let course = Course {
      course_id,
      subject: subject.clone(),
      teacher_email: None,
      enrolled: Vec::new(),
    };
    inner.courses.insert(course_id, course.clone());
    Ok(Some(course))
  }

  async fn get_course(&self, course_id: i64) -> Result<Option<Course>, Infallible> {
    Ok(self.lock().courses.get(&course_id).cloned())
  }

  async fn list_courses(&self) -> Result<Vec<Course>, Infallible> {
    Ok(self.lock().courses.values().cloned().collect())
  }

  async fn assign_teacher(&self, course_id: i64, teacher_email: &str) -> Result<bool, Infallible> {
    Ok(match self.lock().courses.get_mut(&course_id) {
      Some(course) => {
        course.teacher_email = Some(teacher_email.to_owned());
        true
      }
      None => false,
    })
  }

  async fn enroll(&self, course_id: i64, roll_number: &RollNumber) -> Result<bool, Infallible> {
    Ok(match self.lock().courses.get_mut(&course_id) {
      Some(course) => {
        if !course.enrolled.contains(roll_number) {
          course.enrolled.push(roll_number.clone());
        }
        true
      }
      None => false,
    })
  }

  async fn subjects_for_teacher(&self, teacher_email: &str) -> Result<Vec<Subject>, Infallible> {
    Ok(
      self
        .lock()
        .courses
        .values()
        .filter(|c| c.teacher_email.as_deref() == Some(teacher_email))
        .map(|c| c.subject.clone())
        .collect(),
    )
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

impl Accounts for MemoryStore {
  type Error = Infallible;

  async fn insert_account(&self, account: Account) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    if inner.account_conflicts(&account) {
      return Ok(false);
    }
    inner.accounts.insert(account.email.clone(), account);
    Ok(true)
  }

  async fn insert_student(&self, account: Account, person: Person) -> Result<bool, Infallible> {
    let mut inner = self.lock();
    if inner.account_conflicts(&account) || inner.person_conflicts(&person) {
      return Ok(false);
    }
    inner.accounts.insert(account.email.clone(), account);
    inner.put_person(person);
    Ok(true)
  }

  async fn find_account(&self, email: &str) -> Result<Option<Account>, Infallible> {
    Ok(self.lock().accounts.get(email).cloned())
  }

  async fn list_accounts(&self, role: Option<Role>) -> Result<Vec<Account>, Infallible> {
    Ok(
      self
        .lock()
        .accounts
        .values()
        .filter(|a| role.is_none_or(|r| a.role == r))
        .cloned()
        .collect(),
    )
  }
}
