//! Integration tests for `SqliteStore` against an in-memory database.

use std::{path::PathBuf, sync::Arc};

use attend_core::{
  Attendance, Error as CoreError,
  course::Subject,
  event::{AppendOutcome, NewEvent, Status},
  identity::{Account, AuthorizationContext, Role},
  person::{Person, RollNumber, ScanCredential},
  policy::AttendancePolicy,
  service::ScanRequest,
  store::{Accounts, Catalog, EventQuery, Ledger, Roster},
};
use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn roll(s: &str) -> RollNumber { RollNumber::parse(s).unwrap() }

fn person(roll_number: &str, name: &str, credential: Option<&str>) -> Person {
  Person {
    name:        name.into(),
    roll_number: roll(roll_number),
    credential:  credential.map(ScanCredential::new),
  }
}

fn teacher(email: &str) -> Account {
  Account {
    email:         email.into(),
    name:          email.into(),
    role:          Role::Teacher,
    roll_number:   None,
    phone:         None,
    password_hash: "$argon2id$stub".into(),
  }
}

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, day, h, m, 0).unwrap()
}

fn scan(roll_number: &str, subject: &str, when: DateTime<Utc>) -> NewEvent {
  NewEvent {
    roll_number:  roll(roll_number),
    student_name: "Swan Pyae Aung".into(),
    subject:      Subject::new(subject),
    recorded_by:  "bob.teacher@example.com".into(),
    recorded_at:  when,
    date:         when.date_naive(),
    status:       Status::Late,
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_resolve_person() {
  let s = store().await;
  assert!(s.insert_person(person("20260000002", "Swan Pyae Aung", Some("FP-0002"))).await.unwrap());

  let found = s.resolve_credential(&ScanCredential::new("FP-0002")).await.unwrap();
  assert_eq!(found.unwrap().roll_number, roll("20260000002"));

  let by_roll = s.get_person(&roll("20260000002")).await.unwrap().unwrap();
  assert_eq!(by_roll.name, "Swan Pyae Aung");
}

#[tokio::test]
async fn unknown_credential_resolves_to_none() {
  let s = store().await;
  let found = s.resolve_credential(&ScanCredential::new("FP-9999")).await.unwrap();
  assert!(found.is_none());
}

#[tokio::test]
async fn duplicate_roll_or_credential_is_refused() {
  let s = store().await;
  assert!(s.insert_person(person("20260000001", "Shinn Khant Aung", Some("FP-0001"))).await.unwrap());
  assert!(!s.insert_person(person("20260000001", "Someone Else", None)).await.unwrap());
  assert!(!s.insert_person(person("20260000009", "Someone Else", Some("FP-0001"))).await.unwrap());
  assert_eq!(s.list_people().await.unwrap().len(), 1);
}

#[tokio::test]
async fn people_are_listed_by_roll_number() {
  let s = store().await;
  s.insert_person(person("20260000003", "Hein Htet Zaw", None)).await.unwrap();
  s.insert_person(person("20260000001", "Shinn Khant Aung", None)).await.unwrap();
  s.insert_person(person("20260000002", "Swan Pyae Aung", None)).await.unwrap();

  let rolls: Vec<_> = s
    .list_people()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.roll_number.as_str().to_owned())
    .collect();
  assert_eq!(rolls, ["20260000001", "20260000002", "20260000003"]);
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_then_duplicate() {
  let s = store().await;
  let first = s.append_if_absent(scan("20260000002", "IOT", at(2, 8, 15))).await.unwrap();
  let AppendOutcome::Appended(event) = first else {
    panic!("expected the first append to succeed");
  };
  assert_eq!(event.status, Status::Late);
  assert!(event.event_id > 0);

  let second = s.append_if_absent(scan("20260000002", "IOT", at(2, 13, 0))).await.unwrap();
  assert!(matches!(second, AppendOutcome::Duplicate));

  assert!(s.exists(&roll("20260000002"), &Subject::new("IOT"), at(2, 0, 0).date_naive()).await.unwrap());
}

#[tokio::test]
async fn same_student_other_subject_or_day_is_not_a_duplicate() {
  let s = store().await;
  s.append_if_absent(scan("20260000002", "IOT", at(2, 8, 15))).await.unwrap();

  let other_subject = s.append_if_absent(scan("20260000002", "CRP", at(2, 8, 15))).await.unwrap();
  assert!(matches!(other_subject, AppendOutcome::Appended(_)));

  let other_day = s.append_if_absent(scan("20260000002", "IOT", at(3, 8, 15))).await.unwrap();
  assert!(matches!(other_day, AppendOutcome::Appended(_)));
}

#[tokio::test]
async fn concurrent_appends_admit_exactly_one() {
  let s = store().await;

  let handles: Vec<_> = (0..16)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move {
        s.append_if_absent(scan("20260000002", "IOT", at(2, 8, i))).await.unwrap()
      })
    })
    .collect();

  let mut appended = 0;
  for handle in handles {
    if matches!(handle.await.unwrap(), AppendOutcome::Appended(_)) {
      appended += 1;
    }
  }
  assert_eq!(appended, 1);

  let all = s.query(&EventQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_through_the_service_record_once() {
  const ATTEMPTS: usize = 16;
  let s = store().await;
  s.insert_person(person("20260000002", "Swan Pyae Aung", Some("FP-0002"))).await.unwrap();
  let svc = Attendance::new(Arc::new(s), AttendancePolicy::default());
  let bob = AuthorizationContext::teacher("bob.teacher@example.com", vec![Subject::new("IOT")]);
  let request = ScanRequest { credential: ScanCredential::new("FP-0002"), subject: None };

  let handles: Vec<_> = (0..ATTEMPTS)
    .map(|_| {
      let (svc, bob, request) = (svc.clone(), bob.clone(), request.clone());
      tokio::spawn(async move { svc.record_scan(&bob, &request, at(2, 8, 5)).await })
    })
    .collect();

  let mut recorded = 0;
  let mut duplicates = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => recorded += 1,
      Err(CoreError::AlreadyRecorded { .. }) => duplicates += 1,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }
  assert_eq!(recorded, 1);
  assert_eq!(duplicates, ATTEMPTS - 1);
  assert_eq!(svc.store().query(&EventQuery::default()).await.unwrap().len(), 1);
}

/// A database file unique to this test run, removed on drop.
struct TempDb(PathBuf);

impl TempDb {
  fn new(name: &str) -> Self {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    Self(std::env::temp_dir().join(format!("attend-{name}-{}-{nanos}.db", std::process::id())))
  }
}

impl Drop for TempDb {
  fn drop(&mut self) {
    for suffix in ["", "-wal", "-shm"] {
      let mut path = self.0.clone().into_os_string();
      path.push(suffix);
      let _ = std::fs::remove_file(path);
    }
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_connections_share_the_ledger_key() {
  let db = TempDb::new("ledger");
  let first = SqliteStore::open(&db.0).await.unwrap();
  let second = SqliteStore::open(&db.0).await.unwrap();

  let handles: Vec<_> = (0..16)
    .map(|i| {
      let s = if i % 2 == 0 { first.clone() } else { second.clone() };
      tokio::spawn(async move { s.append_if_absent(scan("20260000002", "IOT", at(2, 8, i))).await })
    })
    .collect();

  let mut appended = 0;
  let mut duplicates = 0;
  for handle in handles {
    match handle.await.unwrap().unwrap() {
      AppendOutcome::Appended(_) => appended += 1,
      AppendOutcome::Duplicate => duplicates += 1,
    }
  }
  assert_eq!(appended, 1);
  assert_eq!(duplicates, 15);
  assert_eq!(second.query(&EventQuery::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn query_filters_combine() {
  let s = store().await;
  s.append_if_absent(scan("20260000001", "IOT", at(2, 8, 5))).await.unwrap();
  s.append_if_absent(scan("20260000002", "IOT", at(2, 8, 15))).await.unwrap();
  s.append_if_absent(scan("20260000002", "IOT", at(3, 8, 40))).await.unwrap();

  let day_two = EventQuery {
    subject: Some(Subject::new("IOT")),
    date: Some(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
    ..Default::default()
  };
  assert_eq!(s.query(&day_two).await.unwrap().len(), 2);

  let one_student = EventQuery { roll_number: Some(roll("20260000002")), ..Default::default() };
  assert_eq!(s.query(&one_student).await.unwrap().len(), 2);

  let someone_else = EventQuery {
    recorded_by: Some("carol.teacher@example.com".into()),
    ..Default::default()
  };
  assert!(s.query(&someone_else).await.unwrap().is_empty());
}

#[tokio::test]
async fn timestamps_round_trip_through_storage() {
  let s = store().await;
  let when = at(2, 8, 15) + chrono::Duration::microseconds(123_456);
  s.append_if_absent(scan("20260000002", "IOT", when)).await.unwrap();

  let stored = s.query(&EventQuery::default()).await.unwrap().remove(0);
  assert_eq!(stored.recorded_at, when);
  assert_eq!(stored.date, when.date_naive());
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn course_lifecycle() {
  let s = store().await;
  let iot = s.create_course(&Subject::new("IOT")).await.unwrap().unwrap();
  assert!(s.create_course(&Subject::new("IOT")).await.unwrap().is_none());

  s.insert_account(teacher("bob.teacher@example.com")).await.unwrap();
  assert!(s.assign_teacher(iot.course_id, "bob.teacher@example.com").await.unwrap());
  assert!(!s.assign_teacher(iot.course_id + 100, "bob.teacher@example.com").await.unwrap());

  s.insert_person(person("20260000002", "Swan Pyae Aung", None)).await.unwrap();
  assert!(s.enroll(iot.course_id, &roll("20260000002")).await.unwrap());
  assert!(s.enroll(iot.course_id, &roll("20260000002")).await.unwrap());
  assert!(!s.enroll(iot.course_id + 100, &roll("20260000002")).await.unwrap());

  let course = s.get_course(iot.course_id).await.unwrap().unwrap();
  assert_eq!(course.teacher_email.as_deref(), Some("bob.teacher@example.com"));
  assert_eq!(course.enrolled, vec![roll("20260000002")]);

  let subjects = s.subjects_for_teacher("bob.teacher@example.com").await.unwrap();
  assert_eq!(subjects, vec![Subject::new("IOT")]);
}

#[tokio::test]
async fn reassigning_replaces_the_teacher() {
  let s = store().await;
  let crp = s.create_course(&Subject::new("CRP")).await.unwrap().unwrap();
  s.insert_account(teacher("alice.teacher@example.com")).await.unwrap();
  s.insert_account(teacher("david.teacher@example.com")).await.unwrap();

  s.assign_teacher(crp.course_id, "alice.teacher@example.com").await.unwrap();
  s.assign_teacher(crp.course_id, "david.teacher@example.com").await.unwrap();

  assert!(s.subjects_for_teacher("alice.teacher@example.com").await.unwrap().is_empty());
  assert_eq!(s.subjects_for_teacher("david.teacher@example.com").await.unwrap().len(), 1);
}

#[tokio::test]
async fn courses_are_listed_in_id_order() {
  let s = store().await;
  for label in ["CRP", "IOT", "BPS", "WDD"] {
    s.create_course(&Subject::new(label)).await.unwrap();
  }
  let labels: Vec<_> = s
    .list_courses()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.subject.as_str().to_owned())
    .collect();
  assert_eq!(labels, ["CRP", "IOT", "BPS", "WDD"]);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accounts_round_trip_and_filter_by_role() {
  let s = store().await;
  assert!(s.insert_account(teacher("bob.teacher@example.com")).await.unwrap());
  assert!(!s.insert_account(teacher("bob.teacher@example.com")).await.unwrap());

  let student = Account {
    email:         "swan.pyae@example.com".into(),
    name:          "Swan Pyae Aung".into(),
    role:          Role::Student,
    roll_number:   Some(roll("20260000002")),
    phone:         Some("09222222222".into()),
    password_hash: "$argon2id$stub".into(),
  };
  assert!(s.insert_account(student.clone()).await.unwrap());

  let found = s.find_account("swan.pyae@example.com").await.unwrap().unwrap();
  assert_eq!(found, student);

  let teachers = s.list_accounts(Some(Role::Teacher)).await.unwrap();
  assert_eq!(teachers.len(), 1);
  assert_eq!(s.list_accounts(None).await.unwrap().len(), 2);
  assert!(s.find_account("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn student_insert_writes_both_or_neither() {
  let s = store().await;
  s.insert_person(person("20260000001", "Shinn Khant Aung", Some("FP-0001"))).await.unwrap();

  let account = Account {
    email:         "myat.thu@example.com".into(),
    name:          "Myat Thu Kha".into(),
    role:          Role::Student,
    roll_number:   Some(roll("20260000004")),
    phone:         None,
    password_hash: "$argon2id$stub".into(),
  };

  // The credential belongs to someone else: the account row is rolled back.
  let clash = person("20260000004", "Myat Thu Kha", Some("FP-0001"));
  assert!(!s.insert_student(account.clone(), clash).await.unwrap());
  assert!(s.find_account("myat.thu@example.com").await.unwrap().is_none());
  assert!(s.get_person(&roll("20260000004")).await.unwrap().is_none());

  let fresh = person("20260000004", "Myat Thu Kha", Some("FP-0004"));
  assert!(s.insert_student(account.clone(), fresh).await.unwrap());
  assert_eq!(s.find_account("myat.thu@example.com").await.unwrap(), Some(account));
  let found = s.resolve_credential(&ScanCredential::new("FP-0004")).await.unwrap().unwrap();
  assert_eq!(found.name, "Myat Thu Kha");
}
