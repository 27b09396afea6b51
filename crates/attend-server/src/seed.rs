//! Demo data: four teachers with one subject each, four students with scan
//! credentials, an admin, and two historical records.
//!
//! Seeding is idempotent; anything that already exists is left alone.

use anyhow::Context as _;
use attend_api::identity::hash_password;
use attend_core::{
  course::Subject,
  event::{NewEvent, Status},
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
  store::Store,
};
use chrono::{TimeZone as _, Utc};

const TEACHERS: [(&str, &str, &str); 4] = [
  ("Teacher Alice", "alice.teacher@example.com", "CRP"),
  ("Teacher Bob", "bob.teacher@example.com", "IOT"),
  ("Teacher Carol", "carol.teacher@example.com", "BPS"),
  ("Teacher David", "david.teacher@example.com", "WDD"),
];

/// `(name, email, roll number, phone, credential)`
const STUDENTS: [(&str, &str, &str, &str, &str); 4] = [
  ("Shinn Khant Aung", "shinn.khant@example.com", "20260000001", "09111111111", "FP-0001"),
  ("Swan Pyae Aung", "swan.pyae@example.com", "20260000002", "09222222222", "FP-0002"),
  ("Thet Myat Noe", "thet.myat@example.com", "20260000003", "09333333333", "FP-0003"),
  ("Myat Thu Kha", "myat.thu@example.com", "20260000004", "09444444444", "FP-0004"),
];

/// `(student index, teacher index, hour, minute, status)` on 2025-03-11 UTC.
const HISTORY: [(usize, usize, u32, u32, Status); 2] =
  [(0, 0, 8, 0, Status::Present), (2, 2, 8, 20, Status::Late)];

pub async fn seed_demo<S: Store>(store: &S) -> anyhow::Result<()> {
  let teacher_hash = hash_password("teacher123").map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let student_hash = hash_password("student123").map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let admin_hash = hash_password("admin123").map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;

  store
    .insert_account(Account {
      email:         "admin@example.com".into(),
      name:          "Administrator".into(),
      role:          Role::Admin,
      roll_number:   None,
      phone:         None,
      password_hash: admin_hash,
    })
    .await
    .context("seeding admin")?;

  for (name, email, subject) in TEACHERS {
    store
      .insert_account(Account {
        email:         email.into(),
        name:          name.into(),
        role:          Role::Teacher,
        roll_number:   None,
        phone:         None,
        password_hash: teacher_hash.clone(),
      })
      .await
      .with_context(|| format!("seeding teacher {email}"))?;

    let subject = Subject::new(subject);
    let created = store.create_course(&subject).await.context("seeding course")?;
    let course_id = match created {
      Some(course) => Some(course.course_id),
      None => store
        .list_courses()
        .await
        .context("listing courses")?
        .into_iter()
        .find(|c| c.subject == subject)
        .map(|c| c.course_id),
    };
    if let Some(course_id) = course_id {
      store.assign_teacher(course_id, email).await.context("assigning teacher")?;
    }
  }

  for (name, email, roll, phone, credential) in STUDENTS {
    let roll_number = RollNumber::parse(roll)?;
    store
      .insert_account(Account {
        email:         email.into(),
        name:          name.into(),
        role:          Role::Student,
        roll_number:   Some(roll_number.clone()),
        phone:         Some(phone.into()),
        password_hash: student_hash.clone(),
      })
      .await
      .with_context(|| format!("seeding student {email}"))?;
    store
      .insert_person(Person {
        name:        name.into(),
        roll_number: roll_number.clone(),
        credential:  Some(ScanCredential::new(credential)),
      })
      .await
      .with_context(|| format!("seeding roster entry {roll}"))?;
    for course in store.list_courses().await.context("listing courses")? {
      store.enroll(course.course_id, &roll_number).await.context("enrolling student")?;
    }
  }

  for (student, teacher, hour, minute, status) in HISTORY {
    let (name, _, roll, _, _) = STUDENTS[student];
    let (_, email, subject) = TEACHERS[teacher];
    let recorded_at = Utc
      .with_ymd_and_hms(2025, 3, 11, hour, minute, 0)
      .single()
      .context("invalid seed timestamp")?;
    store
      .append_if_absent(NewEvent {
        roll_number: RollNumber::parse(roll)?,
        student_name: name.into(),
        subject: Subject::new(subject),
        recorded_by: email.into(),
        recorded_at,
        date: recorded_at.date_naive(),
        status,
      })
      .await
      .context("seeding attendance record")?;
  }

  tracing::info!("demo data seeded");
  Ok(())
}
