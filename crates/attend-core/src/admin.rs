//! Admin operations and account registration.
//!
//! Passwords arrive here already hashed; hashing belongs to the identity
//! provider.

use serde::{Deserialize, Serialize};

use crate::{
  Attendance, Error, Result,
  course::{Course, Subject},
  identity::{Account, AuthorizationContext, Role},
  person::{Person, RollNumber, ScanCredential},
  store::Store,
};

/// A new student account plus its roster entry.
#[derive(Debug, Clone)]
pub struct StudentRegistration {
  pub name:          String,
  pub email:         String,
  pub roll_number:   RollNumber,
  pub phone:         Option<String>,
  pub credential:    Option<ScanCredential>,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct TeacherRegistration {
  pub name:          String,
  pub email:         String,
  pub phone:         Option<String>,
  pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherSummary {
  pub name:  String,
  pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSummary {
  pub name:        String,
  pub roll_number: RollNumber,
  pub email:       String,
}

/// Everything the admin panel shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverview {
  pub courses:  Vec<Course>,
  pub teachers: Vec<TeacherSummary>,
  pub students: Vec<StudentSummary>,
}

/// Lower-case and trim an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn require_admin(ctx: &AuthorizationContext) -> Result<()> {
  if ctx.is(Role::Admin) { Ok(()) } else { Err(Error::NotAuthorized) }
}

impl<S: Store> Attendance<S> {
  pub async fn overview(&self, ctx: &AuthorizationContext) -> Result<AdminOverview> {
    require_admin(ctx)?;
    let courses = self.store.list_courses().await.map_err(Error::store)?;
    let teachers = self
      .store
      .list_accounts(Some(Role::Teacher))
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|a| TeacherSummary { name: a.name, email: a.email })
      .collect();
    let students = self
      .store
      .list_accounts(Some(Role::Student))
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter_map(|a| {
        let roll_number = a.roll_number?;
        Some(StudentSummary { name: a.name, roll_number, email: a.email })
      })
      .collect();
    Ok(AdminOverview { courses, teachers, students })
  }

  pub async fn create_course(&self, ctx: &AuthorizationContext, subject: Subject) -> Result<Course> {
    require_admin(ctx)?;
    if subject.as_str().trim().is_empty() {
      return Err(Error::EmptySubject);
    }
    let course = self
      .store
      .create_course(&subject)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::AlreadyExists(format!("Course {subject}")))?;
    tracing::info!(course_id = course.course_id, %subject, "course created");
    Ok(course)
  }

  /// Make `teacher_email` the course's only teacher. The account must exist
  /// and be a teacher.
  pub async fn assign_teacher(
    &self,
    ctx: &AuthorizationContext,
    course_id: i64,
    teacher_email: &str,
  ) -> Result<Course> {
    require_admin(ctx)?;
    let email = normalize_email(teacher_email);
    let is_teacher = self
      .store
      .find_account(&email)
      .await
      .map_err(Error::store)?
      .is_some_and(|a| a.role == Role::Teacher);
    if !is_teacher {
      return Err(Error::CourseOrPersonNotFound);
    }
    if !self.store.assign_teacher(course_id, &email).await.map_err(Error::store)? {
      return Err(Error::CourseOrPersonNotFound);
    }
    tracing::info!(course_id, teacher = %email, "teacher assigned");
    self.course(course_id).await
  }

  pub async fn enroll_student(
    &self,
    ctx: &AuthorizationContext,
    course_id: i64,
    roll_number: &RollNumber,
  ) -> Result<Course> {
    require_admin(ctx)?;
    if self.store.get_person(roll_number).await.map_err(Error::store)?.is_none() {
      return Err(Error::CourseOrPersonNotFound);
    }
    if !self.store.enroll(course_id, roll_number).await.map_err(Error::store)? {
      return Err(Error::CourseOrPersonNotFound);
    }
    tracing::info!(course_id, %roll_number, "student enrolled");
    self.course(course_id).await
  }

  pub async fn register_student(
    &self,
    ctx: &AuthorizationContext,
    registration: StudentRegistration,
  ) -> Result<Account> {
    require_admin(ctx)?;
    self.register(registration).await
  }

  pub async fn register_teacher(
    &self,
    ctx: &AuthorizationContext,
    registration: TeacherRegistration,
  ) -> Result<Account> {
    require_admin(ctx)?;
    let account = Account {
      email:         normalize_email(&registration.email),
      name:          registration.name,
      role:          Role::Teacher,
      roll_number:   None,
      phone:         registration.phone,
      password_hash: registration.password_hash,
    };
    if !self.store.insert_account(account.clone()).await.map_err(Error::store)? {
      return Err(Error::AlreadyExists("Teacher with this email".into()));
    }
    tracing::info!(email = %account.email, "teacher registered");
    Ok(account)
  }

  /// Create a student account and its roster entry. Used both for
  /// self-registration and by admins.
  pub async fn register(&self, registration: StudentRegistration) -> Result<Account> {
    let duplicate = || Error::AlreadyExists("User with this email or roll number".into());
    let email = normalize_email(&registration.email);

    if self.store.find_account(&email).await.map_err(Error::store)?.is_some()
      || self
        .store
        .get_person(&registration.roll_number)
        .await
        .map_err(Error::store)?
        .is_some()
    {
      return Err(duplicate());
    }
    if let Some(credential) = &registration.credential
      && self.store.resolve_credential(credential).await.map_err(Error::store)?.is_some()
    {
      return Err(Error::AlreadyExists(format!("Scan credential {credential}")));
    }

    let account = Account {
      email,
      name: registration.name.clone(),
      role: Role::Student,
      roll_number: Some(registration.roll_number.clone()),
      phone: registration.phone,
      password_hash: registration.password_hash,
    };
    let person = Person {
      name:        registration.name,
      roll_number: registration.roll_number,
      credential:  registration.credential,
    };
    // A lost race leaves nothing behind: both rows are written or neither.
    if !self.store.insert_student(account.clone(), person).await.map_err(Error::store)? {
      return Err(duplicate());
    }
    tracing::info!(email = %account.email, "student registered");
    Ok(account)
  }

  async fn course(&self, course_id: i64) -> Result<Course> {
    self
      .store
      .get_course(course_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CourseOrPersonNotFound)
  }
}
