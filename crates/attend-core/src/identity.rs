//! Roles, accounts, and the per-request authorization context.
//!
//! Authentication itself (passwords, sessions) belongs to the identity
//! provider in `attend-api`. The decision core only ever sees the resolved
//! [`AuthorizationContext`].

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{course::Subject, person::RollNumber};

/// The closed set of portal roles.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
  Admin,
}

/// A login identity held by the [`crate::store::Accounts`] collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub email:         String,
  pub name:          String,
  pub role:          Role,
  /// Present for students only.
  pub roll_number:   Option<RollNumber>,
  pub phone:         Option<String>,
  /// Argon2 PHC string; never serialised out.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
}

/// Who is calling, as resolved by the identity provider for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
  pub role:        Role,
  pub email:       String,
  pub name:        String,
  pub roll_number: Option<RollNumber>,
  /// Subjects the caller teaches. Empty for non-teachers.
  pub subjects:    Vec<Subject>,
}

impl AuthorizationContext {
  pub fn teacher(email: impl Into<String>, subjects: Vec<Subject>) -> Self {
    let email = email.into();
    Self { role: Role::Teacher, name: email.clone(), email, roll_number: None, subjects }
  }

  pub fn student(email: impl Into<String>, name: impl Into<String>, roll_number: RollNumber) -> Self {
    Self {
      role:        Role::Student,
      email:       email.into(),
      name:        name.into(),
      roll_number: Some(roll_number),
      subjects:    Vec::new(),
    }
  }

  pub fn admin(email: impl Into<String>) -> Self {
    let email = email.into();
    Self { role: Role::Admin, name: email.clone(), email, roll_number: None, subjects: Vec::new() }
  }

  /// Build the context for an account, given the subjects it teaches.
  pub fn for_account(account: &Account, subjects: Vec<Subject>) -> Self {
    Self {
      role:        account.role,
      email:       account.email.clone(),
      name:        account.name.clone(),
      roll_number: account.roll_number.clone(),
      subjects:    if account.role == Role::Teacher { subjects } else { Vec::new() },
    }
  }

  pub fn is(&self, role: Role) -> bool { self.role == role }
}
