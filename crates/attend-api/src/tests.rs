//! Router tests driving the full API against an in-memory SQLite store.

use std::sync::Arc;

use attend_core::{
  Attendance,
  course::Subject,
  identity::{Account, Role},
  person::{Person, RollNumber, ScanCredential},
  policy::AttendancePolicy,
  store::{Accounts as _, Catalog as _, Roster as _},
};
use attend_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router, identity::hash_password};

const BOB: &str = "bob.teacher@example.com";
const CAROL: &str = "carol.teacher@example.com";
const SWAN: &str = "swan.pyae@example.com";
const ADMIN: &str = "admin@example.com";

async fn make_state() -> ApiState<SqliteStore> {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let hash = hash_password("secret").unwrap();

  let account = |email: &str, name: &str, role: Role, roll: Option<&str>| Account {
    email:         email.into(),
    name:          name.into(),
    role,
    roll_number:   roll.map(|r| RollNumber::parse(r).unwrap()),
    phone:         None,
    password_hash: hash.clone(),
  };
  store.insert_account(account(BOB, "Teacher Bob", Role::Teacher, None)).await.unwrap();
  store.insert_account(account(CAROL, "Teacher Carol", Role::Teacher, None)).await.unwrap();
  store.insert_account(account(ADMIN, "Admin", Role::Admin, None)).await.unwrap();
  store
    .insert_account(account(SWAN, "Swan Pyae Aung", Role::Student, Some("20260000002")))
    .await
    .unwrap();

  for (roll, name, fp) in [
    ("20260000001", "Shinn Khant Aung", "FP-0001"),
    ("20260000002", "Swan Pyae Aung", "FP-0002"),
  ] {
    store
      .insert_person(Person {
        name:        name.into(),
        roll_number: RollNumber::parse(roll).unwrap(),
        credential:  Some(ScanCredential::new(fp)),
      })
      .await
      .unwrap();
  }

  let iot = store.create_course(&Subject::new("IOT")).await.unwrap().unwrap();
  store.assign_teacher(iot.course_id, BOB).await.unwrap();

  let attendance = Attendance::new(store, AttendancePolicy::default());
  ApiState::new(attendance, chrono::Duration::hours(1))
}

async fn send(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, String) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_of(body: &str) -> Value { serde_json::from_str(body).unwrap() }

async fn login(state: &ApiState<SqliteStore>, email: &str, role: Option<&str>) -> String {
  let (status, body) = send(
    state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": email, "password": "secret", "role": role })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  json_of(&body)["token"].as_str().unwrap().to_owned()
}

// ── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_and_me() {
  let state = make_state().await;
  let token = login(&state, BOB, Some("teacher")).await;

  let (status, body) = send(&state, "GET", "/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let me = json_of(&body);
  assert_eq!(me["email"], BOB);
  assert_eq!(me["role"], "teacher");
  assert_eq!(me["subjects"], json!(["IOT"]));
}

#[tokio::test]
async fn bad_password_is_401() {
  let state = make_state().await;
  let (status, body) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": BOB, "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(json_of(&body)["error"], "Invalid credentials");
}

#[tokio::test]
async fn student_on_teacher_portal_is_403() {
  let state = make_state().await;
  let (status, body) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": SWAN, "password": "secret", "role": "teacher" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(json_of(&body)["error"], "You do not have teacher privileges");
}

#[tokio::test]
async fn missing_or_revoked_token_is_401() {
  let state = make_state().await;
  let (status, _) = send(&state, "GET", "/roster", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let token = login(&state, BOB, None).await;
  let (status, _) = send(&state, "POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = send(&state, "GET", "/roster", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(json_of(&body)["error"], "Not authenticated");
}

// ── Scanning ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_then_duplicate() {
  let state = make_state().await;
  let token = login(&state, BOB, Some("teacher")).await;

  let (status, body) =
    send(&state, "POST", "/scans", Some(&token), Some(json!({ "credential": "FP-0002" }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let receipt = json_of(&body);
  let message = receipt["message"].as_str().unwrap();
  assert!(message.starts_with("Swan Pyae Aung marked "), "{message}");
  assert!(message.ends_with(" for IOT"), "{message}");
  assert_eq!(receipt["event"]["recorded_by"], BOB);

  let (status, body) =
    send(&state, "POST", "/scans", Some(&token), Some(json!({ "credential": "FP-0002" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(json_of(&body)["error"], "Swan Pyae Aung already marked for IOT today");
}

#[tokio::test]
async fn scan_outcomes_map_to_statuses() {
  let state = make_state().await;
  let bob = login(&state, BOB, None).await;
  let carol = login(&state, CAROL, None).await;
  let swan = login(&state, SWAN, None).await;

  let scan = json!({ "credential": "FP-0001" });
  let (status, _) = send(&state, "POST", "/scans", Some(&swan), Some(scan.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(&state, "POST", "/scans", Some(&carol), Some(scan)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(json_of(&body)["error"], "No subject assigned to teacher");

  let unknown = json!({ "credential": "FP-9999" });
  let (status, body) = send(&state, "POST", "/scans", Some(&bob), Some(unknown)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(json_of(&body)["error"], "Fingerprint not recognized");
}

#[tokio::test]
async fn absentees_exclude_scanned_students() {
  let state = make_state().await;
  let token = login(&state, BOB, None).await;
  send(&state, "POST", "/scans", Some(&token), Some(json!({ "credential": "FP-0002" }))).await;

  let (status, body) = send(&state, "GET", "/absentees", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let absent = json_of(&body);
  let rolls: Vec<_> = absent.as_array().unwrap().iter().map(|r| r["roll_number"].clone()).collect();
  assert_eq!(rolls, vec![json!("20260000001")]);
  assert_eq!(absent[0]["status"], "absent");

  let (status, body) = send(&state, "GET", "/absentees?date=2999-01-01", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json_of(&body), json!([]));
}

// ── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_records_and_export() {
  let state = make_state().await;
  let bob = login(&state, BOB, None).await;
  send(&state, "POST", "/scans", Some(&bob), Some(json!({ "credential": "FP-0002" }))).await;

  let swan = login(&state, SWAN, None).await;
  let (status, body) = send(&state, "GET", "/history", Some(&swan), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json_of(&body).as_array().unwrap().len(), 1);

  let (status, _) = send(&state, "GET", "/records", Some(&swan), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(&state, "GET", "/records", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json_of(&body)[0]["student_name"], "Swan Pyae Aung");

  let (status, csv) = send(&state, "GET", "/export", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  let mut lines = csv.lines();
  assert_eq!(lines.next(), Some("id,roll_number,student_name,subject,recorded_at,status"));
  assert!(lines.next().unwrap().contains(",20260000002,Swan Pyae Aung,IOT,"));
}

// ── Registration & admin ────────────────────────────────────────────────────

#[tokio::test]
async fn self_registration() {
  let state = make_state().await;
  let body = json!({
    "name": "Myat Thu Kha",
    "email": "myat.thu@example.com",
    "password": "secret",
    "roll_number": "20260000004",
    "credential": "FP-0004",
  });
  let (status, created) = send(&state, "POST", "/auth/register", None, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert!(!created.contains("argon2"));

  let (status, _) = send(&state, "POST", "/auth/register", None, Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  login(&state, "myat.thu@example.com", None).await;

  let bad_roll = json!({
    "name": "X", "email": "x@example.com", "password": "secret", "roll_number": "12",
  });
  let (status, _) = send(&state, "POST", "/auth/register", None, Some(bad_roll)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn self_registration_cannot_claim_a_credential() {
  let state = make_state().await;
  let body = json!({
    "name": "Impostor",
    "email": "impostor@example.com",
    "password": "secret",
    "roll_number": "20260000003",
    "credential": "FP-0003",
  });
  let (status, created) = send(&state, "POST", "/auth/register", None, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");

  let bob = login(&state, BOB, None).await;
  let (status, body) =
    send(&state, "POST", "/scans", Some(&bob), Some(json!({ "credential": "FP-0003" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
  assert_eq!(json_of(&body)["error"], "Fingerprint not recognized");

  let (_, roster) = send(&state, "GET", "/roster", Some(&bob), None).await;
  let impostor = json_of(&roster)
    .as_array()
    .unwrap()
    .iter()
    .find(|p| p["roll_number"] == "20260000003")
    .cloned()
    .unwrap();
  assert!(impostor["credential"].is_null());
}

#[tokio::test]
async fn admin_registration_binds_a_credential() {
  let state = make_state().await;
  let admin = login(&state, ADMIN, None).await;
  let body = json!({
    "name": "Thet Myat Noe",
    "email": "thet.myat@example.com",
    "password": "secret",
    "roll_number": "20260000003",
    "credential": "FP-0003",
  });
  let (status, created) = send(&state, "POST", "/admin/students", Some(&admin), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");

  let bob = login(&state, BOB, None).await;
  let (status, body) =
    send(&state, "POST", "/scans", Some(&bob), Some(json!({ "credential": "FP-0003" }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert!(json_of(&body)["message"].as_str().unwrap().starts_with("Thet Myat Noe marked "));
}

#[tokio::test]
async fn admin_manages_courses() {
  let state = make_state().await;
  let admin = login(&state, ADMIN, Some("admin")).await;
  let bob = login(&state, BOB, None).await;

  let (status, _) = send(&state, "GET", "/admin/overview", Some(&bob), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) =
    send(&state, "POST", "/admin/courses", Some(&admin), Some(json!({ "subject": "WDD" }))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let id = json_of(&body)["course_id"].as_i64().unwrap();

  let (status, _) =
    send(&state, "POST", "/admin/courses", Some(&admin), Some(json!({ "subject": "WDD" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let uri = format!("/admin/courses/{id}/teacher");
  let (status, body) = send(&state, "POST", &uri, Some(&admin), Some(json!({ "email": CAROL }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(json_of(&body)["teacher_email"], CAROL);

  let uri = format!("/admin/courses/{id}/students");
  let (status, body) =
    send(&state, "POST", &uri, Some(&admin), Some(json!({ "roll_number": "20260000001" }))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(json_of(&body)["enrolled"], json!(["20260000001"]));

  let (status, _) =
    send(&state, "POST", "/admin/courses/999/students", Some(&admin), Some(json!({ "roll_number": "20260000001" })))
      .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // Subjects are read from the catalog, so Carol now teaches WDD.
  let carol = login(&state, CAROL, None).await;
  let (_, me) = send(&state, "GET", "/me", Some(&carol), None).await;
  assert_eq!(json_of(&me)["subjects"], json!(["WDD"]));

  let (status, body) = send(&state, "GET", "/admin/overview", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  let overview = json_of(&body);
  assert_eq!(overview["courses"].as_array().unwrap().len(), 2);
  assert_eq!(overview["teachers"].as_array().unwrap().len(), 2);
  assert_eq!(overview["students"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_registers_teacher() {
  let state = make_state().await;
  let admin = login(&state, ADMIN, None).await;
  let body = json!({ "name": "Teacher David", "email": "david.teacher@example.com", "password": "secret" });

  let (status, created) = send(&state, "POST", "/admin/teachers", Some(&admin), Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(json_of(&created)["role"], "teacher");

  let (status, _) = send(&state, "POST", "/admin/teachers", Some(&admin), Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  login(&state, "david.teacher@example.com", Some("teacher")).await;
}

#[tokio::test]
async fn non_admin_people_registration_is_refused_first() {
  let state = make_state().await;
  let bob = login(&state, BOB, None).await;

  // An empty password would be a 400 if the body were looked at.
  let teacher = json!({ "name": "Teacher Eve", "email": "eve@example.com", "password": "" });
  let (status, _) = send(&state, "POST", "/admin/teachers", Some(&bob), Some(teacher)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let student = json!({
    "name": "X", "email": "x@example.com", "password": "", "roll_number": "20260000009",
  });
  let (status, _) = send(&state, "POST", "/admin/students", Some(&bob), Some(student)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}
