//! SQL schema for the attendance SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    roll_number TEXT PRIMARY KEY,   -- 11 digits
    name        TEXT NOT NULL,
    credential  TEXT UNIQUE         -- scanner id, e.g. 'FP-0002'
);

CREATE TABLE IF NOT EXISTS accounts (
    email         TEXT PRIMARY KEY, -- lower-cased
    name          TEXT NOT NULL,
    role          TEXT NOT NULL,    -- 'student' | 'teacher' | 'admin'
    roll_number   TEXT UNIQUE,      -- students only
    phone         TEXT,
    password_hash TEXT NOT NULL     -- argon2 PHC string
);

CREATE TABLE IF NOT EXISTS courses (
    course_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    subject       TEXT NOT NULL UNIQUE,
    teacher_email TEXT REFERENCES accounts(email)
);

CREATE TABLE IF NOT EXISTS enrollments (
    course_id   INTEGER NOT NULL REFERENCES courses(course_id),
    roll_number TEXT    NOT NULL REFERENCES people(roll_number),
    PRIMARY KEY (course_id, roll_number)
);

-- Attendance events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS events (
    event_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    roll_number  TEXT NOT NULL,
    student_name TEXT NOT NULL,
    subject      TEXT NOT NULL,
    recorded_by  TEXT NOT NULL,
    recorded_at  TEXT NOT NULL,     -- RFC 3339 UTC; server-assigned
    date         TEXT NOT NULL,     -- YYYY-MM-DD in the reporting timezone
    status       TEXT NOT NULL,     -- 'present' | 'late' | 'seriously_late'
    UNIQUE (roll_number, subject, date)
);

CREATE INDEX IF NOT EXISTS events_date_idx     ON events(date);
CREATE INDEX IF NOT EXISTS events_recorder_idx ON events(recorded_by);

PRAGMA user_version = 1;
";
