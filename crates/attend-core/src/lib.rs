//! Core types and the attendance decision core.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the collaborator traits ([`store::Roster`], [`store::Ledger`],
//! [`store::Catalog`], [`store::Accounts`]) and the [`Attendance`] service
//! that decides whether a scan can be recorded, what status it receives, and
//! who may see which records.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod course;
pub mod error;
pub mod event;
pub mod identity;
pub mod memory;
pub mod person;
pub mod policy;
pub mod service;
pub mod store;

pub use error::{Error, Result};
pub use service::Attendance;
