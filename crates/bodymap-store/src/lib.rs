//! # bodymap-store
//!
//! SQLite persistence for Body Assignments.
//!
//! Each assignment is stored as a single JSON document alongside a few
//! indexed columns used for listing.  The crate exposes a synchronous
//! [`Database`] handle wrapping a `rusqlite::Connection`; it implements
//! [`bodymap_core::AssignmentStore`] so the aggregate manager can run on it
//! directly.

pub mod assignments;
pub mod database;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::StoreError;
