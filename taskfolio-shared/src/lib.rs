//! # Taskfolio Shared Library
//!
//! This crate contains the data model, persistence layer, and business logic
//! shared between the Taskfolio API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, categories, tasks) and their queries
//! - `db`: Connection pool management and migrations
//! - `auth`: Password hashing, bearer tokens, and the request auth gate
//! - `storage`: Attachment storage with collision-proof file names
//! - `calendar`: iCalendar export and the Google Calendar bridge

pub mod auth;
pub mod calendar;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the Taskfolio shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
