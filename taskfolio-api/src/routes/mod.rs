/// API route handlers
///
/// Each submodule groups the handlers for one resource:
/// - `health`: Service health check
/// - `auth`: Registration, login, profile, and password management
/// - `tasks`: Task CRUD, filtering, status toggle, and attachments
/// - `categories`: Category CRUD
/// - `calendar`: Calendar feed, iCalendar export, and Google Calendar sync

pub mod auth;
pub mod calendar;
pub mod categories;
pub mod health;
pub mod tasks;
