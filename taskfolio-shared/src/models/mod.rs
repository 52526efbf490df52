/// Database models for Taskfolio
///
/// This module contains all database models and their query operations.
///
/// # Models
///
/// - `user`: User accounts (registration, login, profile)
/// - `category`: Per-user task categories with the delete-time referential guard
/// - `task`: To-do items with due dates, priority, status, and attachments
///
/// Every query against tasks and categories is scoped to the owning user;
/// cross-user access is surfaced as a distinct error at the operation layer,
/// never as an empty result.

pub mod category;
pub mod task;
pub mod user;
