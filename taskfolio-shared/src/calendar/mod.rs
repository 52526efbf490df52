/// Calendar bridge
///
/// Two ways out of Taskfolio and into a calendar:
///
/// - [`ics`]: serializes a user's due-dated tasks to an iCalendar document
/// - [`google`]: OAuth2 authorization-code exchange and event push to the
///   Google Calendar API
///
/// Both operate on the same rule: a task appears on a calendar only if it
/// has a due date, as one all-day event on that date. Tasks without a due
/// date are excluded entirely rather than given a placeholder.

pub mod google;
pub mod ics;
