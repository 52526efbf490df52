/// iCalendar export
///
/// Serializes tasks to an RFC 5545 calendar document. Each due-dated task
/// becomes one all-day VEVENT with `DTSTART` = `DTEND` = the due date,
/// `SUMMARY` = title, `DESCRIPTION` = description (empty string when the
/// task has none), and a numeric `PRIORITY` where lower is more urgent:
/// High→1, Medium→5, Low→9.

use icalendar::{Calendar, Component, Event, EventLike};

use crate::models::task::Task;

/// Builds an iCalendar document from a user's tasks
///
/// Tasks without a due date are excluded entirely.
pub fn export_tasks(tasks: &[Task]) -> String {
    let mut cal = Calendar::new();

    for task in tasks {
        let Some(due) = task.due_date else {
            continue;
        };

        let mut event = Event::new();
        event.uid(&task.id.to_string());
        event.summary(&task.title);
        event.description(task.description.as_deref().unwrap_or(""));
        event.starts(due);
        event.ends(due);
        let priority = task.priority.ical_priority().to_string();
        event.add_property("PRIORITY", &priority);

        cal.push(event.done());
    }

    cal.done().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn task_due(title: &str, due: Option<NaiveDate>, priority: TaskPriority) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            due_date: due,
            status: TaskStatus::Pending,
            priority,
            file_path: None,
            category_id: None,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_due_dated_task_round_trip() {
        let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let ics = export_tasks(&[task_due("Lab report", Some(due), TaskPriority::High)]);

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(ics.contains("SUMMARY:Lab report"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20250310"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250310"));
        assert!(ics.contains("PRIORITY:1"));
    }

    #[test]
    fn test_undated_task_excluded() {
        let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let ics = export_tasks(&[
            task_due("Dated", Some(due), TaskPriority::Medium),
            task_due("Undated", None, TaskPriority::Medium),
        ]);

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(!ics.contains("Undated"));
    }

    #[test]
    fn test_priority_mapping() {
        let due = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let high = export_tasks(&[task_due("t", Some(due), TaskPriority::High)]);
        let medium = export_tasks(&[task_due("t", Some(due), TaskPriority::Medium)]);
        let low = export_tasks(&[task_due("t", Some(due), TaskPriority::Low)]);

        assert!(high.contains("PRIORITY:1"));
        assert!(medium.contains("PRIORITY:5"));
        assert!(low.contains("PRIORITY:9"));
    }

    #[test]
    fn test_missing_description_is_empty_string() {
        let due = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let ics = export_tasks(&[task_due("t", Some(due), TaskPriority::Low)]);
        assert!(ics.contains("DESCRIPTION:"));
    }

    #[test]
    fn test_empty_task_list_is_valid_calendar() {
        let ics = export_tasks(&[]);
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("END:VCALENDAR"));
        assert!(!ics.contains("BEGIN:VEVENT"));
    }
}
