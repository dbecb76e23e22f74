// File: ./src/model/item.rs
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaskStatus {
    NeedsAction,
    InProcess,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Maps a raw `STATUS` value. Unknown values fall back to NEEDS-ACTION.
    pub fn from_ical(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "COMPLETED" => TaskStatus::Completed,
            "IN-PROCESS" => TaskStatus::InProcess,
            "CANCELLED" => TaskStatus::Cancelled,
            _ => TaskStatus::NeedsAction,
        }
    }
}

// --- DATE TYPES ---

/// A DATE or DATE-TIME value as found on DTSTART/DTEND/DUE.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DateType {
    AllDay(NaiveDate),
    Specific(DateTime<Utc>),
}

impl DateType {
    pub fn is_all_day(&self) -> bool {
        matches!(self, DateType::AllDay(_))
    }

    /// Wall-clock view of the value. AllDay values sit at local midnight.
    pub fn to_local(&self) -> NaiveDateTime {
        match self {
            DateType::AllDay(d) => d.and_time(chrono::NaiveTime::MIN),
            DateType::Specific(dt) => dt.with_timezone(&Local).naive_local(),
        }
    }

    pub fn to_date_naive(&self) -> NaiveDate {
        match self {
            DateType::AllDay(d) => *d,
            DateType::Specific(dt) => dt.with_timezone(&Local).date_naive(),
        }
    }

    /// Shifts the value by a number of seconds, keeping its flavor.
    /// AllDay values only move by whole days. None when the result leaves chrono's range.
    pub fn shifted(&self, seconds: i64) -> Option<DateType> {
        match self {
            DateType::AllDay(d) => {
                let days = chrono::Duration::try_days(seconds.div_euclid(86400))?;
                d.checked_add_signed(days).map(DateType::AllDay)
            }
            DateType::Specific(dt) => {
                let delta = chrono::Duration::try_seconds(seconds)?;
                dt.checked_add_signed(delta).map(DateType::Specific)
            }
        }
    }
}

impl From<DateTime<Local>> for DateType {
    fn from(dt: DateTime<Local>) -> Self {
        DateType::Specific(dt.with_timezone(&Utc))
    }
}

// --- ENTRIES ---

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    pub summary: String,
    pub location: Option<String>,
    pub dtstart: DateType,
    /// Exclusive end (DTEND, or DTSTART + DURATION).
    pub dtend: Option<DateType>,
    /// End of every occurrence, in order. Only set for bounded recurrences.
    pub occurrences: Option<Vec<DateType>>,
}

impl Event {
    pub fn new(summary: &str, dtstart: DateType, dtend: Option<DateType>) -> Self {
        Self {
            summary: summary.to_string(),
            location: None,
            dtstart,
            dtend,
            occurrences: None,
        }
    }

    pub fn last_occurrence_end(&self) -> Option<DateType> {
        self.occurrences.as_ref()?.last().copied()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Task {
    pub summary: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<u32>,
    pub dtstart: Option<DateType>,
    pub due: Option<DateType>,
}

impl Task {
    pub fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            status: None,
            priority: None,
            dtstart: None,
            due: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Some(TaskStatus::Completed)
    }
}

/// Either kind of calendar entry the converter knows how to render.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Entry<'a> {
    Event(&'a Event),
    Task(&'a Task),
}

impl Entry<'_> {
    pub fn summary(&self) -> &str {
        match self {
            Entry::Event(e) => &e.summary,
            Entry::Task(t) => &t.summary,
        }
    }
}

/// Typed projection of one VCALENDAR, in document order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Calendar {
    pub events: Vec<Event>,
    pub todos: Vec<Task>,
}

impl Calendar {
    /// Events first, then tasks, each in document order.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        self.events
            .iter()
            .map(Entry::Event)
            .chain(self.todos.iter().map(Entry::Task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_mapping() {
        assert_eq!(TaskStatus::from_ical("completed"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_ical(" IN-PROCESS "), TaskStatus::InProcess);
        assert_eq!(TaskStatus::from_ical("X-WHATEVER"), TaskStatus::NeedsAction);
    }

    #[test]
    fn test_allday_shift_moves_whole_days() {
        let d = DateType::AllDay(NaiveDate::from_ymd_opt(2010, 1, 4).unwrap());
        assert_eq!(
            d.shifted(3 * 86400),
            Some(DateType::AllDay(NaiveDate::from_ymd_opt(2010, 1, 7).unwrap()))
        );
        assert_eq!(d.shifted(3600), Some(d));
    }

    #[test]
    fn test_specific_shift_is_exact() {
        let dt = Utc.with_ymd_and_hms(2007, 11, 30, 8, 0, 0).unwrap();
        let shifted = DateType::Specific(dt).shifted(5400);
        assert_eq!(
            shifted,
            Some(DateType::Specific(
                Utc.with_ymd_and_hms(2007, 11, 30, 9, 30, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_shift_out_of_range_is_none() {
        let d = DateType::AllDay(NaiveDate::from_ymd_opt(2010, 1, 4).unwrap());
        assert_eq!(d.shifted(999_999_999 * 86400), None);
        assert_eq!(d.shifted(i64::MAX), None);

        let dt = DateType::Specific(Utc.with_ymd_and_hms(2010, 1, 4, 9, 0, 0).unwrap());
        assert_eq!(dt.shifted(999_999_999 * 86400), None);
        assert_eq!(dt.shifted(i64::MIN), None);
    }

    #[test]
    fn test_entries_keep_document_order() {
        let day = DateType::AllDay(NaiveDate::from_ymd_opt(2006, 1, 1).unwrap());
        let cal = Calendar {
            events: vec![Event::new("first", day, None), Event::new("second", day, None)],
            todos: vec![Task::new("third")],
        };
        let names: Vec<String> = cal.entries().map(|e| e.summary().to_string()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
