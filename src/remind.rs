// File: ./src/remind.rs
//! Renders calendar entries as `remind` REM lines.
//!
//! Every decision (whole-day vs. timed, UNTIL clause, DURATION, task lead time)
//! is taken here. Output for a run is built in memory so that a fatal error
//! never leaves half a file on stdout.
use crate::model::{Calendar, DateType, Entry, Event, Task};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86400;

/// Formatting knobs, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub label: String,
    pub heading: String,
    pub lead_days: i64,
    pub include_tasks: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            label: String::new(),
            heading: String::new(),
            lead_days: 3,
            include_tasks: false,
        }
    }
}

impl FormatOptions {
    fn has_banner(&self) -> bool {
        !self.heading.is_empty() || !self.label.is_empty()
    }
}

/// Options plus the instant used for tasks that have neither DUE nor DTSTART.
#[derive(Debug, Clone)]
pub struct FormatContext {
    pub options: FormatOptions,
    pub now: DateTime<Local>,
}

impl FormatContext {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            now: Local::now(),
        }
    }

    pub fn with_now(options: FormatOptions, now: DateTime<Local>) -> Self {
        Self { options, now }
    }
}

/// An event whose length cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    /// DTSTART and DTEND are not both DATE or both DATE-TIME.
    Mixed { summary: String },
    /// DTEND lies before DTSTART.
    Negative { summary: String, seconds: i64 },
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::Mixed { summary } => write!(
                f,
                "Event '{}' mixes DATE and DATE-TIME values for start and end",
                summary
            ),
            DurationError::Negative { summary, seconds } => {
                write!(f, "Event '{}' has a negative duration of {}s", summary, seconds)
            }
        }
    }
}

impl std::error::Error for DurationError {}

/// True if the value is a bare DATE.
pub fn is_whole_day(value: &DateType) -> bool {
    value.is_all_day()
}

/// Compares year, month and day in turn and answers false as soon as one of
/// `a`'s fields is smaller than `b`'s. A later `a` can therefore still count
/// as "the same day"; callers rely on this exact behavior.
pub fn same_calendar_day(a: &impl Datelike, b: &impl Datelike) -> bool {
    !(a.year() < b.year() || a.month() < b.month() || a.day() < b.day())
}

fn span_between(summary: &str, start: &DateType, end: &DateType) -> Result<i64, DurationError> {
    let seconds = match (start, end) {
        (DateType::AllDay(s), DateType::AllDay(e)) => (*e - *s).num_days() * SECONDS_PER_DAY,
        (DateType::Specific(s), DateType::Specific(e)) => (*e - *s).num_seconds(),
        _ => {
            return Err(DurationError::Mixed {
                summary: summary.to_string(),
            });
        }
    };
    if seconds < 0 {
        return Err(DurationError::Negative {
            summary: summary.to_string(),
            seconds,
        });
    }
    Ok(seconds)
}

/// Length of the event in seconds; 0 without an end.
pub fn event_duration(event: &Event) -> Result<i64, DurationError> {
    match &event.dtend {
        Some(end) => span_between(&event.summary, &event.dtstart, end),
        None => Ok(0),
    }
}

fn rem_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.format("%b"), date.day(), date.year())
}

/// One REM line for an event.
pub fn format_event(event: &Event, ctx: &FormatContext) -> Result<String, DurationError> {
    let timed = !is_whole_day(&event.dtstart);
    let duration = event_duration(event)?;

    let start_date = event.dtstart.to_date_naive();
    let mut line = format!("REM {}", rem_date(start_date));

    // For a bounded recurrence the reminder runs until the last instance ends.
    let (until_end, until_span) = match event.last_occurrence_end() {
        Some(last) => (Some(last), span_between(&event.summary, &event.dtstart, &last)?),
        None => (event.dtend, duration),
    };

    if let Some(end) = until_end {
        let end_date = end.to_date_naive();
        if !same_calendar_day(&start_date, &end_date) && (timed || until_span > SECONDS_PER_DAY) {
            line.push_str(&format!(" UNTIL {} *1", rem_date(end_date)));
        }
    }

    if timed {
        line.push_str(&format!(" AT {}", event.dtstart.to_local().format("%H:%M")));
        line.push_str(&format!(
            " DURATION {}:{}",
            duration / 3600,
            (duration % 3600) / 60
        ));
    }

    line.push_str(&format!(" +{}", ctx.options.lead_days));

    line.push_str(" MSG %a");
    if timed {
        line.push_str(" %3");
    }
    line.push_str(&format!(" %\"{}", event.summary));
    if let Some(location) = &event.location {
        line.push_str(&format!(" at {}", location));
    }
    line.push_str("%\"%");
    Ok(line)
}

/// One REM line for a task, or None when it is already completed.
pub fn format_task(task: &Task, ctx: &FormatContext) -> Option<String> {
    if task.is_completed() {
        log::debug!("Skipping completed task '{}'", task.summary);
        return None;
    }

    let due = task
        .due
        .or(task.dtstart)
        .unwrap_or_else(|| DateType::from(ctx.now));

    let priority = task
        .priority
        .map(|p| (u64::from(p) * 1000).to_string())
        .unwrap_or_default();

    let lead = match (&task.dtstart, &task.due) {
        (Some(start), Some(due)) => {
            (due.to_local() - start.to_local()).num_days() + ctx.options.lead_days
        }
        _ => ctx.options.lead_days,
    };

    Some(format!(
        "REM {} {} {} MSG %a %\"{}%\"%\"%",
        rem_date(due.to_date_naive()),
        lead,
        priority,
        task.summary
    ))
}

/// Dispatches on the entry kind.
pub fn format_entry(
    entry: Entry<'_>,
    ctx: &FormatContext,
) -> Result<Option<String>, DurationError> {
    match entry {
        Entry::Event(event) => format_event(event, ctx).map(Some),
        Entry::Task(task) => Ok(format_task(task, ctx)),
    }
}

pub fn events_banner(options: &FormatOptions) -> Option<String> {
    banner(options, "Events")
}

pub fn todos_banner(options: &FormatOptions) -> Option<String> {
    if !options.include_tasks {
        return None;
    }
    banner(options, "ToDos")
}

fn banner(options: &FormatOptions, section: &str) -> Option<String> {
    options.has_banner().then(|| {
        format!(
            "REM {} MSG {} {}:%\"%\"%",
            options.heading, options.label, section
        )
    })
}

/// Renders the whole calendar: event section, then (if enabled) the task section.
/// Each line is newline-terminated.
pub fn render(calendar: &Calendar, ctx: &FormatContext) -> Result<String, DurationError> {
    let mut out = String::new();
    let mut push = |line: String| {
        out.push_str(&line);
        out.push('\n');
    };

    if let Some(b) = events_banner(&ctx.options) {
        push(b);
    }
    let mut in_tasks = false;
    for entry in calendar.entries() {
        if let Entry::Task(_) = entry {
            if !ctx.options.include_tasks {
                log::debug!("Todos disabled, skipping from '{}' on", entry.summary());
                break;
            }
            if !in_tasks {
                in_tasks = true;
                if let Some(b) = todos_banner(&ctx.options) {
                    push(b);
                }
            }
        }
        if let Some(line) = format_entry(entry, ctx)? {
            push(line);
        }
    }
    // The task banner is printed even for a calendar without todos.
    if !in_tasks && let Some(b) = todos_banner(&ctx.options) {
        push(b);
    }

    Ok(out)
}
