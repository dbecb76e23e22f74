// File: src/model/adapter.rs
//! Projects a parsed iCalendar document onto the crate's `Calendar` model.
use crate::model::item::{Calendar, DateType, Event, Task, TaskStatus};
use crate::model::recurrence::{RecurrenceEngine, SeedZone};
use chrono::offset::LocalResult;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{CalendarComponent, Component, Property};
use std::fmt;
use std::str::FromStr;

/// The input is not an iCalendar document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse ICalendar: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Parses `raw_ics` and returns its events and todos in document order.
pub fn load(raw_ics: &str) -> Result<Calendar, ParseError> {
    if !raw_ics
        .lines()
        .any(|l| l.trim().eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(ParseError("no VCALENDAR found".to_string()));
    }

    let parsed = raw_ics.parse::<icalendar::Calendar>().map_err(ParseError)?;

    let mut calendar = Calendar::default();
    for component in &parsed.components {
        match component {
            CalendarComponent::Event(e) => {
                if let Some(event) = event_from_ical(e) {
                    calendar.events.push(event);
                }
            }
            CalendarComponent::Todo(t) => calendar.todos.push(task_from_ical(t)),
            _ => {}
        }
    }

    log::debug!(
        "Loaded {} event(s) and {} todo(s)",
        calendar.events.len(),
        calendar.todos.len()
    );
    Ok(calendar)
}

fn event_from_ical(event: &icalendar::Event) -> Option<Event> {
    let uid = event.get_uid().unwrap_or_default();

    let start_prop = event.properties().get("DTSTART");
    let Some(dtstart) = start_prop.and_then(|p| parse_date_prop(p, p.value())) else {
        log::warn!("Skipping event '{}' without a usable DTSTART", uid);
        return None;
    };

    // DTEND wins; otherwise derive it from DURATION (RFC 5545 allows either).
    let dtend = match event
        .properties()
        .get("DTEND")
        .and_then(|p| parse_date_prop(p, p.value()))
    {
        Some(end) => Some(end),
        None => match event.property_value("DURATION") {
            Some(raw) => {
                let Some(end) = parse_duration(raw).and_then(|secs| dtstart.shifted(secs)) else {
                    log::warn!("Skipping event '{}': unusable DURATION '{}'", uid, raw);
                    return None;
                };
                Some(end)
            }
            None => None,
        },
    };

    let occurrences = event.property_value("RRULE").and_then(|rule| {
        let zone = start_prop.map(seed_zone).unwrap_or(SeedZone::Utc);
        let exdates = collect_dates(event, "EXDATE");
        let rdates = collect_dates(event, "RDATE");
        log::debug!("Expanding '{}' for event '{}' ({:?})", rule, uid, zone);
        RecurrenceEngine::occurrence_ends(&dtstart, dtend.as_ref(), zone, rule, &exdates, &rdates)
    });

    Some(Event {
        summary: event.get_summary().unwrap_or_default().to_string(),
        location: event.property_value("LOCATION").map(String::from),
        dtstart,
        dtend,
        occurrences,
    })
}

fn task_from_ical(todo: &icalendar::Todo) -> Task {
    let status = todo.property_value("STATUS").map(TaskStatus::from_ical);

    let priority = todo
        .property_value("PRIORITY")
        .and_then(|v| v.trim().parse::<u32>().ok());

    let dtstart = todo
        .properties()
        .get("DTSTART")
        .and_then(|p| parse_date_prop(p, p.value()));
    let due = todo
        .properties()
        .get("DUE")
        .and_then(|p| parse_date_prop(p, p.value()));

    Task {
        summary: todo.get_summary().unwrap_or_default().to_string(),
        status,
        priority,
        dtstart,
        due,
    }
}

fn param<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params()
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, p)| p.value())
}

/// Reads one DATE / DATE-TIME value, honoring `VALUE=DATE` and `TZID`.
/// Floating times are taken as local wall-clock time.
fn parse_date_prop(prop: &Property, raw: &str) -> Option<DateType> {
    let val = raw.trim();
    let value_is_date = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));

    if value_is_date || (val.len() == 8 && !val.contains('T')) {
        return NaiveDate::parse_from_str(val.get(..8)?, "%Y%m%d")
            .ok()
            .map(DateType::AllDay);
    }

    if let Some(stripped) = val.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
            .ok()
            .map(|d| DateType::Specific(Utc.from_utc_datetime(&d)));
    }

    let naive = match NaiveDateTime::parse_from_str(val, "%Y%m%dT%H%M%S") {
        Ok(n) => n,
        Err(e) => {
            log::warn!("Unparseable date value '{}': {}", val, e);
            return None;
        }
    };

    if let Some(tzid) = param(prop, "TZID") {
        match tz_from_param(tzid) {
            Some(tz) => return resolve_local(&tz, &naive).map(DateType::Specific),
            None => log::warn!("Unknown TZID '{}', treating '{}' as local time", tzid, val),
        }
    }

    resolve_local(&Local, &naive).map(DateType::Specific)
}

fn tz_from_param(tzid: &str) -> Option<Tz> {
    Tz::from_str(tzid.trim_matches('"').trim_start_matches('/')).ok()
}

/// Pins a wall-clock time to `tz`. Ambiguous times take the earlier instant;
/// times skipped by a spring-forward change move forward by the gap (RFC 5545 3.3.5).
fn resolve_local<T: TimeZone>(tz: &T, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    let resolved = match tz.from_local_datetime(naive) {
        LocalResult::None => naive
            .checked_add_signed(chrono::Duration::hours(1))
            .and_then(|shifted| tz.from_local_datetime(&shifted).earliest()),
        other => other.earliest(),
    };
    resolved.map(|dt| dt.with_timezone(&Utc))
}

/// Zone the recurrence of a timed DTSTART is expanded in.
fn seed_zone(prop: &Property) -> SeedZone {
    if prop.value().trim().ends_with('Z') {
        return SeedZone::Utc;
    }
    param(prop, "TZID")
        .and_then(tz_from_param)
        .map_or(SeedZone::Local, SeedZone::Named)
}

/// Gathers every value of a possibly repeated, comma-separated date property.
fn collect_dates(event: &icalendar::Event, key: &str) -> Vec<DateType> {
    let mut props: Vec<&Property> = Vec::new();
    if let Some(multi) = event.multi_properties().get(key) {
        props.extend(multi.iter());
    }
    if let Some(single) = event.properties().get(key) {
        props.push(single);
    }

    props
        .into_iter()
        .flat_map(|p| {
            p.value()
                .split(',')
                .filter_map(|v| parse_date_prop(p, v))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parses an RFC 5545 duration (`P1D`, `PT1H30M`, `-P1W`) into seconds.
pub fn parse_duration(val: &str) -> Option<i64> {
    let val = val.trim();
    let (sign, body) = match val.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, val.strip_prefix('+').unwrap_or(val)),
    };
    let body = body.strip_prefix('P')?;

    let mut seconds: i64 = 0;
    let mut num_buf = String::new();
    let mut in_time = false;
    for c in body.chars() {
        if c == 'T' {
            in_time = true;
        } else if c.is_ascii_digit() {
            num_buf.push(c);
        } else {
            let n = num_buf.parse::<i64>().ok()?;
            num_buf.clear();
            let unit = match (c, in_time) {
                ('W', false) => 7 * 86400,
                ('D', false) => 86400,
                ('H', true) => 3600,
                ('M', true) => 60,
                ('S', true) => 1,
                _ => return None,
            };
            seconds = seconds.checked_add(n.checked_mul(unit)?)?;
        }
    }
    if !num_buf.is_empty() {
        return None;
    }
    Some(sign * seconds)
}
