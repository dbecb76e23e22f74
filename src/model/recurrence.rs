// File: ./src/model/recurrence.rs
use crate::model::item::DateType;
use chrono::offset::LocalResult;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use std::collections::HashSet;
use std::str::FromStr;

/// Upper bound on expanded instances. `COUNT`/`UNTIL` rules normally stop far earlier.
const MAX_OCCURRENCES: u16 = 1000;

const UTC_STAMP: &str = "%Y%m%dT%H%M%SZ";
const LOCAL_STAMP: &str = "%Y%m%dT%H%M%S";

/// Zone a timed DTSTART was written in. Instances are generated on that
/// zone's wall clock, so a 09:00 meeting stays at 09:00 across DST changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedZone {
    Utc,
    /// Floating time, read as the machine's local time.
    Local,
    Named(Tz),
}

pub struct RecurrenceEngine;

impl RecurrenceEngine {
    /// A rule only has a "last occurrence" if it carries COUNT or UNTIL.
    pub fn is_bounded(rule: &str) -> bool {
        rule.to_uppercase()
            .split(';')
            .any(|part| part.starts_with("COUNT=") || part.starts_with("UNTIL="))
    }

    /// Expands a bounded rule into the start of every instance, in order.
    /// Returns None for unbounded or unparseable rules.
    pub fn occurrence_starts(
        dtstart: &DateType,
        zone: SeedZone,
        rule: &str,
        exdates: &[DateType],
        rdates: &[DateType],
    ) -> Option<Vec<DateType>> {
        let clean_rule = strip_prefix(rule);
        if !Self::is_bounded(clean_rule) {
            log::debug!("Ignoring unbounded rule '{}'", clean_rule);
            return None;
        }

        let rrule_string = build_rrule_string(dtstart, zone, clean_rule, exdates, rdates);

        let rrule_set = match RRuleSet::from_str(&rrule_string) {
            Ok(set) => set,
            Err(e) => {
                log::warn!("Could not expand recurrence '{}': {}", clean_rule, e);
                return None;
            }
        };

        let result = rrule_set.all(MAX_OCCURRENCES);
        if result.limited {
            log::debug!(
                "Recurrence '{}' truncated at {} instances",
                clean_rule,
                MAX_OCCURRENCES
            );
        }

        let starts = result
            .dates
            .into_iter()
            .map(|d| {
                let utc = d.to_utc();
                match dtstart {
                    DateType::AllDay(_) => DateType::AllDay(utc.date_naive()),
                    DateType::Specific(_) => DateType::Specific(utc),
                }
            })
            .collect();
        Some(starts)
    }

    /// End of every instance: each start shifted by the base event's length.
    pub fn occurrence_ends(
        dtstart: &DateType,
        dtend: Option<&DateType>,
        zone: SeedZone,
        rule: &str,
        exdates: &[DateType],
        rdates: &[DateType],
    ) -> Option<Vec<DateType>> {
        let span = dtend.map(|end| span_seconds(dtstart, end)).unwrap_or(0);
        let starts = Self::occurrence_starts(dtstart, zone, rule, exdates, rdates)?;
        let ends = starts.iter().map(|s| s.shifted(span)).collect::<Option<Vec<_>>>();
        if ends.is_none() {
            log::warn!("Recurrence '{}' runs out of the calendar range", strip_prefix(rule));
        }
        ends
    }
}

fn strip_prefix(rule: &str) -> &str {
    let trimmed = rule.trim();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &trimmed[6..],
        _ => trimmed,
    }
}

fn to_utc_stamp(value: &DateType) -> String {
    let utc = match value {
        DateType::AllDay(d) => d.and_time(NaiveTime::MIN).and_utc(),
        DateType::Specific(dt) => *dt,
    };
    utc.format(UTC_STAMP).to_string()
}

/// Wall-clock reading of `dt` in `tz`, if that reading is unambiguous there.
fn wall_clock<T: TimeZone>(dt: &DateTime<Utc>, tz: &T) -> Option<NaiveDateTime> {
    let naive = dt.with_timezone(tz).naive_local();
    matches!(tz.from_local_datetime(&naive), LocalResult::Single(_)).then_some(naive)
}

/// AllDay seeds become UTC midnight so the date survives the trip through rrule.
/// Times that fall in a DST fold are handed over in UTC.
fn dtstart_line(dtstart: &DateType, zone: SeedZone) -> String {
    let DateType::Specific(dt) = dtstart else {
        return format!("DTSTART:{}", to_utc_stamp(dtstart));
    };
    match zone {
        SeedZone::Named(tz) => {
            if let Some(naive) = wall_clock(dt, &tz) {
                return format!("DTSTART;TZID={}:{}", tz.name(), naive.format(LOCAL_STAMP));
            }
        }
        SeedZone::Local => {
            if let Some(naive) = wall_clock(dt, &Local) {
                return format!("DTSTART:{}", naive.format(LOCAL_STAMP));
            }
        }
        SeedZone::Utc => {}
    }
    format!("DTSTART:{}", to_utc_stamp(dtstart))
}

/// A date-only UNTIL covers the whole day on the seed's wall clock.
fn date_until_stamp(date: &str, dtstart: &DateType, zone: SeedZone) -> String {
    let end_of_day = NaiveDate::parse_from_str(date, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59));
    let zoned = match (dtstart, zone, end_of_day) {
        (DateType::Specific(_), SeedZone::Named(tz), Some(end)) => tz
            .from_local_datetime(&end)
            .latest()
            .map(|d| d.with_timezone(&Utc)),
        (DateType::Specific(_), SeedZone::Local, Some(end)) => Local
            .from_local_datetime(&end)
            .latest()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    };
    match zoned {
        Some(utc) => utc.format(UTC_STAMP).to_string(),
        None => format!("{}T235959Z", date),
    }
}

fn build_rrule_string(
    dtstart: &DateType,
    zone: SeedZone,
    rule: &str,
    exdates: &[DateType],
    rdates: &[DateType],
) -> String {
    let mut rule_part = rule.to_string();

    // rrule wants UNTIL in UTC for zoned and UTC seeds alike.
    if let Some(idx) = rule_part.to_uppercase().find("UNTIL=") {
        let val_start = idx + 6;
        let val_end = rule_part[val_start..]
            .find(';')
            .map(|i| val_start + i)
            .unwrap_or(rule_part.len());
        let until_val = &rule_part[val_start..val_end];

        let new_until = if until_val.len() == 8 && !until_val.contains('T') {
            Some(date_until_stamp(until_val, dtstart, zone))
        } else if !until_val.ends_with('Z') {
            Some(format!("{}Z", until_val))
        } else {
            None
        };
        if let Some(new_until) = new_until {
            rule_part.replace_range(val_start..val_end, &new_until);
        }
    }

    let mut out = format!("{}\nRRULE:{}\n", dtstart_line(dtstart, zone), rule_part);

    let mut seen = HashSet::new();
    for ex in exdates {
        let stamp = to_utc_stamp(ex);
        if seen.insert(stamp.clone()) {
            out.push_str(&format!("EXDATE:{}\n", stamp));
        }
    }
    for rd in rdates {
        out.push_str(&format!("RDATE:{}\n", to_utc_stamp(rd)));
    }
    out
}

fn span_seconds(start: &DateType, end: &DateType) -> i64 {
    match (start, end) {
        (DateType::AllDay(s), DateType::AllDay(e)) => (*e - *s).num_days() * 86400,
        (DateType::Specific(s), DateType::Specific(e)) => (*e - *s).num_seconds(),
        _ => (end.to_local() - start.to_local()).num_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateType {
        DateType::AllDay(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_bounded_detection() {
        assert!(RecurrenceEngine::is_bounded("FREQ=DAILY;COUNT=3"));
        assert!(RecurrenceEngine::is_bounded("freq=weekly;until=20100110"));
        assert!(!RecurrenceEngine::is_bounded("FREQ=DAILY"));
    }

    #[test]
    fn test_daily_count_all_day() {
        let ends = RecurrenceEngine::occurrence_ends(
            &day(2010, 1, 4),
            Some(&day(2010, 1, 5)),
            SeedZone::Utc,
            "FREQ=DAILY;COUNT=3",
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(ends, vec![day(2010, 1, 5), day(2010, 1, 6), day(2010, 1, 7)]);
    }

    #[test]
    fn test_date_only_until_is_inclusive() {
        let starts = RecurrenceEngine::occurrence_starts(
            &day(2010, 1, 4),
            SeedZone::Utc,
            "RRULE:FREQ=DAILY;UNTIL=20100106",
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts.last(), Some(&day(2010, 1, 6)));
    }

    #[test]
    fn test_exdate_is_skipped() {
        let starts = RecurrenceEngine::occurrence_starts(
            &day(2010, 1, 4),
            SeedZone::Utc,
            "FREQ=DAILY;COUNT=3",
            &[day(2010, 1, 5), day(2010, 1, 5)],
            &[],
        )
        .unwrap();
        // COUNT counts generated instances, EXDATE removes one of them.
        assert_eq!(starts, vec![day(2010, 1, 4), day(2010, 1, 6)]);
    }

    #[test]
    fn test_timed_weekly_keeps_time() {
        let start = DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 1, 9, 30, 0).unwrap());
        let end = DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 1, 10, 0, 0).unwrap());
        let ends = RecurrenceEngine::occurrence_ends(
            &start,
            Some(&end),
            SeedZone::Utc,
            "FREQ=WEEKLY;COUNT=2",
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(
            ends.last(),
            Some(&DateType::Specific(
                Utc.with_ymd_and_hms(2010, 3, 8, 10, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_unbounded_rule_is_not_expanded() {
        assert!(
            RecurrenceEngine::occurrence_starts(
                &day(2010, 1, 4),
                SeedZone::Utc,
                "FREQ=DAILY",
                &[],
                &[]
            )
            .is_none()
        );
    }

    #[test]
    fn test_garbage_rule_is_not_expanded() {
        assert!(
            RecurrenceEngine::occurrence_starts(
                &day(2010, 1, 4),
                SeedZone::Utc,
                "FREQ=SOMETIMES;COUNT=2",
                &[],
                &[]
            )
            .is_none()
        );
    }

    #[test]
    fn test_zoned_weekly_keeps_wall_clock_across_dst() {
        // 09:00 in Berlin is 08:00 UTC before 2010-03-28 and 07:00 UTC after.
        let start = DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 21, 8, 0, 0).unwrap());
        let starts = RecurrenceEngine::occurrence_starts(
            &start,
            SeedZone::Named(chrono_tz::Europe::Berlin),
            "FREQ=WEEKLY;COUNT=3",
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(
            starts,
            vec![
                start,
                DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 28, 7, 0, 0).unwrap()),
                DateType::Specific(Utc.with_ymd_and_hms(2010, 4, 4, 7, 0, 0).unwrap()),
            ]
        );
    }

    #[test]
    fn test_zoned_date_until_covers_local_day() {
        // 00:30 in Berlin is 22:30 UTC on the previous day. Apr 5 00:30 local is
        // still Apr 4 in UTC, yet lies past an UNTIL of Apr 4.
        let start = DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 31, 22, 30, 0).unwrap());
        let starts = RecurrenceEngine::occurrence_starts(
            &start,
            SeedZone::Named(chrono_tz::Europe::Berlin),
            "FREQ=DAILY;UNTIL=20100404",
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(starts.len(), 4);
        assert_eq!(
            starts.last(),
            Some(&DateType::Specific(
                Utc.with_ymd_and_hms(2010, 4, 3, 22, 30, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_zoned_seed_line() {
        let start = DateType::Specific(Utc.with_ymd_and_hms(2010, 3, 21, 8, 0, 0).unwrap());
        assert_eq!(
            dtstart_line(&start, SeedZone::Named(chrono_tz::Europe::Berlin)),
            "DTSTART;TZID=Europe/Berlin:20100321T090000"
        );
        assert_eq!(dtstart_line(&start, SeedZone::Utc), "DTSTART:20100321T080000Z");
        assert_eq!(dtstart_line(&day(2010, 3, 21), SeedZone::Local), "DTSTART:20100321T000000Z");
    }

    #[test]
    fn test_ends_out_of_range_are_dropped() {
        let start = day(2010, 1, 4);
        let end = day(9999, 12, 31);
        let far = DateType::AllDay(NaiveDate::MAX);
        assert!(
            RecurrenceEngine::occurrence_ends(
                &start,
                Some(&far),
                SeedZone::Utc,
                "FREQ=YEARLY;COUNT=2",
                &[],
                &[]
            )
            .is_none()
        );
        assert!(
            RecurrenceEngine::occurrence_ends(
                &start,
                Some(&end),
                SeedZone::Utc,
                "FREQ=YEARLY;COUNT=2",
                &[],
                &[]
            )
            .is_some()
        );
    }
}
