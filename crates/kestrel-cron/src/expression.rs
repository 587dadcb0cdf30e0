use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::CronError;
use crate::field::{parse_field, FieldSpec};

const MONTH_NAMES: &[(&str, u32)] = &[
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

const DOW_NAMES: &[(&str, u32)] = &[
    ("SUN", 0),
    ("MON", 1),
    ("TUE", 2),
    ("WED", 3),
    ("THU", 4),
    ("FRI", 5),
    ("SAT", 6),
];

/// Five years of minutes. `next_fire` gives up and reports `Unsatisfiable`
/// rather than searching forever if no candidate minute is found within
/// this horizon.
const MAX_SEARCH_MINUTES: i64 = 5 * 366 * 24 * 60;

/// A parsed five-field cron expression: minute, hour, day-of-month, month,
/// day-of-week.
pub struct CronExpression {
    raw: String,
    minute: FieldSpec,
    hour: FieldSpec,
    day_of_month: FieldSpec,
    month: FieldSpec,
    day_of_week: FieldSpec,
}

impl CronExpression {
    /// Parses a `minute hour day-of-month month day-of-week` expression.
    /// Accepts wildcards, lists, ranges, steps, and the `JAN`-`DEC` /
    /// `SUN`-`SAT` name aliases; day-of-week also accepts `7` as an alias
    /// for Sunday.
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::Syntax(format!(
                "expected 5 whitespace-separated fields, found {}: \"{expr}\"",
                fields.len()
            )));
        }
        Ok(Self {
            raw: expr.to_string(),
            minute: parse_field(fields[0], 0, 59, &[], false)?,
            hour: parse_field(fields[1], 0, 23, &[], false)?,
            day_of_month: parse_field(fields[2], 1, 31, &[], false)?,
            month: parse_field(fields[3], 1, 12, MONTH_NAMES, false)?,
            day_of_week: parse_field(fields[4], 0, 7, DOW_NAMES, true)?,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.raw
    }

    /// POSIX day-of-month/day-of-week OR rule: if both fields are
    /// restricted (not a bare `*`), a day matches when it satisfies either
    /// one; if only one is restricted, that field alone decides; if neither
    /// is restricted, every day matches.
    fn day_matches(&self, date: DateTime<Utc>) -> bool {
        let dom_match = self.day_of_month.values.contains(&date.day());
        let dow_match = self
            .day_of_week
            .values
            .contains(&date.weekday().num_days_from_sunday());

        match (self.day_of_month.is_wildcard, self.day_of_week.is_wildcard) {
            (true, true) => true,
            (true, false) => dow_match,
            (false, true) => dom_match,
            (false, false) => dom_match || dow_match,
        }
    }

    /// Finds the next minute satisfying this expression, seconds and
    /// sub-second components dropped. `after` is rounded up to the next
    /// whole minute if it carries seconds, otherwise kept as-is, so a
    /// reference that already lands on a matching whole minute fires at that
    /// instant rather than the following one. Returns `Unsatisfiable` if no
    /// match is found within the search horizon.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        let start = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after);
        let mut candidate = if after > start {
            start + Duration::minutes(1)
        } else {
            start
        };

        for _ in 0..MAX_SEARCH_MINUTES {
            if self.month.values.contains(&candidate.month())
                && self.day_matches(candidate)
                && self.hour.values.contains(&candidate.hour())
                && self.minute.values.contains(&candidate.minute())
            {
                return Ok(candidate);
            }
            candidate += Duration::minutes(1);
        }
        Err(CronError::Unsatisfiable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_wrong_field_count() {
        assert!(matches!(
            CronExpression::parse("* * * *"),
            Err(CronError::Syntax(_))
        ));
    }

    #[test]
    fn quarter_hourly_expands() {
        let expr = CronExpression::parse("*/15 0 * * *").unwrap();
        let start = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 1).unwrap();
        let fire = expr.next_fire(start).unwrap();
        assert_eq!(fire, Utc.with_ymd_and_hms(2026, 7, 28, 0, 15, 0).unwrap());
    }

    #[test]
    fn day_of_month_and_day_of_week_are_ored() {
        // 2026-07-28 is a Tuesday; 2026-07-27 is the closest preceding Monday.
        let expr = CronExpression::parse("0 12 1 * MON").unwrap();
        let start = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let fire = expr.next_fire(start).unwrap();
        // Next Monday noon comes before the 1st of next month.
        assert_eq!(fire.weekday().num_days_from_sunday(), 1);
        assert_eq!(fire.hour(), 12);
        assert_eq!(fire.minute(), 0);
    }

    #[test]
    fn out_of_range_minute_is_syntax_error() {
        assert!(matches!(
            CronExpression::parse("60 * * * *"),
            Err(CronError::Syntax(_))
        ));
    }

    #[test]
    fn zero_step_is_syntax_error() {
        assert!(matches!(
            CronExpression::parse("*/0 * * * *"),
            Err(CronError::Syntax(_))
        ));
    }
}
