use std::collections::BTreeSet;

use crate::error::CronError;

/// The parsed set of values a single cron field accepts, plus whether that
/// set covers the field's full natural range, which the day-of-month/
/// day-of-week OR rule needs to distinguish a genuine wildcard from an
/// explicit restriction that happens to cover every value.
pub(crate) struct FieldSpec {
    pub values: BTreeSet<u32>,
    pub is_wildcard: bool,
}

pub(crate) fn parse_field(
    raw: &str,
    min: u32,
    max: u32,
    names: &[(&str, u32)],
    dow_alias: bool,
) -> Result<FieldSpec, CronError> {
    if raw.is_empty() {
        return Err(CronError::Syntax("empty field".to_string()));
    }
    let mut values = BTreeSet::new();
    for item in raw.split(',') {
        parse_item(item, min, max, names, dow_alias, &mut values)?;
    }
    if values.is_empty() {
        return Err(CronError::Syntax(format!("field yields no values: {raw}")));
    }
    let full_range: BTreeSet<u32> = (min..=max).map(|v| normalize(v, dow_alias)).collect();
    let is_wildcard = values == full_range;
    Ok(FieldSpec { values, is_wildcard })
}

fn resolve_name(token: &str, names: &[(&str, u32)]) -> Option<u32> {
    names
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, value)| *value)
}

fn parse_number(token: &str, min: u32, max: u32, names: &[(&str, u32)]) -> Result<u32, CronError> {
    if let Some(value) = resolve_name(token, names) {
        return Ok(value);
    }
    let value: u32 = token
        .parse()
        .map_err(|_| CronError::Syntax(format!("not a number: {token}")))?;
    if value < min || value > max {
        return Err(CronError::Syntax(format!(
            "value {value} out of range {min}-{max}"
        )));
    }
    Ok(value)
}

fn normalize(value: u32, dow_alias: bool) -> u32 {
    if dow_alias && value == 7 {
        0
    } else {
        value
    }
}

fn parse_item(
    item: &str,
    min: u32,
    max: u32,
    names: &[(&str, u32)],
    dow_alias: bool,
    out: &mut BTreeSet<u32>,
) -> Result<(), CronError> {
    if item.is_empty() {
        return Err(CronError::Syntax("empty list item".to_string()));
    }

    let (range_part, step) = match item.split_once('/') {
        Some((range, step)) => {
            let step: u32 = step
                .parse()
                .map_err(|_| CronError::Syntax(format!("bad step: {step}")))?;
            if step == 0 {
                return Err(CronError::Syntax("step cannot be zero".to_string()));
            }
            (range, Some(step))
        }
        None => (item, None),
    };

    if range_part == "*" {
        let mut value = min;
        let step = step.unwrap_or(1);
        while value <= max {
            out.insert(normalize(value, dow_alias));
            value += step;
        }
        return Ok(());
    }

    if let Some((start, end)) = range_part.split_once('-') {
        let start = parse_number(start, min, max, names)?;
        let end = parse_number(end, min, max, names)?;
        let step = step.unwrap_or(1);
        if start <= end {
            let mut value = start;
            while value <= end {
                out.insert(normalize(value, dow_alias));
                value += step;
            }
        } else {
            // Wrapping range: union of [start, max] and [min, end], stepped
            // continuously across the wrap point rather than restarting.
            let first_leg = max - start + 1;
            let total = first_leg + (end - min + 1);
            let mut i = 0;
            while i < total {
                let value = if i < first_leg {
                    start + i
                } else {
                    min + (i - first_leg)
                };
                out.insert(normalize(value, dow_alias));
                i += step;
            }
        }
        return Ok(());
    }

    let value = parse_number(range_part, min, max, names)?;
    match step {
        Some(step) => {
            let mut value = value;
            while value <= max {
                out.insert(normalize(value, dow_alias));
                value += step;
            }
        }
        None => {
            out.insert(normalize(value, dow_alias));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_covers_full_range() {
        let spec = parse_field("*", 0, 4, &[], false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([0, 1, 2, 3, 4]));
        assert!(spec.is_wildcard);
    }

    #[test]
    fn step_expands_from_start() {
        let spec = parse_field("*/15", 0, 59, &[], false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([0, 15, 30, 45]));
        assert!(!spec.is_wildcard);
    }

    #[test]
    fn list_and_range_combine() {
        let spec = parse_field("1,3,8-10", 0, 23, &[], false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([1, 3, 8, 9, 10]));
    }

    #[test]
    fn month_names_resolve() {
        let months = &[("JAN", 1), ("FEB", 2), ("DEC", 12)];
        let spec = parse_field("jan,dec", 1, 12, months, false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([1, 12]));
    }

    #[test]
    fn day_of_week_seven_aliases_to_zero() {
        let spec = parse_field("7", 0, 7, &[], true).unwrap();
        assert_eq!(spec.values, BTreeSet::from([0]));
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            parse_field("*/0", 0, 59, &[], false),
            Err(CronError::Syntax(_))
        ));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        assert!(matches!(
            parse_field("60", 0, 59, &[], false),
            Err(CronError::Syntax(_))
        ));
    }

    #[test]
    fn inverted_range_wraps() {
        let spec = parse_field("22-2", 0, 23, &[], false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([22, 23, 0, 1, 2]));
    }

    #[test]
    fn inverted_range_with_step_crosses_the_wrap_continuously() {
        let spec = parse_field("22-2/2", 0, 23, &[], false).unwrap();
        assert_eq!(spec.values, BTreeSet::from([22, 0, 2]));
    }

    #[test]
    fn explicit_range_covering_full_span_counts_as_wildcard() {
        let spec = parse_field("0-6", 0, 6, &[], false).unwrap();
        assert!(spec.is_wildcard);
    }
}
