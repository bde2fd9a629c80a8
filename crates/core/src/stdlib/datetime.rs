//! `ds.datetime` — datetimes as `ISO_OFFSET_DATE_TIME` strings.
//!
//! Every function parses, operates, and re-serializes to the same
//! format: `YYYY-MM-DDTHH:MM:SS[.fraction](Z|±HH:MM)`, the fraction
//! printed only when non-zero.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat,
    TimeZone, Timelike, Utc,
};

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::period::{parse_period, PeriodSpec};
use super::{as_int, as_obj, as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("now", &[], |_, args| {
            expect_arity("now", args, 0)?;
            Ok(Value::string(render_utc(Utc::now())))
        }),
        Function::native("today", &[], |_, args| {
            expect_arity("today", args, 0)?;
            Ok(Value::string(render_utc(midnight_utc(Utc::now(), 0)?)))
        }),
        Function::native("tomorrow", &[], |_, args| {
            expect_arity("tomorrow", args, 0)?;
            Ok(Value::string(render_utc(midnight_utc(Utc::now(), 1)?)))
        }),
        Function::native("yesterday", &[], |_, args| {
            expect_arity("yesterday", args, 0)?;
            Ok(Value::string(render_utc(midnight_utc(Utc::now(), -1)?)))
        }),
        Function::native("atBeginningOfDay", &["datetime"], |_, args| {
            expect_arity("atBeginningOfDay", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            Ok(Value::string(render(&at_midnight(&dt, dt.date_naive())?)))
        }),
        Function::native("atBeginningOfHour", &["datetime"], |_, args| {
            expect_arity("atBeginningOfHour", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let naive = dt
                .date_naive()
                .and_hms_opt(dt.hour(), 0, 0)
                .ok_or_else(|| Error::Domain("Invalid time components".to_string()))?;
            Ok(Value::string(render(&rebuild(&dt, naive)?)))
        }),
        Function::native("atBeginningOfMonth", &["datetime"], |_, args| {
            expect_arity("atBeginningOfMonth", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let first = dt
                .date_naive()
                .with_day(1)
                .ok_or_else(|| Error::Domain("Invalid date components".to_string()))?;
            Ok(Value::string(render(&at_midnight(&dt, first)?)))
        }),
        Function::native("atBeginningOfWeek", &["datetime"], |_, args| {
            expect_arity("atBeginningOfWeek", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            // Monday is day 1; Sunday counts as 7 and rolls back a full
            // week.
            let back = i64::from(dt.weekday().number_from_monday());
            let date = dt.date_naive() - Duration::days(back);
            Ok(Value::string(render(&at_midnight(&dt, date)?)))
        }),
        Function::native("atBeginningOfYear", &["datetime"], |_, args| {
            expect_arity("atBeginningOfYear", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let first = NaiveDate::from_ymd_opt(dt.year(), 1, 1)
                .ok_or_else(|| Error::Domain("Invalid date components".to_string()))?;
            Ok(Value::string(render(&at_midnight(&dt, first)?)))
        }),
        Function::native("changeTimeZone", &["datetime", "timezone"], |_, args| {
            expect_arity("changeTimeZone", args, 2)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let zone = as_str(&args[1])?;
            let tz = chrono_tz::Tz::from_str(&zone)
                .map_err(|_| Error::Domain(format!("Unknown time zone: {zone}")))?;
            Ok(Value::string(render(&dt.with_timezone(&tz).fixed_offset())))
        }),
        Function::native("compare", &["datetime1", "datetime2"], |_, args| {
            expect_arity("compare", args, 2)?;
            let a = parse_iso(&as_str(&args[0])?)?;
            let b = parse_iso(&as_str(&args[1])?)?;
            Ok(Value::Num(match a.cmp(&b) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            }))
        }),
        Function::native("date", &["obj"], |_, args| {
            expect_arity("date", args, 1)?;
            let obj = as_obj(&args[0])?;
            let part = |name: &str, default: i64| -> Result<i64> {
                match obj.get_visible(name) {
                    Some(cell) => as_int(&cell.force()?),
                    None => Ok(default),
                }
            };
            let zone = match obj.get_visible("timezone") {
                Some(cell) => as_str(&cell.force()?)?.to_string(),
                None => "Z".to_string(),
            };
            let offset = parse_zone(&zone)?;
            let (hour, minute, second) = (
                part("hour", 0)? as u32,
                part("minute", 0)? as u32,
                part("second", 0)? as u32,
            );
            let naive = NaiveDate::from_ymd_opt(
                part("year", 0)? as i32,
                part("month", 1)? as u32,
                part("day", 1)? as u32,
            )
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .ok_or_else(|| Error::Domain("Invalid date components".to_string()))?;
            let dt = offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| Error::Domain("Invalid date components".to_string()))?;
            Ok(Value::string(render(&dt)))
        }),
        Function::native("daysBetween", &["datetime1", "datetime2"], |_, args| {
            expect_arity("daysBetween", args, 2)?;
            let a = parse_iso(&as_str(&args[0])?)?;
            let b = parse_iso(&as_str(&args[1])?)?;
            Ok(Value::Num((a - b).num_days().abs() as f64))
        }),
        Function::native("format", &["datetime", "outputFormat"], |_, args| {
            expect_arity("format", args, 2)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let pattern = as_str(&args[1])?;
            let mut out = String::new();
            write!(out, "{}", dt.format(&pattern))
                .map_err(|_| Error::Domain(format!("Invalid datetime format: {pattern}")))?;
            Ok(Value::string(out))
        }),
        Function::native("isLeapYear", &["datetime"], |_, args| {
            expect_arity("isLeapYear", args, 1)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            Ok(Value::Bool(
                NaiveDate::from_ymd_opt(dt.year(), 2, 29).is_some(),
            ))
        }),
        Function::native("parse", &["datetime", "inputFormat"], |_, args| {
            expect_arity("parse", args, 2)?;
            let pattern = as_str(&args[1])?;
            if pattern.eq_ignore_ascii_case("epoch") || pattern.eq_ignore_ascii_case("timestamp") {
                let seconds = match &args[0] {
                    Value::Num(n) => *n as i64,
                    Value::Str(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| Error::Domain(format!("Could not parse epoch: {s}")))?,
                    other => return Err(Error::type_mismatch("String or Number", other)),
                };
                let dt = Utc
                    .timestamp_opt(seconds, 0)
                    .single()
                    .ok_or_else(|| Error::Domain(format!("Epoch out of range: {seconds}")))?;
                return Ok(Value::string(render_utc(dt)));
            }
            let input = as_str(&args[0])?;
            Ok(Value::string(render(&parse_with_pattern(&input, &pattern)?)))
        }),
        Function::native("plus", &["datetime", "period"], |_, args| {
            expect_arity("plus", args, 2)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let spec = parse_period(&as_str(&args[1])?)?;
            Ok(Value::string(render(&shift(&dt, spec)?)))
        }),
        Function::native("minus", &["datetime", "period"], |_, args| {
            expect_arity("minus", args, 2)?;
            let dt = parse_iso(&as_str(&args[0])?)?;
            let spec = parse_period(&as_str(&args[1])?)?.negated();
            Ok(Value::string(render(&shift(&dt, spec)?)))
        }),
    ]
}

/// Parse an `ISO_OFFSET_DATE_TIME` string.
pub(crate) fn parse_iso(input: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(input)
        .map_err(|e| Error::Domain(format!("Could not parse datetime '{input}': {e}")))
}

/// Serialize back to the canonical format: `Z` for UTC, fraction only
/// when non-zero.
pub(crate) fn render(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn render_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn rebuild(dt: &DateTime<FixedOffset>, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
    dt.offset()
        .fix()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::Domain("Invalid time components".to_string()))
}

fn at_midnight(dt: &DateTime<FixedOffset>, date: NaiveDate) -> Result<DateTime<FixedOffset>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Domain("Invalid time components".to_string()))?;
    rebuild(dt, naive)
}

fn midnight_utc(now: DateTime<Utc>, day_offset: i64) -> Result<DateTime<Utc>> {
    let date = now.date_naive() + Duration::days(day_offset);
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Domain("Invalid time components".to_string()))?;
    Ok(naive.and_utc())
}

fn parse_zone(zone: &str) -> Result<FixedOffset> {
    if zone == "Z" || zone.eq_ignore_ascii_case("UTC") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| Error::Domain("Invalid time zone offset".to_string()));
    }
    if let Some((sign, rest)) = zone
        .strip_prefix('+')
        .map(|r| (1, r))
        .or_else(|| zone.strip_prefix('-').map(|r| (-1, r)))
    {
        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| Error::Domain(format!("Unknown time zone: {zone}")))?;
        let seconds = hours
            .parse::<i32>()
            .ok()
            .zip(minutes.parse::<i32>().ok())
            .map(|(h, m)| h * 3_600 + m * 60)
            .ok_or_else(|| Error::Domain(format!("Unknown time zone: {zone}")))?;
        return FixedOffset::east_opt(sign * seconds)
            .ok_or_else(|| Error::Domain(format!("Unknown time zone: {zone}")));
    }
    Err(Error::Domain(format!("Unknown time zone: {zone}")))
}

/// Pattern parse with zone defaulting: patterns without zone
/// information land on `Z`; patterns without a time component land on
/// midnight.
fn parse_with_pattern(input: &str, pattern: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_str(input, pattern) {
        return Ok(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
        return Ok(naive.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, pattern) {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::Domain("Invalid time components".to_string()))?;
        return Ok(naive.and_utc().fixed_offset());
    }
    Err(Error::Domain(format!(
        "Could not parse datetime '{input}' with format '{pattern}'"
    )))
}

fn shift(dt: &DateTime<FixedOffset>, spec: PeriodSpec) -> Result<DateTime<FixedOffset>> {
    if spec.time_based {
        if spec.years != 0 || spec.months != 0 {
            return Err(Error::Domain(
                "Durations cannot carry year or month components".to_string(),
            ));
        }
        return Ok(*dt + Duration::seconds(spec.total_seconds()));
    }
    let months = spec.years * 12 + spec.months;
    let date = super::period::add_months_to_date(dt.date_naive(), months)?
        + Duration::days(spec.days);
    rebuild(dt, date.and_time(dt.time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{apply, test_context};
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> Result<Value> {
        let ctx = test_context();
        let func = entries()
            .into_iter()
            .find(|f| f.name() == Some(name))
            .unwrap_or_else(|| panic!("missing {name}"));
        apply(&ctx, &func, args)
    }

    fn s(v: &Value) -> String {
        match v {
            Value::Str(s) => s.to_string(),
            other => panic!("Expected string, got {other:?}"),
        }
    }

    #[test]
    fn test_at_beginning_of_week_sunday_rollback() {
        let out = call("atBeginningOfWeek", &[Value::string("2020-12-31T23:19:35Z")]).unwrap();
        assert_eq!(s(&out), "2020-12-27T00:00:00Z");
        // a Sunday rolls back a full week
        let out = call("atBeginningOfWeek", &[Value::string("2020-12-27T10:00:00Z")]).unwrap();
        assert_eq!(s(&out), "2020-12-20T00:00:00Z");
    }

    #[test]
    fn test_at_beginning_family() {
        let input = Value::string("2020-07-04T21:03:05Z");
        assert_eq!(
            s(&call("atBeginningOfDay", &[input.clone()]).unwrap()),
            "2020-07-04T00:00:00Z"
        );
        assert_eq!(
            s(&call("atBeginningOfHour", &[input.clone()]).unwrap()),
            "2020-07-04T21:00:00Z"
        );
        assert_eq!(
            s(&call("atBeginningOfMonth", &[input.clone()]).unwrap()),
            "2020-07-01T00:00:00Z"
        );
        assert_eq!(
            s(&call("atBeginningOfYear", &[input]).unwrap()),
            "2020-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_offset_preserved_through_operations() {
        let out = call("atBeginningOfDay", &[Value::string("2020-07-04T21:03:05-05:00")]).unwrap();
        assert_eq!(s(&out), "2020-07-04T00:00:00-05:00");
    }

    #[test]
    fn test_plus_minus_dispatch_on_t() {
        let input = Value::string("2019-09-18T18:53:41Z");
        let out = call("plus", &[input.clone(), Value::string("P2D")]).unwrap();
        assert_eq!(s(&out), "2019-09-20T18:53:41Z");
        let out = call("plus", &[input.clone(), Value::string("PT2H")]).unwrap();
        assert_eq!(s(&out), "2019-09-18T20:53:41Z");
        let out = call("minus", &[input.clone(), Value::string("P1M")]).unwrap();
        assert_eq!(s(&out), "2019-08-18T18:53:41Z");
        let out = call("minus", &[input, Value::string("PT30M")]).unwrap();
        assert_eq!(s(&out), "2019-09-18T18:23:41Z");
    }

    #[test]
    fn test_calendar_plus_clamps_month_end() {
        let out = call(
            "plus",
            &[Value::string("2020-01-31T00:00:00Z"), Value::string("P1M")],
        )
        .unwrap();
        assert_eq!(s(&out), "2020-02-29T00:00:00Z");
    }

    #[test]
    fn test_parse_epoch_and_patterns() {
        let out = call("parse", &[Value::Num(1_577_836_800.0), Value::string("epoch")]).unwrap();
        assert_eq!(s(&out), "2020-01-01T00:00:00Z");
        let out = call(
            "parse",
            &[Value::string("1577836800"), Value::string("TIMESTAMP")],
        )
        .unwrap();
        assert_eq!(s(&out), "2020-01-01T00:00:00Z");
        // patterns without zone information default to Z
        let out = call(
            "parse",
            &[Value::string("2020/01/06 21:15:14"), Value::string("%Y/%m/%d %H:%M:%S")],
        )
        .unwrap();
        assert_eq!(s(&out), "2020-01-06T21:15:14Z");
        let out = call(
            "parse",
            &[Value::string("2020-01-06"), Value::string("%Y-%m-%d")],
        )
        .unwrap();
        assert_eq!(s(&out), "2020-01-06T00:00:00Z");
    }

    #[test]
    fn test_compare_and_days_between() {
        let a = Value::string("2019-09-20T18:53:41Z");
        let b = Value::string("2019-09-14T18:53:41Z");
        let out = call("compare", &[a.clone(), b.clone()]).unwrap();
        assert!(matches!(out, Value::Num(n) if n == 1.0));
        let out = call("daysBetween", &[a.clone(), b.clone()]).unwrap();
        assert!(matches!(out, Value::Num(n) if n == 6.0));
        // absolute difference regardless of order
        let out = call("daysBetween", &[b, a]).unwrap();
        assert!(matches!(out, Value::Num(n) if n == 6.0));
    }

    #[test]
    fn test_change_time_zone() {
        let out = call(
            "changeTimeZone",
            &[
                Value::string("2020-12-31T22:00:00Z"),
                Value::string("America/New_York"),
            ],
        )
        .unwrap();
        assert_eq!(s(&out), "2020-12-31T17:00:00-05:00");
    }

    #[test]
    fn test_is_leap_year() {
        let out = call("isLeapYear", &[Value::string("2020-01-01T00:00:00Z")]).unwrap();
        assert!(matches!(out, Value::Bool(true)));
        let out = call("isLeapYear", &[Value::string("2100-01-01T00:00:00Z")]).unwrap();
        assert!(matches!(out, Value::Bool(false)));
    }

    #[test]
    fn test_date_from_parts() {
        let obj = Value::from_json(serde_json::json!({
            "year": 2021, "month": 3, "day": 4, "hour": 5, "minute": 6, "second": 7,
            "timezone": "-08:00"
        }));
        let out = call("date", &[obj]).unwrap();
        assert_eq!(s(&out), "2021-03-04T05:06:07-08:00");
    }

    #[test]
    fn test_fraction_printed_only_when_nonzero() {
        let out = call("plus", &[Value::string("2020-01-01T00:00:00.500Z"), Value::string("PT0S")])
            .unwrap();
        assert_eq!(s(&out), "2020-01-01T00:00:00.500Z");
    }
}
