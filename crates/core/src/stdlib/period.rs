//! `ds.period` — ISO-8601 period and duration strings.

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::{as_int, as_obj, as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("between", &["datetimeOne", "datetimeTwo"], |_, args| {
            expect_arity("between", args, 2)?;
            let start = super::datetime::parse_iso(&as_str(&args[0])?)?.date_naive();
            let end = super::datetime::parse_iso(&as_str(&args[1])?)?.date_naive();
            let (years, months, days) = calendar_between(start, end)?;
            Ok(Value::string(render_period(years, months, days)))
        }),
        Function::native("years", &["num"], |_, args| {
            expect_arity("years", args, 1)?;
            Ok(Value::string(format!("P{}Y", as_int(&args[0])?)))
        }),
        Function::native("months", &["num"], |_, args| {
            expect_arity("months", args, 1)?;
            Ok(Value::string(format!("P{}M", as_int(&args[0])?)))
        }),
        Function::native("days", &["num"], |_, args| {
            expect_arity("days", args, 1)?;
            Ok(Value::string(format!("P{}D", as_int(&args[0])?)))
        }),
        Function::native("hours", &["num"], |_, args| {
            expect_arity("hours", args, 1)?;
            Ok(Value::string(format!("PT{}H", as_int(&args[0])?)))
        }),
        Function::native("minutes", &["num"], |_, args| {
            expect_arity("minutes", args, 1)?;
            Ok(Value::string(format!("PT{}M", as_int(&args[0])?)))
        }),
        Function::native("seconds", &["num"], |_, args| {
            expect_arity("seconds", args, 1)?;
            Ok(Value::string(format!("PT{}S", as_int(&args[0])?)))
        }),
        Function::native("duration", &["obj"], |_, args| {
            expect_arity("duration", args, 1)?;
            let obj = as_obj(&args[0])?;
            let part = |name: &str| -> Result<i64> {
                match obj.get_visible(name) {
                    Some(cell) => as_int(&cell.force()?),
                    None => Ok(0),
                }
            };
            let total = part("days")? * 86_400
                + part("hours")? * 3_600
                + part("minutes")? * 60
                + part("seconds")?;
            Ok(Value::string(render_duration(total)))
        }),
        Function::native("period", &["obj"], |_, args| {
            expect_arity("period", args, 1)?;
            let obj = as_obj(&args[0])?;
            let part = |name: &str| -> Result<i64> {
                match obj.get_visible(name) {
                    Some(cell) => as_int(&cell.force()?),
                    None => Ok(0),
                }
            };
            Ok(Value::string(render_period(
                part("years")?,
                part("months")?,
                part("days")?,
            )))
        }),
    ]
}

/// Parsed `PnYnMnDTnHnMnS` components. `time_based` records whether the
/// string carried a `T` section, which selects duration semantics in
/// `datetime.plus`/`minus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PeriodSpec {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub time_based: bool,
}

impl PeriodSpec {
    pub(crate) fn negated(mut self) -> Self {
        self.years = -self.years;
        self.months = -self.months;
        self.days = -self.days;
        self.hours = -self.hours;
        self.minutes = -self.minutes;
        self.seconds = -self.seconds;
        self
    }

    pub(crate) fn total_seconds(&self) -> i64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

pub(crate) fn parse_period(input: &str) -> Result<PeriodSpec> {
    let bad = || Error::Domain(format!("Could not parse period: {input}"));
    let (negate_all, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let rest = rest.strip_prefix('P').ok_or_else(bad)?;

    let mut spec = PeriodSpec::default();
    let mut in_time = false;
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => {
                in_time = true;
                spec.time_based = true;
            }
            '0'..='9' | '-' | '+' => number.push(c),
            unit => {
                let n: i64 = number.parse().map_err(|_| bad())?;
                number.clear();
                match (in_time, unit) {
                    (false, 'Y') => spec.years = n,
                    (false, 'M') => spec.months = n,
                    (false, 'D') => spec.days = n,
                    (true, 'H') => spec.hours = n,
                    (true, 'M') => spec.minutes = n,
                    (true, 'S') => spec.seconds = n,
                    _ => return Err(bad()),
                }
            }
        }
    }
    if !number.is_empty() {
        return Err(bad());
    }
    if negate_all {
        spec = spec.negated();
    }
    Ok(spec)
}

pub(crate) fn add_months_to_date(date: NaiveDate, months: i64) -> Result<NaiveDate> {
    let out = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new((-months) as u32))
    };
    out.ok_or_else(|| Error::Domain(format!("Date out of range: {date} {months:+} months")))
}

/// Calendar difference: whole months first, then leftover days, every
/// component carrying the sign of the interval.
fn calendar_between(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64, i64)> {
    let mut months = i64::from(end.year() - start.year()) * 12
        + i64::from(end.month() as i32 - start.month() as i32);
    if end >= start {
        while add_months_to_date(start, months)? > end {
            months -= 1;
        }
    } else {
        while add_months_to_date(start, months)? < end {
            months += 1;
        }
    }
    let days = (end - add_months_to_date(start, months)?).num_days();
    Ok((months / 12, months % 12, days))
}

pub(crate) fn render_period(years: i64, months: i64, days: i64) -> String {
    if years == 0 && months == 0 && days == 0 {
        return "P0D".to_string();
    }
    let mut out = String::from("P");
    if years != 0 {
        out.push_str(&format!("{years}Y"));
    }
    if months != 0 {
        out.push_str(&format!("{months}M"));
    }
    if days != 0 {
        out.push_str(&format!("{days}D"));
    }
    out
}

fn render_duration(total_seconds: i64) -> String {
    if total_seconds == 0 {
        return "PT0S".to_string();
    }
    let hours = total_seconds / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    let mut out = String::from("PT");
    if hours != 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes != 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds != 0 {
        out.push_str(&format!("{seconds}S"));
    }
    out
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
    fn test_between_calendar_period() {
        let out = call(
            "between",
            &[
                Value::string("2019-09-20T18:53:41Z"),
                Value::string("2019-12-22T18:53:41Z"),
            ],
        )
        .unwrap();
        assert_eq!(s(&out), "P3M2D");
    }

    #[test]
    fn test_between_can_be_negative() {
        let out = call(
            "between",
            &[
                Value::string("2020-01-10T00:00:00Z"),
                Value::string("2019-12-28T00:00:00Z"),
            ],
        )
        .unwrap();
        assert_eq!(s(&out), "P-13D");
    }

    #[test]
    fn test_duration_accumulates_and_normalizes() {
        let obj = Value::from_json(serde_json::json!({"days": 1, "hours": 2, "minutes": 3}));
        assert_eq!(s(&call("duration", &[obj]).unwrap()), "PT26H3M");
        let obj = Value::from_json(serde_json::json!({"seconds": 0}));
        assert_eq!(s(&call("duration", &[obj]).unwrap()), "PT0S");
    }

    #[test]
    fn test_period_accumulates() {
        let obj = Value::from_json(serde_json::json!({"years": 1, "days": 3}));
        assert_eq!(s(&call("period", &[obj]).unwrap()), "P1Y3D");
    }

    #[test]
    fn test_single_unit_helpers() {
        assert_eq!(s(&call("days", &[Value::Num(4.0)]).unwrap()), "P4D");
        assert_eq!(s(&call("hours", &[Value::Num(4.0)]).unwrap()), "PT4H");
        assert_eq!(s(&call("years", &[Value::Num(-2.0)]).unwrap()), "P-2Y");
    }

    #[test]
    fn test_parse_period_components() {
        let spec = parse_period("P1Y2M3D").unwrap();
        assert_eq!((spec.years, spec.months, spec.days), (1, 2, 3));
        assert!(!spec.time_based);

        let spec = parse_period("PT1H30M").unwrap();
        assert!(spec.time_based);
        assert_eq!(spec.total_seconds(), 5_400);

        let spec = parse_period("-P1D").unwrap();
        assert_eq!(spec.days, -1);

        assert!(parse_period("1H").is_err());
        assert!(parse_period("P1W2").is_err());
    }
}
