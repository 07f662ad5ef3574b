//! Gantt task mutations. Same contract as the flowchart side: total, one
//! fresh parse per call, only the date token's span is rewritten.

use super::parse::parse_gantt;
use chrono::{Days, NaiveDate};
use tracing::debug;

/// Replaces the start date of the task matching `key`. No-op when the task
/// or its date token is absent.
pub fn set_task_start(code: &str, key: &str, date: NaiveDate) -> String {
    rewrite_date(code, key, |_| date)
}

/// Shifts the task's start date by a signed number of days.
pub fn shift_task(code: &str, key: &str, delta_days: i64) -> String {
    rewrite_date(code, key, |date| {
        let days = Days::new(delta_days.unsigned_abs());
        let shifted = if delta_days >= 0 {
            date.checked_add_days(days)
        } else {
            date.checked_sub_days(days)
        };
        shifted.unwrap_or(date)
    })
}

fn rewrite_date(code: &str, key: &str, new_date: impl Fn(NaiveDate) -> NaiveDate) -> String {
    let model = parse_gantt(code);
    let Some(task) = model.task(key) else {
        return code.to_string();
    };
    let (Some(span), Some(date)) = (task.date_span.clone(), task.start_date) else {
        return code.to_string();
    };

    let trailing_newline = code.ends_with('\n');
    let mut lines: Vec<String> = code.split('\n').map(str::to_string).collect();
    if trailing_newline {
        lines.pop();
    }
    let rendered = new_date(date).format("%Y-%m-%d").to_string();
    lines[task.source_line].replace_range(span, &rendered);
    debug!(key, date = %rendered, "rewrote task start");

    let mut out = lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "gantt\n    dateFormat YYYY-MM-DD\n    Design : des, 2026-01-01, 2d\n    Implement : impl, after des, 3d\n";

    #[test]
    fn set_task_start_rewrites_only_the_date_token() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let out = set_task_start(CHART, "des", date);
        assert_eq!(
            out,
            "gantt\n    dateFormat YYYY-MM-DD\n    Design : des, 2026-03-15, 2d\n    Implement : impl, after des, 3d\n"
        );
    }

    #[test]
    fn shift_task_moves_the_date_by_days() {
        let out = shift_task(CHART, "des", 10);
        assert!(out.contains("2026-01-11"));
        let back = shift_task(&out, "des", -10);
        assert_eq!(back, CHART);
    }

    #[test]
    fn missing_task_or_dateless_task_is_a_no_op() {
        assert_eq!(shift_task(CHART, "nope", 3), CHART);
        // `impl` is anchored by a dependency, not a date token.
        assert_eq!(shift_task(CHART, "impl", 3), CHART);
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(set_task_start(CHART, "impl", date), CHART);
    }
}
