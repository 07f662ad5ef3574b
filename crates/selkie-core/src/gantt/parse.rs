//! Gantt chart parser.
//!
//! Line-oriented like the flowchart side: directives and unknown lines pass
//! through untouched, every `label : token, token, ...` line becomes a task,
//! and `%% key: value` comment lines directly below a task attach metadata
//! to it instead of starting a new one.

use super::model::{GanttModel, GanttTask};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date regex"))
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([dwmy])$").expect("static duration regex"))
}

pub fn parse_gantt(code: &str) -> GanttModel {
    let fm = crate::frontmatter::scan(code);
    let mut model = GanttModel {
        title: fm.title.clone(),
        ..GanttModel::default()
    };
    let mut section: Option<String> = None;
    // Index of the task metadata comments currently attach to.
    let mut last_task: Option<usize> = None;

    for (idx, raw) in code.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("%%") {
            if let Some((key, value)) = rest.trim().split_once(':') {
                if let Some(task_idx) = last_task {
                    if attach_metadata(&mut model.tasks[task_idx], key.trim(), value.trim()) {
                        continue;
                    }
                }
            }
            // Plain comment; does not break task/metadata adjacency.
            continue;
        }

        if line == "gantt" {
            continue;
        }
        if let Some(rest) = directive_arg(line, "title") {
            model.title = Some(rest.to_string());
            last_task = None;
            continue;
        }
        if let Some(rest) = directive_arg(line, "section") {
            section = Some(rest.to_string());
            model.sections.push(rest.to_string());
            last_task = None;
            continue;
        }
        if let Some(rest) = directive_arg(line, "dateFormat") {
            model.date_format = Some(rest.to_string());
            last_task = None;
            continue;
        }
        if let Some(rest) = directive_arg(line, "axisFormat") {
            model.axis_format = Some(rest.to_string());
            last_task = None;
            continue;
        }
        if let Some(rest) = directive_arg(line, "excludes") {
            model
                .excludes
                .extend(rest.split([',', ' ']).filter(|s| !s.is_empty()).map(str::to_string));
            last_task = None;
            continue;
        }
        if let Some(rest) = directive_arg(line, "todayMarker") {
            model.today_marker = Some(rest.to_string());
            last_task = None;
            continue;
        }
        if directive_arg(line, "tickInterval").is_some()
            || directive_arg(line, "weekday").is_some()
            || directive_arg(line, "inclusiveEndDates").is_some()
        {
            last_task = None;
            continue;
        }

        if let Some(task) = parse_task_line(raw, idx, section.as_deref()) {
            model.tasks.push(task);
            last_task = Some(model.tasks.len() - 1);
        } else {
            last_task = None;
        }
    }

    debug!(tasks = model.tasks.len(), "parsed gantt");
    model
}

fn attach_metadata(task: &mut GanttTask, key: &str, value: &str) -> bool {
    match key {
        "assignee" => task.assignee = Some(value.to_string()),
        "progress" => {
            let value = value.trim_end_matches('%');
            task.progress = value.parse::<u16>().ok().map(|p| p.min(100) as u8);
        }
        "link" => task.link = Some(value.to_string()),
        "note" => task.notes.push(value.to_string()),
        _ => return false,
    }
    true
}

fn directive_arg<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        _ => None,
    }
}

/// `label : done, crit, t1, 2026-01-01, 3d`. Returns `None` for lines with
/// no data colon.
fn parse_task_line(raw: &str, line_idx: usize, section: Option<&str>) -> Option<GanttTask> {
    let colon = raw.find(':')?;
    let label = raw[..colon].trim();
    if label.is_empty() {
        return None;
    }

    let mut task = GanttTask {
        label: label.to_string(),
        section: section.map(str::to_string),
        source_line: line_idx,
        ..GanttTask::default()
    };

    let mut leading = true;
    let mut prev_was_date = false;
    let tokens: Vec<(String, usize, usize)> = split_data_tokens(raw, colon + 1);
    let count = tokens.len();
    for (pos, (token, start, end)) in tokens.into_iter().enumerate() {
        let is_status = matches!(token.as_str(), "done" | "active" | "crit" | "milestone");
        if leading && is_status {
            match token.as_str() {
                "done" => task.done = true,
                "active" => task.active = true,
                "crit" => task.crit = true,
                "milestone" => task.milestone = true,
                _ => unreachable!(),
            }
            continue;
        }
        leading = false;

        if let Some(rest) = token.strip_prefix("after ") {
            task.after_deps
                .extend(rest.split_whitespace().map(str::to_lowercase));
            prev_was_date = false;
            continue;
        }
        if let Some(rest) = token.strip_prefix("until ") {
            task.until_dep = rest.split_whitespace().next().map(str::to_lowercase);
            prev_was_date = false;
            continue;
        }
        if task.start_date.is_none() && date_re().is_match(&token) {
            task.start_date = NaiveDate::parse_from_str(&token, "%Y-%m-%d").ok();
            task.date_span = Some(start..end);
            prev_was_date = true;
            continue;
        }
        if task.duration_days.is_none() {
            if let Some(caps) = duration_re().captures(&token) {
                // Strictly a duration only right after the date, but `after
                // x, 3d` is the common dependency spelling, so any anchored
                // task accepts one.
                let anchored =
                    prev_was_date || task.start_date.is_some() || !task.after_deps.is_empty();
                if anchored {
                    let Ok(n) = caps[1].parse::<i64>() else {
                        continue;
                    };
                    task.duration_days = Some(match &caps[2] {
                        "d" => n,
                        "w" => n * 7,
                        "m" => n * 30,
                        "y" => n * 365,
                        _ => unreachable!(),
                    });
                    prev_was_date = false;
                    continue;
                }
            }
        }
        prev_was_date = false;
        // A leading free token followed by more data is the short id.
        if task.id_token.is_none() && pos + 1 < count {
            task.id_token = Some(token);
        }
    }

    Some(task)
}

/// Comma-separated data tokens with their byte spans in the raw line.
fn split_data_tokens(raw: &str, from: usize) -> Vec<(String, usize, usize)> {
    let mut out = Vec::new();
    let mut start = from;
    let data = &raw[from..];
    for (off, _) in data.match_indices(',') {
        push_token(raw, start, from + off, &mut out);
        start = from + off + 1;
    }
    push_token(raw, start, raw.len(), &mut out);
    out
}

fn push_token(raw: &str, start: usize, end: usize, out: &mut Vec<(String, usize, usize)>) {
    let slice = &raw[start..end];
    let token = slice.trim();
    if token.is_empty() {
        return;
    }
    let lead = slice.len() - slice.trim_start().len();
    out.push((token.to_string(), start + lead, start + lead + token.len()));
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "gantt\n    dateFormat YYYY-MM-DD\n    title Release\n    section Build\n    Design : des, 2026-01-01, 2d\n    %% assignee: Ana\n    %% progress: 40%\n    Implement : impl, after des, 3d\n    section Ship\n    Freeze : milestone, frz, after impl\n";

    #[test]
    fn parses_directives_sections_and_tasks() {
        let model = parse_gantt(CHART);
        assert_eq!(model.title.as_deref(), Some("Release"));
        assert_eq!(model.date_format.as_deref(), Some("YYYY-MM-DD"));
        assert_eq!(model.sections, vec!["Build", "Ship"]);
        assert_eq!(model.tasks.len(), 3);
        assert_eq!(model.tasks[2].section.as_deref(), Some("Ship"));
    }

    #[test]
    fn task_tokens_classify_in_order() {
        let model = parse_gantt(CHART);
        let des = model.task("des").unwrap();
        assert_eq!(des.label, "Design");
        assert_eq!(
            des.start_date,
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
        assert_eq!(des.duration_days, Some(2));

        let imp = model.task("impl").unwrap();
        assert_eq!(imp.after_deps, vec!["des"]);
        assert_eq!(imp.duration_days, Some(3));
        assert!(imp.start_date.is_none());
    }

    #[test]
    fn metadata_comments_attach_to_preceding_task() {
        let model = parse_gantt(CHART);
        let des = model.task("des").unwrap();
        assert_eq!(des.assignee.as_deref(), Some("Ana"));
        assert_eq!(des.progress, Some(40));
        assert!(model.task("impl").unwrap().assignee.is_none());
    }

    #[test]
    fn milestone_flag_and_status_keywords() {
        let model = parse_gantt("gantt\n    A : done, active, crit, a1, 2026-02-01, 1d\n");
        let a = model.task("a1").unwrap();
        assert!(a.done && a.active && a.crit && !a.milestone);

        let model = parse_gantt(CHART);
        assert!(model.task("frz").unwrap().milestone);
    }

    #[test]
    fn duration_units_convert_to_days() {
        let model =
            parse_gantt("gantt\n    A : a, 2026-01-01, 2w\n    B : b, 2026-01-01, 1m\n    C : c, 2026-01-01, 1y\n");
        assert_eq!(model.task("a").unwrap().duration_days, Some(14));
        assert_eq!(model.task("b").unwrap().duration_days, Some(30));
        assert_eq!(model.task("c").unwrap().duration_days, Some(365));
    }

    #[test]
    fn date_span_covers_the_date_token() {
        let model = parse_gantt("gantt\n    Design : des, 2026-01-01, 2d\n");
        let task = &model.tasks[0];
        let line = "    Design : des, 2026-01-01, 2d";
        let span = task.date_span.clone().unwrap();
        assert_eq!(&line[span], "2026-01-01");
    }

    #[test]
    fn unscheduleable_task_is_kept() {
        let model = parse_gantt("gantt\n    Orphan : orp\n");
        assert_eq!(model.tasks.len(), 1);
        let t = &model.tasks[0];
        assert!(t.start_date.is_none() && t.after_deps.is_empty());
    }

    #[test]
    fn until_reference_is_recorded() {
        let model = parse_gantt("gantt\n    A : a, 2026-01-01, 5d\n    B : b, 2026-01-02, until a\n");
        assert_eq!(model.task("b").unwrap().until_dep.as_deref(), Some("a"));
    }

    #[test]
    fn key_falls_back_to_label() {
        let model = parse_gantt("gantt\n    Design phase : 2026-01-01, 2d\n");
        assert_eq!(model.tasks[0].key(), "design phase");
        assert!(model.task("Design Phase").is_some());
    }
}
