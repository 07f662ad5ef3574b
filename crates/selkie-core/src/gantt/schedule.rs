//! Dependency graph and critical-path engine over parsed Gantt tasks.
//!
//! Cycles and date conflicts are diagnostics carried in the report, not
//! errors. The one hard error is an `after` chain with no anchored start
//! date anywhere upstream; guessing a default date would silently invent
//! a schedule, so that input is rejected.

use super::model::GanttTask;
use super::parse::parse_gantt;
use crate::error::{Error, Result};
use chrono::{Days, NaiveDate};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

/// Forward (dependency → dependents) and reverse adjacency over task keys.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: FxHashMap<String, Vec<String>>,
    reverse: FxHashMap<String, Vec<String>>,
    keys: Vec<String>,
}

impl DependencyGraph {
    pub fn build(tasks: &[GanttTask]) -> Self {
        let mut graph = DependencyGraph::default();
        for task in tasks {
            let key = task.key();
            if !graph.keys.contains(&key) {
                graph.keys.push(key.clone());
            }
            let upstream = task
                .after_deps
                .iter()
                .chain(task.until_dep.as_ref())
                .cloned();
            for dep in upstream {
                graph.forward.entry(dep.clone()).or_default().push(key.clone());
                graph.reverse.entry(key.clone()).or_default().push(dep);
            }
        }
        graph
    }

    pub fn dependents(&self, key: &str) -> &[String] {
        self.forward.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn dependencies(&self, key: &str) -> &[String] {
        self.reverse.get(key).map_or(&[], Vec::as_slice)
    }

    /// Three-color depth-first search; a back-edge into the gray stack
    /// reports the stack slice from the revisited key onward.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color: FxHashMap<&str, u8> = FxHashMap::default();
        let mut stack: Vec<&str> = Vec::new();
        let mut cycles = Vec::new();
        for key in &self.keys {
            if !color.contains_key(key.as_str()) {
                self.visit(key, &mut color, &mut stack, &mut cycles, GRAY, BLACK);
            }
        }
        cycles
    }

    fn visit<'a>(
        &'a self,
        key: &'a str,
        color: &mut FxHashMap<&'a str, u8>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
        gray: u8,
        black: u8,
    ) {
        color.insert(key, gray);
        stack.push(key);
        for next in self.dependents(key) {
            match color.get(next.as_str()) {
                Some(&c) if c == gray => {
                    let from = stack.iter().position(|k| *k == next).unwrap_or(0);
                    cycles.push(stack[from..].iter().map(|k| k.to_string()).collect());
                }
                Some(&c) if c == black => {}
                _ => self.visit(next, color, stack, cycles, gray, black),
            }
        }
        stack.pop();
        color.insert(key, black);
    }
}

/// A task with concrete start and finish dates (finish is exclusive:
/// `start + duration`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub key: String,
    pub label: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub duration_days: i64,
    pub milestone: bool,
}

/// One row of the critical-path analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub key: String,
    pub label: String,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub slack_days: i64,
    pub critical: bool,
    pub milestone: bool,
}

/// A task whose declared start precedes an upstream dependency's finish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub task: String,
    pub depends_on: String,
    pub overlap_days: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReport {
    pub title: Option<String>,
    pub cycles: Vec<Vec<String>>,
    pub entries: Vec<ScheduleEntry>,
    pub conflicts: Vec<Conflict>,
}

/// Tasks without an explicit duration run one day; milestones take none.
fn effective_duration(task: &GanttTask) -> i64 {
    task.duration_days
        .unwrap_or(if task.milestone { 0 } else { 1 })
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_days(Days::new(days.unsigned_abs()))
        .unwrap_or(date)
}

#[derive(Clone)]
enum Resolution {
    Dated(NaiveDate, NaiveDate),
    Cyclic,
    Unscheduled,
}

struct Resolver<'a> {
    by_key: FxHashMap<String, &'a GanttTask>,
    memo: FxHashMap<String, Resolution>,
    in_progress: FxHashSet<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, key: &str) -> Result<Resolution> {
        if let Some(hit) = self.memo.get(key) {
            return Ok(hit.clone());
        }
        if self.in_progress.contains(key) {
            return Ok(Resolution::Cyclic);
        }
        let Some(task) = self.by_key.get(key).copied() else {
            self.memo.insert(key.to_string(), Resolution::Unscheduled);
            return Ok(Resolution::Unscheduled);
        };
        self.in_progress.insert(key.to_string());
        let resolution = self.resolve_task(key, task)?;
        self.in_progress.remove(key);
        self.memo.insert(key.to_string(), resolution.clone());
        Ok(resolution)
    }

    fn resolve_task(&mut self, key: &str, task: &GanttTask) -> Result<Resolution> {
        let start = if let Some(date) = task.start_date {
            date
        } else if !task.after_deps.is_empty() {
            // Start at the latest upstream finish.
            let mut latest: Option<NaiveDate> = None;
            let mut cyclic = false;
            for dep in task.after_deps.clone() {
                match self.resolve(&dep)? {
                    Resolution::Dated(_, finish) => {
                        latest = Some(latest.map_or(finish, |l| l.max(finish)));
                    }
                    Resolution::Cyclic => cyclic = true,
                    Resolution::Unscheduled => {}
                }
            }
            match latest {
                Some(start) => start,
                None if cyclic => return Ok(Resolution::Cyclic),
                None => {
                    return Err(Error::UnanchoredTask {
                        key: key.to_string(),
                    })
                }
            }
        } else {
            return Ok(Resolution::Unscheduled);
        };

        let finish = if task.duration_days.is_some() {
            add_days(start, effective_duration(task))
        } else if let Some(until) = task.until_dep.clone() {
            // `until x` runs the task up to x's start.
            match self.resolve(&until)? {
                Resolution::Dated(until_start, _) if until_start > start => until_start,
                _ => add_days(start, effective_duration(task)),
            }
        } else {
            add_days(start, effective_duration(task))
        };
        Ok(Resolution::Dated(start, finish))
    }
}

/// Resolves `after` chains to concrete dates. Tasks with neither a date nor
/// any resolvable dependency path are left out; a chain that is acyclic yet
/// anchored nowhere is an input error.
pub fn resolve_schedule(tasks: &[GanttTask]) -> Result<Vec<ScheduledTask>> {
    let mut by_key: FxHashMap<String, &GanttTask> = FxHashMap::default();
    for task in tasks {
        by_key.entry(task.key()).or_insert(task);
    }
    let mut resolver = Resolver {
        by_key,
        memo: FxHashMap::default(),
        in_progress: FxHashSet::default(),
    };

    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    for task in tasks {
        let key = task.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        if let Resolution::Dated(start, finish) = resolver.resolve(&key)? {
            out.push(ScheduledTask {
                key,
                label: task.label.clone(),
                start,
                finish,
                duration_days: effective_duration(task),
                milestone: task.milestone,
            });
        }
    }
    Ok(out)
}

/// Forward/backward critical-path pass over resolved tasks. Tasks caught in
/// a dependency cycle never enter the topological order and are omitted.
pub fn critical_path(resolved: &[ScheduledTask], graph: &DependencyGraph) -> Vec<ScheduleEntry> {
    let by_key: FxHashMap<&str, &ScheduledTask> =
        resolved.iter().map(|t| (t.key.as_str(), t)).collect();

    let mut indegree: FxHashMap<&str, usize> = FxHashMap::default();
    for task in resolved {
        let deps = graph
            .dependencies(&task.key)
            .iter()
            .filter(|d| by_key.contains_key(d.as_str()))
            .count();
        indegree.insert(&task.key, deps);
    }

    let mut queue: Vec<&str> = resolved
        .iter()
        .map(|t| t.key.as_str())
        .filter(|k| indegree.get(k) == Some(&0))
        .collect();
    let mut topo: Vec<&str> = Vec::new();
    let mut at = 0;
    while at < queue.len() {
        let key = queue[at];
        at += 1;
        topo.push(key);
        for dependent in graph.dependents(key) {
            if let Some(count) = indegree.get_mut(dependent.as_str()) {
                *count -= 1;
                if *count == 0 {
                    // Preserve the by_key-interned str so lifetimes line up.
                    if let Some(t) = by_key.get(dependent.as_str()) {
                        queue.push(t.key.as_str());
                    }
                }
            }
        }
    }

    let Some(project_end) = topo
        .iter()
        .filter_map(|k| by_key.get(k))
        .map(|t| t.finish)
        .max()
    else {
        return Vec::new();
    };

    let topo_set: FxHashSet<&str> = topo.iter().copied().collect();
    let mut late_start: FxHashMap<&str, NaiveDate> = FxHashMap::default();
    let mut entries_by_key: FxHashMap<&str, ScheduleEntry> = FxHashMap::default();
    for key in topo.iter().rev() {
        let Some(task) = by_key.get(key) else { continue };
        let late_finish = graph
            .dependents(key)
            .iter()
            .filter(|d| topo_set.contains(d.as_str()))
            .filter_map(|d| late_start.get(d.as_str()).copied())
            .min()
            .unwrap_or(project_end);
        let ls = late_finish
            .checked_sub_days(Days::new(task.duration_days.unsigned_abs()))
            .unwrap_or(late_finish);
        late_start.insert(key, ls);
        let slack = ls.signed_duration_since(task.start).num_days().max(0);
        entries_by_key.insert(
            key,
            ScheduleEntry {
                key: task.key.clone(),
                label: task.label.clone(),
                early_start: task.start,
                early_finish: task.finish,
                late_start: ls,
                late_finish,
                slack_days: slack,
                critical: slack <= 0,
                milestone: task.milestone,
            },
        );
    }

    resolved
        .iter()
        .filter_map(|t| entries_by_key.remove(t.key.as_str()))
        .collect()
}

/// Flags dependents whose declared start precedes a dependency's finish.
pub fn detect_conflicts(resolved: &[ScheduledTask], tasks: &[GanttTask]) -> Vec<Conflict> {
    let by_key: FxHashMap<&str, &ScheduledTask> =
        resolved.iter().map(|t| (t.key.as_str(), t)).collect();
    let mut conflicts = Vec::new();
    for task in tasks {
        let key = task.key();
        let Some(me) = by_key.get(key.as_str()) else {
            continue;
        };
        for dep in &task.after_deps {
            let Some(upstream) = by_key.get(dep.as_str()) else {
                continue;
            };
            if me.start < upstream.finish {
                conflicts.push(Conflict {
                    task: key.clone(),
                    depends_on: dep.clone(),
                    overlap_days: upstream.finish.signed_duration_since(me.start).num_days(),
                });
            }
        }
    }
    conflicts
}

/// Parse, graph, cycle scan, schedule resolution, critical path and
/// conflict detection in one pass.
pub fn analyze(code: &str) -> Result<ScheduleReport> {
    let model = parse_gantt(code);
    let graph = DependencyGraph::build(&model.tasks);
    let cycles = graph.detect_cycles();
    let resolved = resolve_schedule(&model.tasks)?;
    let entries = critical_path(&resolved, &graph);
    let conflicts = detect_conflicts(&resolved, &model.tasks);
    debug!(
        tasks = model.tasks.len(),
        scheduled = entries.len(),
        cycles = cycles.len(),
        conflicts = conflicts.len(),
        "analyzed gantt schedule"
    );
    Ok(ScheduleReport {
        title: model.title,
        cycles,
        entries,
        conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND: &str = "gantt\n    A : a, 2026-01-01, 2d\n    B : b, after a, 3d\n    C : c, after a, 1d\n    D : d, after b c, 1d\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resolves_after_chains_to_latest_upstream_finish() {
        let model = parse_gantt(DIAMOND);
        let resolved = resolve_schedule(&model.tasks).unwrap();
        let by_key = |k: &str| resolved.iter().find(|t| t.key == k).unwrap();
        assert_eq!(by_key("a").finish, date(2026, 1, 3));
        assert_eq!(by_key("b").start, date(2026, 1, 3));
        assert_eq!(by_key("b").finish, date(2026, 1, 6));
        assert_eq!(by_key("d").start, date(2026, 1, 6));
        assert_eq!(by_key("d").finish, date(2026, 1, 7));
    }

    #[test]
    fn critical_path_is_a_b_d_and_c_has_slack() {
        let report = analyze(DIAMOND).unwrap();
        assert!(report.cycles.is_empty());
        let entry = |k: &str| report.entries.iter().find(|e| e.key == k).unwrap();
        assert!(entry("a").critical);
        assert!(entry("b").critical);
        assert!(entry("d").critical);
        assert!(!entry("c").critical);
        assert_eq!(entry("c").slack_days, 2);
    }

    #[test]
    fn mutual_after_is_one_cycle_with_both_tasks() {
        let code = "gantt\n    X : x, after y, 1d\n    Y : y, after x, 1d\n";
        let model = parse_gantt(code);
        let graph = DependencyGraph::build(&model.tasks);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles.len(), 1);
        let mut members = cycles[0].clone();
        members.sort();
        assert_eq!(members, vec!["x", "y"]);
        // Cyclic tasks resolve to nothing, not to an error.
        assert!(resolve_schedule(&model.tasks).unwrap().is_empty());
    }

    #[test]
    fn unanchored_chain_is_an_input_error() {
        let model = parse_gantt("gantt\n    A : a, after ghost, 2d\n");
        let err = resolve_schedule(&model.tasks).unwrap_err();
        assert!(matches!(err, Error::UnanchoredTask { key } if key == "a"));
    }

    #[test]
    fn milestone_takes_zero_days() {
        let code = "gantt\n    A : a, 2026-01-01, 2d\n    M : milestone, m, after a\n";
        let model = parse_gantt(code);
        let resolved = resolve_schedule(&model.tasks).unwrap();
        let m = resolved.iter().find(|t| t.key == "m").unwrap();
        assert_eq!(m.start, m.finish);
    }

    #[test]
    fn declared_start_before_dependency_finish_is_a_conflict() {
        let code =
            "gantt\n    A : a, 2026-01-01, 5d\n    B : b, 2026-01-03, after a, 1d\n";
        let model = parse_gantt(code);
        let resolved = resolve_schedule(&model.tasks).unwrap();
        let conflicts = detect_conflicts(&resolved, &model.tasks);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].task, "b");
        assert_eq!(conflicts[0].depends_on, "a");
        assert_eq!(conflicts[0].overlap_days, 3);
    }

    #[test]
    fn report_serializes_dates_as_iso_strings() {
        let report = analyze(DIAMOND).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["key"], "a");
        assert_eq!(json["entries"][0]["earlyStart"], "2026-01-01");
        assert_eq!(json["entries"][0]["earlyFinish"], "2026-01-03");
    }

    #[test]
    fn until_runs_to_the_bound_tasks_start() {
        let code = "gantt\n    A : a, 2026-01-10, 2d\n    B : b, 2026-01-02, until a\n";
        let model = parse_gantt(code);
        let resolved = resolve_schedule(&model.tasks).unwrap();
        let b = resolved.iter().find(|t| t.key == "b").unwrap();
        assert_eq!(b.finish, date(2026, 1, 10));
    }
}
