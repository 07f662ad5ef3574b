use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTask {
    /// Short id given as the first data token (`t1` in `Plan : t1, ...`).
    pub id_token: Option<String>,
    pub label: String,
    pub done: bool,
    pub active: bool,
    pub crit: bool,
    pub milestone: bool,
    pub start_date: Option<NaiveDate>,
    /// Upstream task keys from an `after id1 id2 ...` token.
    #[serde(default)]
    pub after_deps: Vec<String>,
    /// Upper-bound task key from an `until id` token.
    pub until_dep: Option<String>,
    pub duration_days: Option<i64>,
    pub assignee: Option<String>,
    /// Percent complete from a metadata comment, clamped to 0..=100.
    pub progress: Option<u8>,
    pub link: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub section: Option<String>,
    pub source_line: usize,
    /// Byte span of the start-date token within its line.
    #[serde(skip)]
    pub(crate) date_span: Option<Range<usize>>,
}

impl GanttTask {
    /// Scheduling key: the short id when present, the label otherwise,
    /// both lower-cased.
    pub fn key(&self) -> String {
        self.id_token
            .as_deref()
            .unwrap_or(&self.label)
            .to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttModel {
    pub title: Option<String>,
    pub date_format: Option<String>,
    pub axis_format: Option<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    pub today_marker: Option<String>,
    #[serde(default)]
    pub sections: Vec<String>,
    pub tasks: Vec<GanttTask>,
}

impl GanttModel {
    pub fn task(&self, key: &str) -> Option<&GanttTask> {
        let key = key.to_lowercase();
        self.tasks.iter().find(|t| t.key() == key)
    }
}
