//! Gantt dialect: task parser, date mutators and the dependency/critical-
//! path engine.

pub mod model;
pub mod mutate;
pub mod parse;
pub mod schedule;

pub use model::{GanttModel, GanttTask};
pub use mutate::{set_task_start, shift_task};
pub use parse::parse_gantt;
pub use schedule::{
    analyze, critical_path, detect_conflicts, resolve_schedule, Conflict, DependencyGraph,
    ScheduleEntry, ScheduleReport, ScheduledTask,
};
