//! Derived views over the task collection.
//!
//! Pure query functions: nothing here mutates or persists. Each screen of
//! the CLI composes these filters, sorts and aggregates over a borrowed
//! slice of tasks.

use chrono::NaiveDate;

use crate::fields::{Priority, SortKey, TabFilter};
use crate::task::Task;

/// Three-way partition of tasks by due date relative to a reference day.
/// Only the date portion of the schedule is considered; time-of-day plays
/// no role here.
#[derive(Debug, Default)]
pub struct DuePartition<'a> {
    /// Past due and still pending.
    pub overdue: Vec<&'a Task>,
    /// Due on the reference day, regardless of completion.
    pub today: Vec<&'a Task>,
    /// Due later and still pending.
    pub upcoming: Vec<&'a Task>,
}

pub fn partition_by_due(tasks: &[Task], today: NaiveDate) -> DuePartition<'_> {
    let mut part = DuePartition::default();
    for t in tasks {
        if t.due == today {
            part.today.push(t);
        } else if t.due < today && !t.completed {
            part.overdue.push(t);
        } else if t.due > today && !t.completed {
            part.upcoming.push(t);
        }
    }
    part
}

/// True when the task is past due and still pending.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && task.due < today
}

/// Exact-match category filter; `None` is the select-all sentinel.
pub fn filter_by_category<'a>(tasks: &[&'a Task], category: Option<&str>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .copied()
        .collect()
}

pub fn filter_by_tab<'a>(tasks: &[&'a Task], tab: TabFilter) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| match tab {
            TabFilter::All => true,
            TabFilter::Active => !t.completed,
            TabFilter::Completed => t.completed,
        })
        .copied()
        .collect()
}

/// Case-insensitive substring search over title and description.
pub fn search<'a>(tasks: &[&'a Task], query: &str) -> Vec<&'a Task> {
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.description.to_lowercase().contains(&needle)
        })
        .copied()
        .collect()
}

/// Stable sort; ties preserve the input's relative order.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::Due => tasks.sort_by_key(|t| (t.due, t.due_time)),
        SortKey::Priority => tasks.sort_by(|a, b| b.priority.cmp(&a.priority)),
        SortKey::Created => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Title => tasks.sort_by(|a, b| a.title.cmp(&b.title)),
    }
}

/// Aggregate counters for the profile/statistics screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub high_priority: usize,
    pub overdue: usize,
    /// Display-only heuristic:
    /// `max(0, completed/total * 100 - 5 * overdue)`; 0 for an empty
    /// collection.
    pub productivity_score: f64,
}

pub fn stats(tasks: &[Task], today: NaiveDate) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let high_priority = tasks.iter().filter(|t| t.priority == Priority::High).count();
    let overdue = tasks.iter().filter(|t| is_overdue(t, today)).count();
    let productivity_score = if total == 0 {
        0.0
    } else {
        let raw = completed as f64 / total as f64 * 100.0 - 5.0 * overdue as f64;
        raw.max(0.0)
    };
    Stats {
        total,
        completed,
        active: total - completed,
        high_priority,
        overdue,
        productivity_score,
    }
}
