//! Enumerations and field types for task management.
//!
//! This module defines the structured value types used to categorise and
//! query tasks: priority levels, completion-tab filters and sort keys.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task priority.
///
/// Ordering is `Low < Medium < High`, so "priority descending" sorts
/// high-priority tasks first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
}

/// Three-way completion filter used by list views.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum TabFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    /// Due date ascending, time-of-day breaking ties within a day.
    Due,
    /// Priority descending (high > medium > low).
    Priority,
    /// Creation time, newest first.
    Created,
    /// Title, lexicographic ascending.
    Title,
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}
