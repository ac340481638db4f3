//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and their handlers, and
//! acts as the input boundary: title validation, due-date parsing, category
//! checks and attachment staging all happen here before the store is
//! touched. Handlers report user errors on stderr and exit non-zero.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::path::PathBuf;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};

use crate::attachments::StagedAttachments;
use crate::fields::{format_priority, Priority, SortKey, TabFilter};
use crate::storage::{Storage, KEY_THEME};
use crate::store::Store;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::views;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd", or a weekday.
        #[arg(long, default_value = "today")]
        due: String,
        /// Time of day, HH:MM.
        #[arg(long)]
        time: Option<String>,
        /// Category name; must already exist.
        #[arg(long)]
        category: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Project reference.
        #[arg(long)]
        project: Option<String>,
        /// Subtask title. May be repeated.
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
        /// File to attach (metadata only). May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// List tasks with optional filters.
    List {
        /// Filter by category (exact match).
        #[arg(long)]
        category: Option<String>,
        /// Completion tab: all | active | completed.
        #[arg(long, value_enum, default_value_t = TabFilter::All)]
        tab: TabFilter,
        /// Case-insensitive substring search over title and description.
        #[arg(long)]
        search: Option<String>,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show overdue / due-today / upcoming tasks.
    Today,

    /// View a single task by ID, ID prefix, or title.
    View {
        /// Task reference.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task reference.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Time of day, HH:MM.
        #[arg(long)]
        time: Option<String>,
        /// Clear the time of day.
        #[arg(long, conflicts_with = "time")]
        clear_time: bool,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        project: Option<String>,
        /// Clear the project reference.
        #[arg(long, conflicts_with = "project")]
        clear_project: bool,
        /// Replace attachments with this file. May be repeated.
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Toggle a task's completion flag.
    Toggle {
        /// Task reference.
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task reference.
        id: String,
    },

    /// Manage subtasks of a task.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Show aggregate statistics and the productivity score.
    Stats,

    /// Show or set the display theme.
    Theme {
        /// New theme value; omit to print the current one.
        value: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Add a subtask to a task.
    Add {
        /// Parent task reference.
        task: String,
        /// Subtask title.
        title: String,
    },
    /// Toggle a subtask's completion flag.
    Toggle {
        /// Parent task reference.
        task: String,
        /// Subtask number within the task.
        id: u32,
    },
    /// Remove a subtask.
    Rm {
        /// Parent task reference.
        task: String,
        /// Subtask number within the task.
        id: u32,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a category.
    Add {
        /// Category name.
        name: String,
    },
    /// Remove a category; its tasks move to "General".
    Rm {
        /// Category name.
        name: String,
    },
    /// List categories with task counts.
    List,
}

fn fail(msg: &str) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

/// Title validation applied at the input boundary. The store itself does
/// not re-validate.
pub fn validate_title(title: &str) -> Result<String, String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err("Title cannot be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn resolve(store: &Store, reference: &str) -> uuid::Uuid {
    match store.resolve_task_ref(reference) {
        Ok(id) => id,
        Err(e) => fail(&e),
    }
}

fn parse_time(s: &str) -> NaiveTime {
    match NaiveTime::parse_from_str(s, "%H:%M") {
        Ok(t) => t,
        Err(_) => fail(&format!("Invalid time '{s}', expected HH:MM")),
    }
}

fn require_category(store: &Store, name: &str) {
    if !store.categories().iter().any(|c| c == name) {
        fail(&format!(
            "No category '{}'. Known categories: {}. Create it with `todo category add`.",
            name,
            store.categories().join(", ")
        ));
    }
}

/// Stage attachment files, rejecting oversized or unreadable ones per file
/// while keeping the rest, then commit the survivors to metadata records.
fn stage_attachments(paths: &[PathBuf]) -> Vec<crate::task::Attachment> {
    let mut staged = StagedAttachments::new();
    for path in paths {
        if let Err(e) = staged.stage(path) {
            eprintln!("Skipping attachment: {e}");
        }
    }
    staged.commit()
}

/// Add a new task to the store.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    store: &mut Store,
    title: String,
    desc: Option<String>,
    due: String,
    time: Option<String>,
    category: Option<String>,
    priority: Priority,
    project: Option<String>,
    subtasks: Vec<String>,
    attachments: Vec<PathBuf>,
) {
    let title = match validate_title(&title) {
        Ok(t) => t,
        Err(e) => fail(&e),
    };
    let due = match parse_due_input(&due) {
        Some(d) => d,
        None => fail(&format!("Could not parse due date '{due}'")),
    };
    if let Some(name) = category.as_deref() {
        require_category(store, name);
    }
    let subtasks: Vec<String> = subtasks
        .into_iter()
        .filter_map(|s| validate_title(&s).ok())
        .collect();
    let draft = TaskDraft {
        title,
        description: desc.unwrap_or_default(),
        due,
        due_time: time.as_deref().map(parse_time),
        category,
        priority: Some(priority),
        project,
        subtasks,
        attachments: stage_attachments(&attachments),
    };
    match store.add_task(draft) {
        Ok(id) => {
            let task = store.get(id).unwrap();
            println!("Added {}  {}", short_id(task), task.title);
        }
        Err(e) => fail(&format!("Failed to add task: {e}")),
    }
}

/// List tasks through the derived views.
pub fn cmd_list(
    store: &Store,
    category: Option<String>,
    tab: TabFilter,
    search: Option<String>,
    sort: SortKey,
    limit: Option<usize>,
) {
    let all: Vec<&Task> = store.tasks().iter().collect();
    let mut filtered = views::filter_by_category(&all, category.as_deref());
    filtered = views::filter_by_tab(&filtered, tab);
    if let Some(q) = search.as_deref() {
        filtered = views::search(&filtered, q);
    }
    views::sort_tasks(&mut filtered, sort);
    if let Some(n) = limit {
        filtered.truncate(n);
    }
    print_table(&filtered);
}

/// Show the three-way due-date partition for today.
pub fn cmd_today(store: &Store) {
    let today = Local::now().date_naive();
    let part = views::partition_by_due(store.tasks(), today);
    for (heading, bucket) in [
        ("Overdue", &part.overdue),
        ("Today", &part.today),
        ("Upcoming", &part.upcoming),
    ] {
        println!("{heading} ({})", bucket.len());
        if bucket.is_empty() {
            println!("  -");
        } else {
            print_table(bucket);
        }
        println!();
    }
}

/// View detailed information about a single task.
pub fn cmd_view(store: &Store, reference: String) {
    let id = resolve(store, &reference);
    let Some(task) = store.get(id) else {
        fail(&format!("Task {id} not found"));
    };
    let today = Local::now().date_naive();
    println!("ID:        {}", task.id);
    println!("Title:     {}", task.title);
    println!("Status:    {}", if task.completed { "completed" } else { "active" });
    println!("Priority:  {}", format_priority(task.priority));
    println!("Category:  {}", task.category);
    println!(
        "Due:       {} ({}){}",
        task.due,
        format_due_relative(task.due, today),
        task.due_time.map(|t| format!(" at {}", t.format("%H:%M"))).unwrap_or_default()
    );
    println!("Project:   {}", task.project.as_deref().unwrap_or("-"));
    println!("Created:   {}", task.created_at.to_rfc3339());
    println!("Updated:   {}", task.updated_at.to_rfc3339());
    if !task.subtasks.is_empty() {
        println!("Subtasks:");
        for s in &task.subtasks {
            println!("  {} [{}] {}", s.id, if s.completed { "x" } else { " " }, s.title);
        }
    }
    if !task.attachments.is_empty() {
        println!("Attachments:");
        for a in &task.attachments {
            println!("  {} ({} bytes, {})", a.name, a.size, a.mime);
        }
    }
    if !task.description.is_empty() {
        println!("Description:\n{}", task.description);
    }
}

/// Update fields on a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    store: &mut Store,
    reference: String,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    time: Option<String>,
    clear_time: bool,
    category: Option<String>,
    priority: Option<Priority>,
    project: Option<String>,
    clear_project: bool,
    attachments: Vec<PathBuf>,
) {
    let id = resolve(store, &reference);
    let title = title.map(|t| match validate_title(&t) {
        Ok(t) => t,
        Err(e) => fail(&e),
    });
    let due = due.map(|d| match parse_due_input(&d) {
        Some(d) => d,
        None => fail(&format!("Could not parse due date '{d}'")),
    });
    if let Some(name) = category.as_deref() {
        require_category(store, name);
    }
    let due_time = if clear_time {
        Some(None)
    } else {
        time.as_deref().map(|t| Some(parse_time(t)))
    };
    let project = if clear_project {
        Some(None)
    } else {
        project.map(Some)
    };
    let patch = TaskPatch {
        title,
        description: desc,
        due,
        due_time,
        category,
        priority,
        project,
        attachments: if attachments.is_empty() {
            None
        } else {
            Some(stage_attachments(&attachments))
        },
    };
    if patch.is_empty() {
        fail("Nothing to update; pass at least one field flag.");
    }
    match store.update_task(id, patch) {
        Ok(()) => println!("Updated {}", &id.to_string()[..8]),
        Err(e) => fail(&format!("Update failed: {e}")),
    }
}

/// Flip a task's completion flag.
pub fn cmd_toggle(store: &mut Store, reference: String) {
    let id = resolve(store, &reference);
    match store.toggle_completion(id) {
        Ok(true) => println!("Completed {}", &id.to_string()[..8]),
        Ok(false) => println!("Reopened {}", &id.to_string()[..8]),
        Err(e) => fail(&format!("Toggle failed: {e}")),
    }
}

/// Delete a task.
pub fn cmd_delete(store: &mut Store, reference: String) {
    let id = resolve(store, &reference);
    match store.delete_task(id) {
        Ok(()) => println!("Deleted {}", &id.to_string()[..8]),
        Err(e) => fail(&format!("Delete failed: {e}")),
    }
}

/// Subtask add/toggle/remove.
pub fn cmd_subtask(store: &mut Store, action: SubtaskAction) {
    match action {
        SubtaskAction::Add { task, title } => {
            let title = match validate_title(&title) {
                Ok(t) => t,
                Err(e) => fail(&e),
            };
            let id = resolve(store, &task);
            match store.add_subtask(id, title) {
                Ok(sub_id) => println!("Added subtask {sub_id}"),
                Err(e) => fail(&format!("Subtask add failed: {e}")),
            }
        }
        SubtaskAction::Toggle { task, id: sub_id } => {
            let id = resolve(store, &task);
            match store.toggle_subtask(id, sub_id) {
                Ok(true) => println!("Completed subtask {sub_id}"),
                Ok(false) => println!("Reopened subtask {sub_id}"),
                Err(e) => fail(&format!("Subtask toggle failed: {e}")),
            }
        }
        SubtaskAction::Rm { task, id: sub_id } => {
            let id = resolve(store, &task);
            match store.remove_subtask(id, sub_id) {
                Ok(()) => println!("Removed subtask {sub_id}"),
                Err(e) => fail(&format!("Subtask remove failed: {e}")),
            }
        }
    }
}

/// Category add/remove/list.
pub fn cmd_category(store: &mut Store, action: CategoryAction) {
    match action {
        CategoryAction::Add { name } => {
            let name = match validate_title(&name) {
                Ok(n) => n,
                Err(_) => fail("Category name cannot be empty"),
            };
            if let Err(e) = store.add_category(name.clone()) {
                fail(&format!("Category add failed: {e}"));
            }
            println!("Category '{name}' available");
        }
        CategoryAction::Rm { name } => match store.delete_category(&name) {
            Ok(moved) => println!("Removed '{name}', moved {moved} task(s) to General"),
            Err(e) => fail(&format!("Category remove failed: {e}")),
        },
        CategoryAction::List => {
            for name in store.categories() {
                let count = store.tasks().iter().filter(|t| &t.category == name).count();
                println!("{name:<16} {count}");
            }
        }
    }
}

/// Print aggregate statistics and the productivity score.
pub fn cmd_stats(store: &Store) {
    let today = Local::now().date_naive();
    let s = views::stats(store.tasks(), today);
    println!("Total:          {}", s.total);
    println!("Completed:      {}", s.completed);
    println!("Active:         {}", s.active);
    println!("High priority:  {}", s.high_priority);
    println!("Overdue:        {}", s.overdue);
    println!("Productivity:   {:.0}%", s.productivity_score);
}

/// Show or set the persisted display theme.
pub fn cmd_theme(storage: &Storage, value: Option<String>) {
    match value {
        Some(theme) => {
            if let Err(e) = storage.save(KEY_THEME, &theme) {
                fail(&format!("Failed to save theme: {e}"));
            }
            println!("Theme set to '{theme}'");
        }
        None => {
            let theme: String = storage.load(KEY_THEME, || "default".to_string());
            println!("{theme}");
        }
    }
}

/// Generate shell completion scripts on stdout.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    generate(shell, &mut cmd, "todo", &mut std::io::stdout());
}

fn short_id(task: &Task) -> String {
    task.id.to_string()[..8].to_string()
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<9} {:<4} {:<7} {:<12} {:<12} {}",
        "ID", "Done", "Pri", "Due", "Category", "Title"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        println!(
            "{:<9} {:<4} {:<7} {:<12} {:<12} {}",
            short_id(t),
            if t.completed { "[x]" } else { "[ ]" },
            format_priority(t.priority),
            format_due_relative(t.due, today),
            truncate(&t.category, 12),
            t.title
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - bare weekday names ("friday") and "next friday"
/// - "end of week", "end of month"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    parse_due_from(s, Local::now().date_naive())
}

fn parse_due_from(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let weekday = today.weekday().num_days_from_monday() as i64;
            return Some(today + Duration::days(6 - weekday));
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    for (day_name, target_day) in weekdays {
        let current = today.weekday().num_days_from_monday() as i64;
        let ahead = (target_day + 7 - current) % 7;
        if s == day_name || s == format!("this {day_name}") {
            return Some(today + Duration::days(ahead));
        }
        if s == format!("next {day_name}") {
            let days = if ahead == 0 { 7 } else { ahead + 7 };
            return Some(today + Duration::days(days));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let days = (due - today).num_days();
    match days {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {d}d"),
        d => format!("{}d late", -d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_titles_rejected_at_boundary() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("\t\n").is_err());
        assert_eq!(validate_title("  Call mom  ").unwrap(), "Call mom");
    }

    #[test]
    fn parse_due_handles_relative_forms() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(); // a Wednesday
        assert_eq!(parse_due_from("today", today), Some(today));
        assert_eq!(
            parse_due_from("tomorrow", today),
            NaiveDate::from_ymd_opt(2024, 6, 6)
        );
        assert_eq!(
            parse_due_from("in 3d", today),
            NaiveDate::from_ymd_opt(2024, 6, 8)
        );
        assert_eq!(
            parse_due_from("in 2w", today),
            NaiveDate::from_ymd_opt(2024, 6, 19)
        );
        assert_eq!(
            parse_due_from("friday", today),
            NaiveDate::from_ymd_opt(2024, 6, 7)
        );
        assert_eq!(
            parse_due_from("next friday", today),
            NaiveDate::from_ymd_opt(2024, 6, 14)
        );
        assert_eq!(
            parse_due_from("eow", today),
            NaiveDate::from_ymd_opt(2024, 6, 9)
        );
        assert_eq!(
            parse_due_from("end of month", today),
            NaiveDate::from_ymd_opt(2024, 6, 30)
        );
        assert_eq!(
            parse_due_from("2024-07-01", today),
            NaiveDate::from_ymd_opt(2024, 7, 1)
        );
        assert_eq!(parse_due_from("gibberish", today), None);
    }

    #[test]
    fn relative_due_formatting() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(format_due_relative(today, today), "today");
        assert_eq!(
            format_due_relative(today + Duration::days(1), today),
            "tomorrow"
        );
        assert_eq!(format_due_relative(today + Duration::days(4), today), "in 4d");
        assert_eq!(format_due_relative(today - Duration::days(2), today), "2d late");
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 12), "short");
        assert_eq!(truncate("a rather long name", 7), "a rath…");
    }
}
