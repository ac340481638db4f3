//! The task/category store.
//!
//! Owns the in-memory task and category collections and persists both
//! through the [`Storage`](crate::storage::Storage) adapter. Every mutating
//! operation re-serializes the affected collection in full; at tens of
//! records this trades throughput for the guarantee that disk always holds
//! a complete, consistent snapshot.
//!
//! Operations addressing a missing identifier return a distinct not-found
//! error rather than silently succeeding, so callers can tell a typo from
//! a no-op.

use chrono::{DateTime, Duration, Local, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::fields::Priority;
use crate::storage::{Storage, KEY_CATEGORIES, KEY_TASKS};
use crate::task::{Subtask, Task, TaskDraft, TaskPatch, DEFAULT_CATEGORY};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    TaskNotFound(Uuid),
    #[error("subtask {1} not found on task {0}")]
    SubtaskNotFound(Uuid, u32),
    #[error("category '{0}' not found")]
    CategoryNotFound(String),
    #[error("category '{0}' cannot be deleted")]
    ProtectedCategory(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// In-memory store for tasks and categories, persisted after every mutation.
#[derive(Debug)]
pub struct Store {
    storage: Storage,
    tasks: Vec<Task>,
    categories: Vec<String>,
}

impl Store {
    /// Load the collections from storage, seeding the built-in demo data
    /// on a completely fresh data directory.
    pub fn open(storage: Storage) -> Result<Self, StoreError> {
        let fresh = !storage.contains(KEY_TASKS) && !storage.contains(KEY_CATEGORIES);
        let store = if fresh {
            info!("no persisted data found, seeding demo collection");
            Store {
                tasks: demo_tasks(),
                categories: default_categories(),
                storage,
            }
        } else {
            let tasks: Vec<Task> = storage.load(KEY_TASKS, Vec::new);
            let categories: Vec<String> = storage.load(KEY_CATEGORIES, default_categories);
            Store {
                storage,
                tasks,
                categories,
            }
        };
        if fresh {
            store.persist_tasks()?;
            store.persist_categories()?;
        }
        Ok(store)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TaskNotFound(id))
    }

    /// Create a task from a draft. The store assigns the identifier and
    /// timestamps; the completion flag starts false. A draft category that
    /// names no existing category falls back to "General".
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let category = match draft.category {
            Some(c) if self.categories.iter().any(|n| n == &c) => c,
            _ => DEFAULT_CATEGORY.to_string(),
        };
        let subtasks = draft
            .subtasks
            .into_iter()
            .enumerate()
            .map(|(i, title)| Subtask {
                id: i as u32 + 1,
                title,
                completed: false,
            })
            .collect();
        let task = Task {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            due: draft.due,
            due_time: draft.due_time,
            category,
            priority: draft.priority.unwrap_or(Priority::Medium),
            completed: false,
            project: draft.project,
            subtasks,
            attachments: draft.attachments,
            created_at: now,
            updated_at: now,
        };
        let id = task.id;
        debug!(%id, "adding task");
        self.tasks.push(task);
        self.persist_tasks()?;
        Ok(id)
    }

    /// Merge a partial update over an existing task and refresh its
    /// updated-timestamp.
    pub fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<(), StoreError> {
        let known_category = patch
            .category
            .as_ref()
            .map(|c| self.categories.iter().any(|n| n == c));
        let task = self.get_mut(id)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(due) = patch.due {
            task.due = due;
        }
        if let Some(due_time) = patch.due_time {
            task.due_time = due_time;
        }
        if let Some(category) = patch.category {
            task.category = if known_category == Some(true) {
                category
            } else {
                DEFAULT_CATEGORY.to_string()
            };
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(project) = patch.project {
            task.project = project;
        }
        if let Some(attachments) = patch.attachments {
            task.attachments = attachments;
        }
        task.updated_at = next_updated(task.updated_at);
        self.persist_tasks()
    }

    pub fn delete_task(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(StoreError::TaskNotFound(id));
        }
        debug!(%id, "deleted task");
        self.persist_tasks()
    }

    /// Flip the completion flag and refresh the updated-timestamp.
    pub fn toggle_completion(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let task = self.get_mut(id)?;
        task.completed = !task.completed;
        task.updated_at = next_updated(task.updated_at);
        let completed = task.completed;
        self.persist_tasks()?;
        Ok(completed)
    }

    /// Append a subtask, assigning the next identifier within the parent.
    pub fn add_subtask(&mut self, task_id: Uuid, title: String) -> Result<u32, StoreError> {
        let task = self.get_mut(task_id)?;
        let sub_id = task.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        task.subtasks.push(Subtask {
            id: sub_id,
            title,
            completed: false,
        });
        task.updated_at = next_updated(task.updated_at);
        self.persist_tasks()?;
        Ok(sub_id)
    }

    pub fn toggle_subtask(&mut self, task_id: Uuid, sub_id: u32) -> Result<bool, StoreError> {
        let task = self.get_mut(task_id)?;
        let Some(sub) = task.subtasks.iter_mut().find(|s| s.id == sub_id) else {
            return Err(StoreError::SubtaskNotFound(task_id, sub_id));
        };
        sub.completed = !sub.completed;
        let completed = sub.completed;
        task.updated_at = next_updated(task.updated_at);
        self.persist_tasks()?;
        Ok(completed)
    }

    pub fn remove_subtask(&mut self, task_id: Uuid, sub_id: u32) -> Result<(), StoreError> {
        let task = self.get_mut(task_id)?;
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != sub_id);
        if task.subtasks.len() == before {
            return Err(StoreError::SubtaskNotFound(task_id, sub_id));
        }
        task.updated_at = next_updated(task.updated_at);
        self.persist_tasks()
    }

    /// Append a category unless an exact (case-sensitive) match already
    /// exists; the duplicate case is a deliberate silent no-op.
    pub fn add_category(&mut self, name: String) -> Result<(), StoreError> {
        if self.categories.iter().any(|n| n == &name) {
            return Ok(());
        }
        self.categories.push(name);
        self.persist_categories()
    }

    /// Remove a category and reassign every task referencing it to
    /// "General". Tasks are never deleted by category removal.
    pub fn delete_category(&mut self, name: &str) -> Result<usize, StoreError> {
        if name == DEFAULT_CATEGORY {
            return Err(StoreError::ProtectedCategory(name.to_string()));
        }
        let before = self.categories.len();
        self.categories.retain(|n| n != name);
        if self.categories.len() == before {
            return Err(StoreError::CategoryNotFound(name.to_string()));
        }
        let mut reassigned = 0;
        for task in self.tasks.iter_mut().filter(|t| t.category == name) {
            task.category = DEFAULT_CATEGORY.to_string();
            task.updated_at = next_updated(task.updated_at);
            reassigned += 1;
        }
        self.persist_categories()?;
        self.persist_tasks()?;
        Ok(reassigned)
    }

    /// Resolve a task reference to an id. Accepts a full UUID, a unique
    /// UUID prefix, or an exact case-insensitive title; ambiguity is
    /// reported with the candidates.
    pub fn resolve_task_ref(&self, reference: &str) -> Result<Uuid, String> {
        if let Ok(id) = reference.parse::<Uuid>() {
            return match self.get(id) {
                Some(_) => Ok(id),
                None => Err(format!("Task {id} not found")),
            };
        }

        let lower = reference.to_lowercase();
        let by_prefix: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(&lower))
            .collect();
        let matches: Vec<&Task> = if reference.len() >= 4 && !by_prefix.is_empty() {
            by_prefix
        } else {
            self.tasks
                .iter()
                .filter(|t| t.title.to_lowercase() == lower)
                .collect()
        };

        match matches.len() {
            0 => Err(format!("No task found matching '{reference}'")),
            1 => Ok(matches[0].id),
            _ => {
                let mut msg = format!("Multiple tasks match '{reference}':\n");
                for t in matches {
                    msg.push_str(&format!("  {}  {}\n", t.id, t.title));
                }
                msg.push_str("Please use the specific ID instead.");
                Err(msg)
            }
        }
    }

    fn persist_tasks(&self) -> Result<(), StoreError> {
        self.storage.save(KEY_TASKS, &self.tasks)?;
        Ok(())
    }

    fn persist_categories(&self) -> Result<(), StoreError> {
        self.storage.save(KEY_CATEGORIES, &self.categories)?;
        Ok(())
    }
}

/// Updated-timestamps must be strictly increasing per task even when two
/// mutations land within clock resolution.
fn next_updated(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + Duration::nanoseconds(1)
    }
}

fn default_categories() -> Vec<String> {
    vec![
        DEFAULT_CATEGORY.to_string(),
        "Work".to_string(),
        "Personal".to_string(),
        "Shopping".to_string(),
    ]
}

/// Demo collection shown on first run so the app is not empty.
fn demo_tasks() -> Vec<Task> {
    let now = Utc::now();
    let today = Local::now().date_naive();
    let seed = |title: &str, description: &str, due, category: &str, priority, completed| Task {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        due,
        due_time: None,
        category: category.to_string(),
        priority,
        completed,
        project: None,
        subtasks: Vec::new(),
        attachments: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    vec![
        seed(
            "Complete project presentation",
            "Prepare slides and practice speech",
            today + Duration::days(1),
            "Work",
            Priority::High,
            false,
        ),
        seed(
            "Buy groceries",
            "Milk, eggs, bread, fruits",
            today,
            "Shopping",
            Priority::Medium,
            true,
        ),
        seed(
            "Morning workout",
            "30 minutes of cardio",
            today,
            "Personal",
            Priority::Low,
            false,
        ),
        seed(
            "Plan weekend trip",
            "Research destinations and book hotels",
            today + Duration::days(7),
            "Personal",
            Priority::Medium,
            false,
        ),
        seed(
            "Call mom",
            "Wish happy birthday",
            today,
            "Personal",
            Priority::High,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn empty_store(dir: &tempfile::TempDir) -> Store {
        let storage = Storage::new(dir.path());
        // Persist empty collections first so opening does not seed demos.
        storage.save(KEY_TASKS, &Vec::<Task>::new()).unwrap();
        storage.save(KEY_CATEGORIES, &default_categories()).unwrap();
        Store::open(storage).unwrap()
    }

    fn draft(title: &str, category: &str, priority: Priority) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            due: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            category: Some(category.to_string()),
            priority: Some(priority),
            ..TaskDraft::default()
        }
    }

    #[test]
    fn fresh_directory_seeds_demo_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Storage::new(dir.path())).unwrap();
        assert_eq!(store.tasks().len(), 5);
        assert_eq!(store.categories().len(), 4);
        assert!(store.categories().iter().any(|c| c == DEFAULT_CATEGORY));
        // The seed is persisted immediately, so a reopen sees it unchanged.
        let reopened = Store::open(Storage::new(dir.path())).unwrap();
        assert_eq!(reopened.tasks().len(), 5);
    }

    #[test]
    fn add_task_assigns_identity_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let a = store.add_task(draft("A", "Work", Priority::High)).unwrap();
        let b = store.add_task(draft("B", "Work", Priority::Low)).unwrap();
        assert_ne!(a, b);
        let ids: HashSet<Uuid> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 2);
        let task = store.get(a).unwrap();
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.subtasks.is_empty());
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn unknown_category_falls_back_to_general() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store
            .add_task(draft("A", "NoSuchCategory", Priority::Low))
            .unwrap();
        assert_eq!(store.get(id).unwrap().category, DEFAULT_CATEGORY);
    }

    #[test]
    fn update_merges_and_advances_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store.add_task(draft("A", "Work", Priority::Low)).unwrap();
        let before = store.get(id).unwrap().clone();
        store
            .update_task(
                id,
                TaskPatch {
                    title: Some("A2".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        let after = store.get(id).unwrap();
        assert_eq!(after.title, "A2");
        assert!(after.updated_at > before.updated_at);
        // Fields not present in the patch are untouched.
        assert_eq!(after.due, before.due);
        assert_eq!(after.category, before.category);
        assert_eq!(after.priority, before.priority);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn repeated_updates_stay_strictly_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store.add_task(draft("A", "Work", Priority::Low)).unwrap();
        let mut prev = store.get(id).unwrap().updated_at;
        for _ in 0..50 {
            store.toggle_completion(id).unwrap();
            let now = store.get(id).unwrap().updated_at;
            assert!(now > prev);
            prev = now;
        }
    }

    #[test]
    fn missing_identifiers_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let ghost = Uuid::new_v4();
        assert!(matches!(
            store.update_task(ghost, TaskPatch::default()),
            Err(StoreError::TaskNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            store.delete_task(ghost),
            Err(StoreError::TaskNotFound(_))
        ));
        assert!(matches!(
            store.toggle_completion(ghost),
            Err(StoreError::TaskNotFound(_))
        ));
    }

    #[test]
    fn toggle_flips_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store.add_task(draft("A", "Work", Priority::Low)).unwrap();
        assert!(store.toggle_completion(id).unwrap());
        assert!(!store.toggle_completion(id).unwrap());
    }

    #[test]
    fn subtask_ids_are_sequential_within_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store.add_task(draft("A", "Work", Priority::Low)).unwrap();
        let s1 = store.add_subtask(id, "first".to_string()).unwrap();
        let s2 = store.add_subtask(id, "second".to_string()).unwrap();
        assert_eq!((s1, s2), (1, 2));
        store.remove_subtask(id, s1).unwrap();
        // Ids are never reused after removal.
        let s3 = store.add_subtask(id, "third".to_string()).unwrap();
        assert_eq!(s3, 3);
        assert!(store.toggle_subtask(id, s2).unwrap());
        assert!(matches!(
            store.toggle_subtask(id, 99),
            Err(StoreError::SubtaskNotFound(_, 99))
        ));
    }

    #[test]
    fn duplicate_category_is_a_silent_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let before = store.categories().len();
        store.add_category("Work".to_string()).unwrap();
        assert_eq!(store.categories().len(), before);
        store.add_category("Errands".to_string()).unwrap();
        assert_eq!(store.categories().len(), before + 1);
    }

    #[test]
    fn delete_category_reassigns_tasks_to_general() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        for i in 0..3 {
            store
                .add_task(draft(&format!("W{i}"), "Work", Priority::Low))
                .unwrap();
        }
        store.add_task(draft("P", "Personal", Priority::Low)).unwrap();
        store.add_task(draft("S", "Shopping", Priority::Low)).unwrap();

        let reassigned = store.delete_category("Work").unwrap();
        assert_eq!(reassigned, 3);
        assert_eq!(store.tasks().len(), 5);
        assert_eq!(store.tasks().iter().filter(|t| t.category == "Work").count(), 0);
        assert_eq!(
            store
                .tasks()
                .iter()
                .filter(|t| t.category == DEFAULT_CATEGORY)
                .count(),
            3
        );
        // No task is left referencing a category that no longer exists.
        for t in store.tasks() {
            assert!(store.categories().iter().any(|c| c == &t.category));
        }
    }

    #[test]
    fn general_category_cannot_be_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        assert!(matches!(
            store.delete_category(DEFAULT_CATEGORY),
            Err(StoreError::ProtectedCategory(_))
        ));
        assert!(matches!(
            store.delete_category("Nope"),
            Err(StoreError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn persisted_collection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let tasks: Vec<Task> = {
            let mut store = empty_store(&dir);
            let id = store.add_task(draft("A", "Work", Priority::High)).unwrap();
            store.add_subtask(id, "step one".to_string()).unwrap();
            store.add_task(draft("B", "Personal", Priority::Low)).unwrap();
            store.tasks().to_vec()
        };
        let reopened = Store::open(Storage::new(dir.path())).unwrap();
        assert_eq!(reopened.tasks(), tasks.as_slice());
    }

    #[test]
    fn resolve_accepts_id_prefix_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        let id = store
            .add_task(draft("Water the plants", "Personal", Priority::Low))
            .unwrap();
        store.add_task(draft("Other", "Work", Priority::Low)).unwrap();

        assert_eq!(store.resolve_task_ref(&id.to_string()).unwrap(), id);
        assert_eq!(store.resolve_task_ref(&id.to_string()[..8]).unwrap(), id);
        assert_eq!(store.resolve_task_ref("water the plants").unwrap(), id);
        assert!(store.resolve_task_ref("no such task").is_err());
    }

    #[test]
    fn resolve_reports_ambiguous_titles() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = empty_store(&dir);
        store.add_task(draft("Dup", "Work", Priority::Low)).unwrap();
        store.add_task(draft("Dup", "Personal", Priority::Low)).unwrap();
        let err = store.resolve_task_ref("dup").unwrap_err();
        assert!(err.contains("Multiple tasks match"));
    }
}
