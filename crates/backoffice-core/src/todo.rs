//! Todo-list model.
//!
//! A `TodoList` is an immutable value: every change returns a new list and
//! leaves the original alone. Ids come from a counter owned by the list
//! itself and persisted with it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::Prompter;
use crate::storage::{LocalStorage, StorageError};

/// Storage key for the persisted list
pub const TODOS_KEY: &str = "todos";

/// Maximum todo length in characters
pub const MAX_TODO_LENGTH: usize = 100;

/// Todos longer than this still save but are logged as unusually long
const LONG_TODO_WARNING_LENGTH: usize = 50;

pub const DELETE_COMPLETED_CONFIRM_MESSAGE: &str = "Delete this completed todo?";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TodoError {
    #[error("Please enter a todo")]
    EmptyText,

    #[error("Todos must be 100 characters or fewer")]
    TooLong,

    #[error("No todo with id {0}")]
    NotFound(u64),

    #[error("No todo ids left, remove the list to start over")]
    IdsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// `!` marks high priority, `?` medium, anything else is low.
    pub fn from_text(text: &str) -> Self {
        if text.contains('!') {
            Priority::High
        } else if text.contains('?') {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    fn matches(&self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }

    /// Message shown when nothing matches the filter.
    pub fn empty_message(&self) -> &'static str {
        match self {
            Filter::All => "No todos.",
            Filter::Pending => "No pending todos.",
            Filter::Completed => "No completed todos.",
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "pending" => Ok(Filter::Pending),
            "completed" => Ok(Filter::Completed),
            other => Err(format!(
                "unknown filter '{other}' (expected all, pending or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    items: Vec<Todo>,
}

impl Default for TodoList {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoList {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }

    pub fn get(&self, id: u64) -> Option<&Todo> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a todo created now. Returns the new list and the added todo.
    pub fn add(&self, text: &str) -> Result<(TodoList, Todo), TodoError> {
        self.add_at(text, Utc::now())
    }

    pub fn add_at(
        &self,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(TodoList, Todo), TodoError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }
        let length = text.chars().count();
        if length > MAX_TODO_LENGTH {
            return Err(TodoError::TooLong);
        }
        if length > LONG_TODO_WARNING_LENGTH {
            debug!(length, "Long todo");
        }
        let next_id = self.next_id.checked_add(1).ok_or(TodoError::IdsExhausted)?;

        let todo = Todo {
            id: self.next_id,
            text: text.to_string(),
            completed: false,
            priority: Priority::from_text(text),
            created_at,
        };

        let mut items = self.items.clone();
        items.push(todo.clone());
        let list = TodoList { next_id, items };
        Ok((list, todo))
    }

    /// Flip the completed flag of `id`.
    pub fn toggle(&self, id: u64) -> Result<TodoList, TodoError> {
        if self.get(id).is_none() {
            return Err(TodoError::NotFound(id));
        }
        let items = self
            .items
            .iter()
            .map(|t| {
                if t.id == id {
                    Todo {
                        completed: !t.completed,
                        ..t.clone()
                    }
                } else {
                    t.clone()
                }
            })
            .collect();
        Ok(TodoList {
            next_id: self.next_id,
            items,
        })
    }

    pub fn remove(&self, id: u64) -> Result<TodoList, TodoError> {
        if self.get(id).is_none() {
            return Err(TodoError::NotFound(id));
        }
        let items = self.items.iter().filter(|t| t.id != id).cloned().collect();
        Ok(TodoList {
            next_id: self.next_id,
            items,
        })
    }

    /// Remove `id`, asking first if the todo is already completed.
    /// Returns `None` when the user declines.
    pub fn remove_confirmed(
        &self,
        id: u64,
        prompter: &dyn Prompter,
    ) -> Result<Option<TodoList>, TodoError> {
        let todo = self.get(id).ok_or(TodoError::NotFound(id))?;
        if todo.completed && !prompter.confirm(DELETE_COMPLETED_CONFIRM_MESSAGE) {
            return Ok(None);
        }
        self.remove(id).map(Some)
    }

    /// Todos matching `filter`: high priority first, then newest first.
    pub fn filtered(&self, filter: Filter) -> Vec<&Todo> {
        let mut todos: Vec<&Todo> = self.items.iter().filter(|t| filter.matches(t)).collect();
        todos.sort_by(|a, b| {
            let a_high = a.priority == Priority::High;
            let b_high = b.priority == Priority::High;
            b_high
                .cmp(&a_high)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        todos
    }

    pub fn stats(&self) -> TodoStats {
        let total = self.items.len();
        let completed = self.items.iter().filter(|t| t.completed).count();
        TodoStats {
            total,
            completed,
            pending: total - completed,
        }
    }

    /// Keep the id counter ahead of every stored id, whatever was on disk.
    fn normalized(mut self) -> Self {
        let max_id = self.items.iter().map(|t| t.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id.saturating_add(1));
        self
    }

    pub fn load(storage: &LocalStorage) -> Result<Self, StorageError> {
        match storage.load::<TodoList>(TODOS_KEY)? {
            Some(list) => Ok(list.normalized()),
            None => {
                debug!("No stored todos");
                Ok(Self::new())
            }
        }
    }

    /// Load, starting from an empty list if the stored one is corrupt.
    pub fn load_or_default(storage: &LocalStorage) -> Result<Self, StorageError> {
        match Self::load(storage) {
            Err(StorageError::CorruptData { source, .. }) => {
                warn!(error = %source, "Stored todos are corrupt, starting empty");
                Ok(Self::new())
            }
            other => other,
        }
    }

    pub fn save(&self, storage: &LocalStorage) -> Result<(), StorageError> {
        storage.save(TODOS_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::ScriptedPrompter;
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn list_of(texts: &[&str]) -> TodoList {
        texts.iter().enumerate().fold(TodoList::new(), |list, (i, text)| {
            list.add_at(text, at(i as i64)).unwrap().0
        })
    }

    #[test]
    fn test_priority_from_text() {
        assert_eq!(Priority::from_text("ship it!"), Priority::High);
        assert_eq!(Priority::from_text("why? now!"), Priority::High);
        assert_eq!(Priority::from_text("lunch?"), Priority::Medium);
        assert_eq!(Priority::from_text("laundry"), Priority::Low);
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let list = TodoList::new();
        assert_eq!(list.add("   ").unwrap_err(), TodoError::EmptyText);
        assert_eq!(list.add("").unwrap_err(), TodoError::EmptyText);
    }

    #[test]
    fn test_add_rejects_long_text() {
        let list = TodoList::new();
        assert_eq!(list.add(&"a".repeat(101)).unwrap_err(), TodoError::TooLong);
        assert!(list.add(&"a".repeat(100)).is_ok());
        // length counts characters, not bytes
        assert!(list.add(&"할".repeat(100)).is_ok());
    }

    #[test]
    fn test_add_leaves_original_untouched() {
        let list = TodoList::new();
        let (next, todo) = list.add("write tests").unwrap();
        assert!(list.is_empty());
        assert_eq!(next.len(), 1);
        assert_eq!(todo.id, 1);
        assert_eq!(todo.priority, Priority::Low);
        assert!(!todo.completed);
    }

    #[test]
    fn test_ids_are_per_list() {
        let first = list_of(&["a", "b"]);
        let second = list_of(&["c"]);
        assert!(first.get(2).is_some());
        // a separate list starts its own sequence
        assert_eq!(second.get(1).map(|t| t.text.as_str()), Some("c"));
        assert!(second.get(2).is_none());
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let list = list_of(&["a", "b"]).remove(2).unwrap();
        let (list, todo) = list.add("c").unwrap();
        assert_eq!(todo.id, 3);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_toggle_is_copy_on_write() {
        let list = list_of(&["a"]);
        let toggled = list.toggle(1).unwrap();
        assert!(!list.get(1).unwrap().completed);
        assert!(toggled.get(1).unwrap().completed);
        assert!(!toggled.toggle(1).unwrap().get(1).unwrap().completed);
    }

    #[test]
    fn test_unknown_ids() {
        let list = list_of(&["a"]);
        assert_eq!(list.toggle(9).unwrap_err(), TodoError::NotFound(9));
        assert_eq!(list.remove(9).unwrap_err(), TodoError::NotFound(9));
    }

    #[test]
    fn test_remove_pending_needs_no_confirmation() {
        let prompter = ScriptedPrompter::answering(false);
        let list = list_of(&["a", "b"]);
        let removed = list.remove_confirmed(1, &prompter).unwrap().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(prompter.confirms(), 0);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove_completed_asks_first() {
        let list = list_of(&["a"]).toggle(1).unwrap();

        let declined = ScriptedPrompter::answering(false);
        assert_eq!(list.remove_confirmed(1, &declined).unwrap(), None);
        assert_eq!(declined.confirms(), 1);

        let accepted = ScriptedPrompter::answering(true);
        let removed = list.remove_confirmed(1, &accepted).unwrap().unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_filtered_sorting() {
        let list = list_of(&["old", "urgent!", "newer", "question?"]);
        let texts: Vec<&str> = list.filtered(Filter::All).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["urgent!", "question?", "newer", "old"]);
    }

    #[test]
    fn test_filters_and_stats() {
        let list = list_of(&["a", "b", "c"]).toggle(2).unwrap();
        assert_eq!(list.filtered(Filter::Completed).len(), 1);
        assert_eq!(list.filtered(Filter::Pending).len(), 2);
        assert_eq!(
            list.stats(),
            TodoStats {
                total: 3,
                completed: 1,
                pending: 2
            }
        );
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!("all".parse::<Filter>(), Ok(Filter::All));
        assert_eq!("Pending".parse::<Filter>(), Ok(Filter::Pending));
        assert_eq!("completed".parse::<Filter>(), Ok(Filter::Completed));
        assert!("done".parse::<Filter>().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();
        let list = list_of(&["a", "b!"]).toggle(1).unwrap();
        list.save(&storage).unwrap();
        assert_eq!(TodoList::load(&storage).unwrap(), list);
    }

    #[test]
    fn test_load_repairs_id_counter() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();
        storage
            .set_item(
                TODOS_KEY,
                r#"{"items":[{"id":7,"text":"a","completed":false,"priority":"low","created_at":"2024-01-01T09:00:00Z"}]}"#,
            )
            .unwrap();
        let (_, todo) = TodoList::load(&storage).unwrap().add("b").unwrap();
        assert_eq!(todo.id, 8);
    }

    #[test]
    fn test_load_or_default_on_corrupt_data() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();
        storage.set_item(TODOS_KEY, "[oops").unwrap();
        assert!(TodoList::load(&storage).is_err());
        assert_eq!(TodoList::load_or_default(&storage).unwrap(), TodoList::new());
    }

    #[test]
    fn test_load_with_largest_id_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf()).unwrap();
        storage
            .set_item(
                TODOS_KEY,
                r#"{"next_id":1,"items":[{"id":18446744073709551615,"text":"a","completed":false,"priority":"low","created_at":"2024-01-01T09:00:00Z"}]}"#,
            )
            .unwrap();

        let list = TodoList::load_or_default(&storage).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.add("b").unwrap_err(), TodoError::IdsExhausted);
        // the existing todo can still be managed
        assert!(list.toggle(u64::MAX).is_ok());
        assert!(list.remove(u64::MAX).unwrap().is_empty());
    }
}
