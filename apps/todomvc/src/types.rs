//! Domain types for the TodoMVC view-model.
//!
//! A todo list is an insertion-ordered sequence of items. Items are created
//! from the pending input text, toggled, renamed through an edit session, and
//! removed one at a time or all completed at once.

use serde::{Deserialize, Serialize};

/// Unique identifier for a todo item, rendered as `todo-<n>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Creates a `TodoId` from its textual form
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Creates the `TodoId` for a UID counter value
    #[must_use]
    pub fn from_uid(uid: i64) -> Self {
        Self(format!("todo-{uid}"))
    }

    /// Returns the textual form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoId,
    /// Text of the todo
    pub text: String,
    /// Whether the todo is completed
    pub completed: bool,
}

impl TodoItem {
    /// Creates a new, active todo item
    #[must_use]
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
        }
    }
}

/// Which slice of the list is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TodoFilter {
    /// Every item
    #[default]
    All,
    /// Items not yet completed
    Active,
    /// Completed items
    Completed,
}

impl TodoFilter {
    /// Every filter, in display order
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Whether `item` is shown under this filter
    #[must_use]
    pub const fn admits(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Active => !item.completed,
            Self::Completed => item.completed,
        }
    }
}

impl std::fmt::Display for TodoFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        })
    }
}

/// The item list together with the UID counter that names its items.
///
/// The counter starts at -1 and is advanced before each use, so the first
/// item is `todo-0`. It never moves backwards, even when items are removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<TodoItem>,
    latest_uid: i64,
}

impl Default for TodoList {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoList {
    /// Creates an empty list with a fresh counter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            latest_uid: -1,
        }
    }

    /// Items in insertion order
    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Last UID handed out, -1 if none
    #[must_use]
    pub const fn latest_uid(&self) -> i64 {
        self.latest_uid
    }

    /// Returns an item by ID
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Checks if an item exists
    #[must_use]
    pub fn contains(&self, id: &TodoId) -> bool {
        self.get(id).is_some()
    }

    /// Appends an item built from `text`; empty text leaves the list and the
    /// counter untouched
    #[must_use]
    pub fn with_added(&self, text: &str) -> Self {
        if text.is_empty() {
            return self.clone();
        }
        let latest_uid = self.latest_uid + 1;
        let mut items = self.items.clone();
        items.push(TodoItem::new(TodoId::from_uid(latest_uid), text));
        Self { items, latest_uid }
    }

    /// Marks every item active if all are completed, otherwise marks every
    /// item completed
    #[must_use]
    pub fn with_all_toggled(&self) -> Self {
        let all_completed = self.items.iter().all(|item| item.completed);
        self.map_items(|item| TodoItem {
            completed: !all_completed,
            ..item.clone()
        })
    }

    /// Flips the completed flag of the matching item
    #[must_use]
    pub fn with_toggled(&self, id: &TodoId) -> Self {
        self.map_items(|item| {
            if &item.id == id {
                TodoItem {
                    completed: !item.completed,
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
    }

    /// Replaces the text of the matching item
    #[must_use]
    pub fn with_text(&self, id: &TodoId, text: &str) -> Self {
        self.map_items(|item| {
            if &item.id == id {
                TodoItem {
                    text: text.to_string(),
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
    }

    /// Removes the matching item
    #[must_use]
    pub fn without(&self, id: &TodoId) -> Self {
        self.retain(|item| &item.id != id)
    }

    /// Removes every completed item
    #[must_use]
    pub fn without_completed(&self) -> Self {
        self.retain(|item| !item.completed)
    }

    fn map_items(&self, f: impl Fn(&TodoItem) -> TodoItem) -> Self {
        Self {
            items: self.items.iter().map(f).collect(),
            latest_uid: self.latest_uid,
        }
    }

    fn retain(&self, keep: impl Fn(&TodoItem) -> bool) -> Self {
        Self {
            items: self.items.iter().filter(|&item| keep(item)).cloned().collect(),
            latest_uid: self.latest_uid,
        }
    }
}

/// User intents accepted by the view-model
///
/// Serialized in snake case so scripts read naturally:
/// `"add_todo"`, `{"new_text_changed": "Buy milk"}`, `{"set_filter": "Active"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoIntent {
    /// Append an item built from the pending text
    AddTodo,
    /// Replace the pending text
    NewTextChanged(String),
    /// Complete everything, or reactivate everything if all are completed
    ToggleAll,
    /// Flip one item's completed flag
    ToggleTodo(TodoId),
    /// Remove one item
    DeleteTodo(TodoId),
    /// Remove every completed item
    ClearCompleted,
    /// Choose which items are shown
    SetFilter(TodoFilter),
    /// Begin editing an item
    StartEditing(TodoId),
    /// Replace the edit buffer
    UpdateEditingText(String),
    /// Commit the edit buffer to an item and end the session
    SubmitEdit(TodoId),
    /// End the session without committing
    CancelEdit,
}

/// Point-in-time copy of every output signal
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoSnapshot {
    /// Full item list
    pub all_todos: Vec<TodoItem>,
    /// Pending input text
    pub new_todo_text: String,
    /// Selected filter
    pub current_filter: TodoFilter,
    /// Items admitted by the selected filter
    pub todos: Vec<TodoItem>,
    /// Item being edited, if any
    pub editing_item_id: Option<TodoId>,
    /// Edit buffer
    pub editing_text: String,
    /// Number of incomplete items
    pub active_count: usize,
    /// Number of completed items
    pub completed_count: usize,
}
