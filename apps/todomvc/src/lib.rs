//! TodoMVC view-model built on a signal graph.
//!
//! Every piece of screen state is a signal derived from user intents:
//!
//! - Pending input text, reset when an item is added
//! - The item list: add, toggle, toggle all, delete, clear completed
//! - An edit session (item id plus edit buffer) that renames items
//! - The selected filter and the filtered view it picks
//! - Active and completed counts
//!
//! Intents are applied one atomic step at a time, so a renderer subscribed to
//! the outputs never sees a half-updated screen.
//!
//! # Quick Start
//!
//! ```
//! use todomvc::{render, TodoFilter, TodoId, TodoIntent, TodoViewModel};
//! use composable_signals_core::ViewModel;
//!
//! # fn main() -> Result<(), composable_signals_core::GraphError> {
//! let mut vm = TodoViewModel::new()?;
//!
//! vm.send(TodoIntent::NewTextChanged("Buy milk".into()))?;
//! vm.send(TodoIntent::AddTodo)?;
//! vm.send(TodoIntent::ToggleTodo(TodoId::new("todo-0")))?;
//! vm.send(TodoIntent::SetFilter(TodoFilter::Active))?;
//!
//! assert!(vm.todos().get().is_empty());
//! assert_eq!(vm.completed_count().get(), 1);
//! println!("{}", render(&vm.snapshot()));
//! # Ok(())
//! # }
//! ```

pub mod render;
pub mod types;
pub mod view_model;

// Re-export commonly used types
pub use render::{render, Screen};
pub use types::{TodoFilter, TodoId, TodoIntent, TodoItem, TodoList, TodoSnapshot};
pub use view_model::{TodoOutputs, TodoViewModel};
