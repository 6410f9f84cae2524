//! Plain-text rendering of the TodoMVC screen.
//!
//! ```text
//! todos
//! > What needs to be done?
//! [ ] Mark all as complete
//!   [x] Buy milk
//!   [ ] ✎ Walk the dog|
//! 1 item left   [All]   Active   Completed   Clear completed
//! ```
//!
//! The toggle-all line and the footer only appear once the list has items.
//! The item being edited shows the edit buffer instead of its text.

use std::fmt;

use crate::types::{TodoFilter, TodoItem, TodoSnapshot};

const PLACEHOLDER: &str = "What needs to be done?";
const FOOTER_GAP: &str = "   ";

/// Display adapter drawing a [`TodoSnapshot`]
#[derive(Clone, Copy, Debug)]
pub struct Screen<'a>(pub &'a TodoSnapshot);

/// Render `snapshot` as text
#[must_use]
pub fn render(snapshot: &TodoSnapshot) -> String {
    Screen(snapshot).to_string()
}

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        writeln!(f, "todos")?;
        if view.new_todo_text.is_empty() {
            writeln!(f, "> {PLACEHOLDER}")?;
        } else {
            writeln!(f, "> {}", view.new_todo_text)?;
        }

        if view.all_todos.is_empty() {
            return Ok(());
        }

        let all_completed = view.active_count == 0;
        writeln!(f, "{} Mark all as complete", checkbox(all_completed))?;
        for item in &view.todos {
            write_item(f, view, item)?;
        }
        write_footer(f, view)
    }
}

fn write_item(f: &mut fmt::Formatter<'_>, view: &TodoSnapshot, item: &TodoItem) -> fmt::Result {
    let marker = checkbox(item.completed);
    if view.editing_item_id.as_ref() == Some(&item.id) {
        writeln!(f, "  {marker} ✎ {}|", view.editing_text)
    } else {
        writeln!(f, "  {marker} {}", item.text)
    }
}

fn write_footer(f: &mut fmt::Formatter<'_>, view: &TodoSnapshot) -> fmt::Result {
    let noun = if view.active_count == 1 { "item" } else { "items" };
    write!(f, "{} {noun} left", view.active_count)?;
    for filter in TodoFilter::ALL {
        if filter == view.current_filter {
            write!(f, "{FOOTER_GAP}[{filter}]")?;
        } else {
            write!(f, "{FOOTER_GAP}{filter}")?;
        }
    }
    if view.completed_count > 0 {
        write!(f, "{FOOTER_GAP}Clear completed")?;
    }
    writeln!(f)
}

const fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}
