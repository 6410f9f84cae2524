//! TodoMVC demo binary
//!
//! Replays a script of intents against the view-model and redraws the screen
//! whenever an output changes.
//!
//! ```text
//! todomvc [SCRIPT]
//! ```
//!
//! `SCRIPT` is a JSON-lines file with one intent per line, for example
//! `{"new_text_changed": "Buy milk"}` or `"add_todo"`. Blank lines and lines
//! starting with `#` are skipped. Without a script a built-in scenario runs.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use composable_signals_core::ViewModel;
use todomvc::{render, TodoFilter, TodoId, TodoIntent, TodoViewModel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todomvc=info,composable_signals_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let intents = match std::env::args_os().nth(1) {
        Some(path) => load_script(Path::new(&path))?,
        None => scenario(),
    };

    println!("=== TodoMVC ===\n");

    let mut vm = TodoViewModel::new().context("failed to build the view-model")?;
    let dirty = Rc::new(Cell::new(false));
    let _subscriptions = {
        let dirty = Rc::clone(&dirty);
        vm.outputs().subscribe_all(move || dirty.set(true))
    };

    println!("{}", render(&vm.snapshot()));
    for (position, intent) in intents.into_iter().enumerate() {
        println!(">>> {}", describe(&intent));
        let report = vm
            .send(intent)
            .with_context(|| format!("intent #{position} failed"))?;
        tracing::info!(step = report.step, changed = report.changed.len(), "Applied intent");

        if dirty.replace(false) {
            println!("{}", render(&vm.snapshot()));
        } else {
            println!("(no change)\n");
        }
    }

    println!("=== Demo Complete ===");
    Ok(())
}

fn load_script(path: &Path) -> anyhow::Result<Vec<TodoIntent>> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let mut intents = Vec::new();
    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let intent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: not an intent", path.display(), number + 1))?;
        intents.push(intent);
    }
    tracing::info!(intents = intents.len(), path = %path.display(), "Loaded script");
    Ok(intents)
}

fn scenario() -> Vec<TodoIntent> {
    let id = TodoId::from_uid;
    vec![
        TodoIntent::NewTextChanged("Buy milk".into()),
        TodoIntent::AddTodo,
        TodoIntent::NewTextChanged("Walk the dog".into()),
        TodoIntent::AddTodo,
        TodoIntent::NewTextChanged("Write documentation".into()),
        TodoIntent::AddTodo,
        TodoIntent::ToggleTodo(id(0)),
        TodoIntent::SetFilter(TodoFilter::Active),
        TodoIntent::StartEditing(id(2)),
        TodoIntent::UpdateEditingText("Write the README".into()),
        TodoIntent::SubmitEdit(id(2)),
        TodoIntent::SetFilter(TodoFilter::All),
        TodoIntent::AddTodo,
        TodoIntent::ClearCompleted,
        TodoIntent::ToggleAll,
        TodoIntent::ToggleAll,
        TodoIntent::DeleteTodo(id(1)),
    ]
}

fn describe(intent: &TodoIntent) -> String {
    serde_json::to_string(intent).unwrap_or_else(|_| format!("{intent:?}"))
}
