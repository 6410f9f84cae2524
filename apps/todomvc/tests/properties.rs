//! Property tests for the TodoMVC view-model
//!
//! Random intent sequences are replayed against the view-model and checked
//! three ways: output invariants after every step, agreement with a plain
//! reference fold, and a trace check in which every observed step must match
//! one named user-level transition.

use composable_signals_core::ViewModel;
use composable_signals_testing::{check_trace, properties, record_trace, transition, Transition};
use proptest::prelude::*;
use todomvc::{TodoFilter, TodoId, TodoIntent, TodoItem, TodoSnapshot, TodoViewModel};

// ========== Strategies ==========

fn todo_id() -> impl Strategy<Value = TodoId> {
    (0_i64..6).prop_map(TodoId::from_uid)
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("Buy milk".to_string()),
        Just("Walk the dog".to_string()),
        "[a-z]{1,6}",
    ]
}

fn filter() -> impl Strategy<Value = TodoFilter> {
    prop_oneof![
        Just(TodoFilter::All),
        Just(TodoFilter::Active),
        Just(TodoFilter::Completed),
    ]
}

fn intent() -> impl Strategy<Value = TodoIntent> {
    prop_oneof![
        2 => Just(TodoIntent::AddTodo),
        3 => text().prop_map(TodoIntent::NewTextChanged),
        1 => Just(TodoIntent::ToggleAll),
        2 => todo_id().prop_map(TodoIntent::ToggleTodo),
        1 => todo_id().prop_map(TodoIntent::DeleteTodo),
        1 => Just(TodoIntent::ClearCompleted),
        1 => filter().prop_map(TodoIntent::SetFilter),
        2 => todo_id().prop_map(TodoIntent::StartEditing),
        2 => text().prop_map(TodoIntent::UpdateEditingText),
        2 => todo_id().prop_map(TodoIntent::SubmitEdit),
        1 => Just(TodoIntent::CancelEdit),
    ]
}

fn intents() -> impl Strategy<Value = Vec<TodoIntent>> {
    properties::intent_sequences(intent(), 40)
}

// ========== Reference model ==========

/// The whole screen as one plain struct updated in place
#[derive(Debug)]
struct Model {
    items: Vec<TodoItem>,
    latest_uid: i64,
    new_text: String,
    filter: TodoFilter,
    editing: Option<TodoId>,
    edit_text: String,
}

impl Model {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            latest_uid: -1,
            new_text: String::new(),
            filter: TodoFilter::All,
            editing: None,
            edit_text: String::new(),
        }
    }

    fn apply(&mut self, intent: &TodoIntent) {
        match intent {
            TodoIntent::AddTodo => {
                if !self.new_text.is_empty() {
                    self.latest_uid += 1;
                    let id = TodoId::from_uid(self.latest_uid);
                    self.items.push(TodoItem::new(id, self.new_text.clone()));
                }
                self.new_text.clear();
            }
            TodoIntent::NewTextChanged(text) => self.new_text.clone_from(text),
            TodoIntent::ToggleAll => {
                let all_completed = self.items.iter().all(|item| item.completed);
                for item in &mut self.items {
                    item.completed = !all_completed;
                }
            }
            TodoIntent::ToggleTodo(id) => {
                for item in self.items.iter_mut().filter(|item| &item.id == id) {
                    item.completed = !item.completed;
                }
            }
            TodoIntent::DeleteTodo(id) => self.items.retain(|item| &item.id != id),
            TodoIntent::ClearCompleted => self.items.retain(|item| !item.completed),
            TodoIntent::SetFilter(filter) => self.filter = *filter,
            TodoIntent::StartEditing(id) => {
                if let Some(item) = self.items.iter().find(|item| &item.id == id) {
                    self.editing = Some(id.clone());
                    self.edit_text.clone_from(&item.text);
                }
            }
            TodoIntent::UpdateEditingText(text) => {
                if self.editing.is_some() {
                    self.edit_text.clone_from(text);
                }
            }
            TodoIntent::SubmitEdit(id) => {
                for item in self.items.iter_mut().filter(|item| &item.id == id) {
                    item.text.clone_from(&self.edit_text);
                }
                self.editing = None;
                self.edit_text.clear();
            }
            TodoIntent::CancelEdit => {
                self.editing = None;
                self.edit_text.clear();
            }
        }
    }

    fn snapshot(&self) -> TodoSnapshot {
        let completed_count = self.items.iter().filter(|item| item.completed).count();
        TodoSnapshot {
            all_todos: self.items.clone(),
            new_todo_text: self.new_text.clone(),
            current_filter: self.filter,
            todos: self
                .items
                .iter()
                .filter(|item| self.filter.admits(item))
                .cloned()
                .collect(),
            editing_item_id: self.editing.clone(),
            editing_text: self.edit_text.clone(),
            active_count: self.items.len() - completed_count,
            completed_count,
        }
    }
}

// ========== Named transitions ==========

fn session_unchanged(a: &TodoSnapshot, b: &TodoSnapshot) -> bool {
    a.editing_item_id == b.editing_item_id && a.editing_text == b.editing_text
}

fn ids(items: &[TodoItem]) -> Vec<&TodoId> {
    items.iter().map(|item| &item.id).collect()
}

fn texts(items: &[TodoItem]) -> Vec<&str> {
    items.iter().map(|item| item.text.as_str()).collect()
}

fn user_transitions() -> Vec<Transition<TodoSnapshot>> {
    vec![
        transition("nothing happens", |a: &TodoSnapshot, b: &TodoSnapshot| a == b),
        transition("type new text", |a: &TodoSnapshot, b: &TodoSnapshot| {
            a.all_todos == b.all_todos
                && a.current_filter == b.current_filter
                && session_unchanged(a, b)
                && a.new_todo_text != b.new_todo_text
        }),
        transition("add item", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let Some((added, kept)) = b.all_todos.split_last() else {
                return false;
            };
            !a.new_todo_text.is_empty()
                && kept == a.all_todos.as_slice()
                && added.text == a.new_todo_text
                && !added.completed
                && !a.all_todos.iter().any(|item| item.id == added.id)
                && b.new_todo_text.is_empty()
                && session_unchanged(a, b)
        }),
        transition("toggle one item", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let flipped = a
                .all_todos
                .iter()
                .zip(&b.all_todos)
                .filter(|(x, y)| x.completed != y.completed)
                .count();
            ids(&a.all_todos) == ids(&b.all_todos)
                && texts(&a.all_todos) == texts(&b.all_todos)
                && flipped == 1
                && session_unchanged(a, b)
        }),
        transition("toggle all items", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let target = !a.all_todos.iter().all(|item| item.completed);
            ids(&a.all_todos) == ids(&b.all_todos)
                && texts(&a.all_todos) == texts(&b.all_todos)
                && b.all_todos.iter().all(|item| item.completed == target)
                && session_unchanged(a, b)
        }),
        transition("delete one item", |a: &TodoSnapshot, b: &TodoSnapshot| {
            a.all_todos.len() == b.all_todos.len() + 1
                && (0..a.all_todos.len()).any(|skip| {
                    a.all_todos
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| *index != skip)
                        .map(|(_, item)| item)
                        .eq(b.all_todos.iter())
                })
                && session_unchanged(a, b)
        }),
        transition("clear completed", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let active: Vec<_> = a.all_todos.iter().filter(|item| !item.completed).collect();
            b.all_todos.iter().eq(active) && session_unchanged(a, b)
        }),
        transition("change filter", |a: &TodoSnapshot, b: &TodoSnapshot| {
            a.all_todos == b.all_todos
                && a.current_filter != b.current_filter
                && session_unchanged(a, b)
        }),
        transition("start editing", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let Some(id) = &b.editing_item_id else {
                return false;
            };
            a.all_todos == b.all_todos
                && b.all_todos
                    .iter()
                    .any(|item| &item.id == id && item.text == b.editing_text)
        }),
        transition("edit text", |a: &TodoSnapshot, b: &TodoSnapshot| {
            a.editing_item_id.is_some()
                && a.editing_item_id == b.editing_item_id
                && a.all_todos == b.all_todos
        }),
        transition("finish editing", |a: &TodoSnapshot, b: &TodoSnapshot| {
            let rewritten = a
                .all_todos
                .iter()
                .zip(&b.all_todos)
                .filter(|(x, y)| x.text != y.text)
                .all(|(_, y)| y.text == a.editing_text);
            b.editing_item_id.is_none()
                && b.editing_text.is_empty()
                && ids(&a.all_todos) == ids(&b.all_todos)
                && rewritten
        }),
    ]
}

fn check_outputs(view: &TodoSnapshot) -> Result<(), TestCaseError> {
    prop_assert_eq!(view.active_count + view.completed_count, view.all_todos.len());

    let mut seen = std::collections::HashSet::new();
    for item in &view.all_todos {
        prop_assert!(seen.insert(&item.id), "duplicate id {}", item.id);
    }

    let expected: Vec<_> = view
        .all_todos
        .iter()
        .filter(|item| view.current_filter.admits(item))
        .cloned()
        .collect();
    prop_assert_eq!(&view.todos, &expected);

    if view.editing_item_id.is_none() {
        prop_assert!(view.editing_text.is_empty());
    }
    Ok(())
}

proptest! {
    #[test]
    fn outputs_hold_invariants_after_every_step(intents in intents()) {
        let mut vm = TodoViewModel::new().unwrap();
        for intent in intents {
            vm.send(intent).unwrap();
            check_outputs(&vm.snapshot())?;
        }
    }

    #[test]
    fn view_model_agrees_with_reference_model(intents in intents()) {
        let mut vm = TodoViewModel::new().unwrap();
        let mut model = Model::new();
        for intent in intents {
            model.apply(&intent);
            vm.send(intent.clone()).unwrap();
            prop_assert_eq!(vm.snapshot(), model.snapshot(), "after {:?}", intent);
            prop_assert_eq!(vm.latest_uid(), model.latest_uid);
        }
    }

    #[test]
    fn every_step_is_a_named_transition(intents in intents()) {
        let mut vm = TodoViewModel::new().unwrap();
        let trace = record_trace(&mut vm, intents, TodoViewModel::snapshot).unwrap();
        let result = check_trace(&trace, |s| *s == TodoSnapshot::default(), &user_transitions());
        prop_assert!(result.is_ok(), "{}", result.unwrap_err());
    }

    #[test]
    fn toggling_twice_restores_item(intents in intents(), target in todo_id()) {
        let mut vm = TodoViewModel::new().unwrap();
        for intent in intents {
            vm.send(intent).unwrap();
        }
        let before = vm.all_todos().get();
        vm.send(TodoIntent::ToggleTodo(target.clone())).unwrap();
        vm.send(TodoIntent::ToggleTodo(target)).unwrap();
        prop_assert_eq!(vm.all_todos().get(), before);
    }

    #[test]
    fn edit_submit_sets_text(intents in intents(), new_text in text()) {
        let mut vm = TodoViewModel::new().unwrap();
        for intent in intents {
            vm.send(intent).unwrap();
        }
        let Some(target) = vm.all_todos().get().first().map(|item| item.id.clone()) else {
            return Ok(());
        };

        vm.send(TodoIntent::StartEditing(target.clone())).unwrap();
        vm.send(TodoIntent::UpdateEditingText(new_text.clone())).unwrap();
        vm.send(TodoIntent::SubmitEdit(target.clone())).unwrap();

        let todos = vm.all_todos().get();
        let item = todos.iter().find(|item| item.id == target).unwrap();
        prop_assert_eq!(&item.text, &new_text);
        prop_assert_eq!(vm.editing_item_id().get(), None);
        prop_assert_eq!(vm.editing_text().get(), "");
    }

    #[test]
    fn edit_cancel_keeps_text(intents in intents(), scratch in text()) {
        let mut vm = TodoViewModel::new().unwrap();
        for intent in intents {
            vm.send(intent).unwrap();
        }
        let before = vm.all_todos().get();
        let Some(target) = before.last().map(|item| item.id.clone()) else {
            return Ok(());
        };

        vm.send(TodoIntent::StartEditing(target)).unwrap();
        vm.send(TodoIntent::UpdateEditingText(scratch)).unwrap();
        vm.send(TodoIntent::CancelEdit).unwrap();

        prop_assert_eq!(vm.all_todos().get(), before);
        prop_assert_eq!(vm.editing_item_id().get(), None);
    }
}
