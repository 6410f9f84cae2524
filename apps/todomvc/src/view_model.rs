//! The TodoMVC view-model.
//!
//! Intents are events on a signal graph; every output the renderer reads is
//! a signal derived from them. The wiring, in dependency order:
//!
//! ```text
//! new_text_changed, add_todo ─────────────▶ new_todo_text
//! start_editing, update_editing_text,
//! cancel_edit, submit_edit ───────────────▶ editing_item_id, editing_text
//! add/toggle/delete/clear/submit ─────────▶ todo_list ─▶ all_todos ─┬▶ active_todos
//!                                                                   ├▶ completed_todos
//!                                                                   ├▶ active_count
//!                                                                   └▶ completed_count
//! set_filter ─▶ current_filter ─(flat_map over all/active/completed)─▶ todos
//! ```
//!
//! `todo_list` samples `new_todo_text` and `editing_text`; the edit-session
//! folds sample `todo_list` through a signal loop. All of
//! these samples read the values from before the step, so an add uses the text
//! that was pending when it fired and a submit uses the buffer that was
//! current when it fired.

use std::rc::Rc;

use composable_signals_core::{
    Event, Graph, GraphError, Signal, StepReport, Subscription, ViewModel,
};

use crate::types::{TodoFilter, TodoId, TodoIntent, TodoItem, TodoList, TodoSnapshot};

/// Input events, one per intent
#[derive(Clone, Debug)]
struct Intents {
    add_todo: Event<()>,
    new_text_changed: Event<String>,
    toggle_all: Event<()>,
    toggle_todo: Event<TodoId>,
    delete_todo: Event<TodoId>,
    clear_completed: Event<()>,
    set_filter: Event<TodoFilter>,
    start_editing: Event<TodoId>,
    update_editing_text: Event<String>,
    submit_edit: Event<TodoId>,
    cancel_edit: Event<()>,
}

impl Intents {
    fn register(graph: &mut Graph) -> Self {
        Self {
            add_todo: graph.event("add_todo"),
            new_text_changed: graph.event("new_text_changed"),
            toggle_all: graph.event("toggle_all"),
            toggle_todo: graph.event("toggle_todo"),
            delete_todo: graph.event("delete_todo"),
            clear_completed: graph.event("clear_completed"),
            set_filter: graph.event("set_filter"),
            start_editing: graph.event("start_editing"),
            update_editing_text: graph.event("update_editing_text"),
            submit_edit: graph.event("submit_edit"),
            cancel_edit: graph.event("cancel_edit"),
        }
    }
}

/// Handles to every output signal.
///
/// Cloning is cheap; clones observe the same nodes, so a renderer can hold
/// its own copy and read it from subscription callbacks.
#[derive(Clone, Debug)]
pub struct TodoOutputs {
    /// Full item list
    pub all_todos: Signal<Vec<TodoItem>>,
    /// Pending input text
    pub new_todo_text: Signal<String>,
    /// Selected filter
    pub current_filter: Signal<TodoFilter>,
    /// Items admitted by the selected filter
    pub todos: Signal<Vec<TodoItem>>,
    /// Item being edited, if any
    pub editing_item_id: Signal<Option<TodoId>>,
    /// Edit buffer
    pub editing_text: Signal<String>,
    /// Number of incomplete items
    pub active_count: Signal<usize>,
    /// Number of completed items
    pub completed_count: Signal<usize>,
}

impl TodoOutputs {
    /// Copy every output's committed value
    #[must_use]
    pub fn snapshot(&self) -> TodoSnapshot {
        TodoSnapshot {
            all_todos: self.all_todos.get(),
            new_todo_text: self.new_todo_text.get(),
            current_filter: self.current_filter.get(),
            todos: self.todos.get(),
            editing_item_id: self.editing_item_id.get(),
            editing_text: self.editing_text.get(),
            active_count: self.active_count.get(),
            completed_count: self.completed_count.get(),
        }
    }

    /// Call `on_change` after any step that changes any output.
    ///
    /// The callback may run several times for one step, once per changed
    /// output; callers that render should coalesce.
    #[must_use = "dropping the subscriptions detaches the callback"]
    pub fn subscribe_all(&self, on_change: impl Fn() + 'static) -> Vec<Subscription> {
        let on_change: Rc<dyn Fn()> = Rc::new(on_change);
        vec![
            watch(&self.all_todos, &on_change),
            watch(&self.new_todo_text, &on_change),
            watch(&self.current_filter, &on_change),
            watch(&self.todos, &on_change),
            watch(&self.editing_item_id, &on_change),
            watch(&self.editing_text, &on_change),
            watch(&self.active_count, &on_change),
            watch(&self.completed_count, &on_change),
        ]
    }
}

fn watch<T: Clone + PartialEq + 'static>(signal: &Signal<T>, on_change: &Rc<dyn Fn()>) -> Subscription {
    let on_change = Rc::clone(on_change);
    signal.subscribe(move |_| on_change())
}

/// The TodoMVC view-model
///
/// # Example
///
/// ```
/// use todomvc::{TodoId, TodoViewModel};
///
/// # fn main() -> Result<(), composable_signals_core::GraphError> {
/// let mut vm = TodoViewModel::new()?;
/// vm.new_text_changed("Buy milk")?;
/// vm.add_todo()?;
///
/// let todos = vm.all_todos().get();
/// assert_eq!(todos[0].id, TodoId::new("todo-0"));
/// assert_eq!(vm.new_todo_text().get(), "");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TodoViewModel {
    graph: Graph,
    intents: Intents,
    todo_list: Signal<TodoList>,
    outputs: TodoOutputs,
}

impl TodoViewModel {
    /// Build the graph
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the item-list loop cannot be bound, which
    /// only happens if the graph wiring itself is broken.
    pub fn new() -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        let intents = Intents::register(&mut graph);
        let list_loop = graph.signal_loop::<TodoList>("todo_list");

        let new_todo_text = graph
            .fold("new_todo_text", String::new())
            .on(&intents.new_text_changed, |_, text| text.clone())
            .on(&intents.add_todo, |_, ()| String::new())
            .build();

        // Starting an edit on an item that no longer exists leaves the
        // session exactly as it was.
        let editing_item_id = {
            let list = list_loop.clone();
            graph
                .fold("editing_item_id", None::<TodoId>)
                .on(&intents.start_editing, move |current, id| {
                    let exists = list.signal().is_some_and(|l| l.with(|l| l.contains(id)));
                    if exists { Some(id.clone()) } else { current.clone() }
                })
                .on(&intents.cancel_edit, |_, ()| None)
                .on(&intents.submit_edit, |_, _| None)
                .build()
        };

        let editing_text = {
            let list = list_loop.clone();
            let session = editing_item_id.clone();
            graph
                .fold("editing_text", String::new())
                .on(&intents.update_editing_text, move |current, text| {
                    if session.with(Option::is_some) {
                        text.clone()
                    } else {
                        current.clone()
                    }
                })
                .on(&intents.start_editing, move |current, id| {
                    list.signal()
                        .and_then(|l| l.with(|l| l.get(id).map(|item| item.text.clone())))
                        .unwrap_or_else(|| current.clone())
                })
                .on(&intents.cancel_edit, |_, ()| String::new())
                .on(&intents.submit_edit, |_, _| String::new())
                .build()
        };

        let todo_list = {
            let pending = new_todo_text.clone();
            let buffer = editing_text.clone();
            graph
                .fold("todo_list", TodoList::new())
                .on(&intents.add_todo, move |list, ()| {
                    pending.with(|text| list.with_added(text))
                })
                .on(&intents.toggle_all, |list, ()| list.with_all_toggled())
                .on(&intents.toggle_todo, |list, id| list.with_toggled(id))
                .on(&intents.delete_todo, |list, id| list.without(id))
                .on(&intents.clear_completed, |list, ()| list.without_completed())
                .on(&intents.submit_edit, move |list, id| {
                    buffer.with(|text| list.with_text(id, text))
                })
                .build()
        };
        list_loop.bind(&todo_list)?;

        let all_todos = graph.map("all_todos", &todo_list, |list| list.items().to_vec());
        let active_todos = graph.map("active_todos", &all_todos, |todos| filtered(todos, TodoFilter::Active));
        let completed_todos =
            graph.map("completed_todos", &all_todos, |todos| filtered(todos, TodoFilter::Completed));
        let active_count = graph.map("active_count", &all_todos, |todos| {
            todos.iter().filter(|item| !item.completed).count()
        });
        let completed_count = graph.map("completed_count", &all_todos, |todos| {
            todos.iter().filter(|item| item.completed).count()
        });

        let current_filter = graph.hold("current_filter", TodoFilter::All, &intents.set_filter);
        let todos = {
            let (all, active, completed) =
                (all_todos.clone(), active_todos, completed_todos);
            graph.flat_map("todos", &current_filter, move |filter| match filter {
                TodoFilter::All => all.clone(),
                TodoFilter::Active => active.clone(),
                TodoFilter::Completed => completed.clone(),
            })
        };

        tracing::debug!(nodes = graph.len(), "Built TodoMVC graph");

        Ok(Self {
            graph,
            intents,
            todo_list,
            outputs: TodoOutputs {
                all_todos,
                new_todo_text,
                current_filter,
                todos,
                editing_item_id,
                editing_text,
                active_count,
                completed_count,
            },
        })
    }

    // ========== Intents ==========

    /// Append an item built from the pending text, if any, and clear it
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn add_todo(&mut self) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.add_todo, ())
    }

    /// Replace the pending text
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn new_text_changed(&mut self, text: impl Into<String>) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.new_text_changed, text.into())
    }

    /// Complete every item, or reactivate every item if all are completed
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn toggle_all(&mut self) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.toggle_all, ())
    }

    /// Flip one item's completed flag
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn toggle_todo(&mut self, id: TodoId) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.toggle_todo, id)
    }

    /// Remove one item
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn delete_todo(&mut self, id: TodoId) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.delete_todo, id)
    }

    /// Remove every completed item
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn clear_completed(&mut self) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.clear_completed, ())
    }

    /// Choose which items `todos` shows
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn set_filter(&mut self, filter: TodoFilter) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.set_filter, filter)
    }

    /// Begin editing an item, seeding the buffer with its text.
    /// Does nothing if the item is absent.
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn start_editing(&mut self, id: TodoId) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.start_editing, id)
    }

    /// Replace the edit buffer; ignored while no edit is in progress
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn update_editing_text(&mut self, text: impl Into<String>) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.update_editing_text, text.into())
    }

    /// Write the edit buffer into the matching item and end the session
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn submit_edit(&mut self, id: TodoId) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.submit_edit, id)
    }

    /// End the session without committing
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from the step.
    pub fn cancel_edit(&mut self) -> Result<StepReport, GraphError> {
        self.graph.fire(&self.intents.cancel_edit, ())
    }

    // ========== Outputs ==========

    /// Full item list
    #[must_use]
    pub const fn all_todos(&self) -> &Signal<Vec<TodoItem>> {
        &self.outputs.all_todos
    }

    /// Pending input text
    #[must_use]
    pub const fn new_todo_text(&self) -> &Signal<String> {
        &self.outputs.new_todo_text
    }

    /// Selected filter
    #[must_use]
    pub const fn current_filter(&self) -> &Signal<TodoFilter> {
        &self.outputs.current_filter
    }

    /// Items admitted by the selected filter
    #[must_use]
    pub const fn todos(&self) -> &Signal<Vec<TodoItem>> {
        &self.outputs.todos
    }

    /// Item being edited, if any
    #[must_use]
    pub const fn editing_item_id(&self) -> &Signal<Option<TodoId>> {
        &self.outputs.editing_item_id
    }

    /// Edit buffer
    #[must_use]
    pub const fn editing_text(&self) -> &Signal<String> {
        &self.outputs.editing_text
    }

    /// Number of incomplete items
    #[must_use]
    pub const fn active_count(&self) -> &Signal<usize> {
        &self.outputs.active_count
    }

    /// Number of completed items
    #[must_use]
    pub const fn completed_count(&self) -> &Signal<usize> {
        &self.outputs.completed_count
    }

    /// Every output handle
    #[must_use]
    pub const fn outputs(&self) -> &TodoOutputs {
        &self.outputs
    }

    /// Copy every output's committed value
    #[must_use]
    pub fn snapshot(&self) -> TodoSnapshot {
        self.outputs.snapshot()
    }

    /// Last UID handed out, -1 before the first add
    #[must_use]
    pub fn latest_uid(&self) -> i64 {
        self.todo_list.with(TodoList::latest_uid)
    }
}

fn filtered(todos: &[TodoItem], filter: TodoFilter) -> Vec<TodoItem> {
    todos.iter().filter(|item| filter.admits(item)).cloned().collect()
}

impl ViewModel for TodoViewModel {
    type Intent = TodoIntent;

    fn send(&mut self, intent: TodoIntent) -> Result<StepReport, GraphError> {
        tracing::debug!(?intent, "Dispatching intent");
        match intent {
            TodoIntent::AddTodo => self.add_todo(),
            TodoIntent::NewTextChanged(text) => self.new_text_changed(text),
            TodoIntent::ToggleAll => self.toggle_all(),
            TodoIntent::ToggleTodo(id) => self.toggle_todo(id),
            TodoIntent::DeleteTodo(id) => self.delete_todo(id),
            TodoIntent::ClearCompleted => self.clear_completed(),
            TodoIntent::SetFilter(filter) => self.set_filter(filter),
            TodoIntent::StartEditing(id) => self.start_editing(id),
            TodoIntent::UpdateEditingText(text) => self.update_editing_text(text),
            TodoIntent::SubmitEdit(id) => self.submit_edit(id),
            TodoIntent::CancelEdit => self.cancel_edit(),
        }
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_signals_testing::{assertions, ViewModelTest};

    fn vm() -> TodoViewModel {
        TodoViewModel::new().unwrap()
    }

    fn add(text: &str) -> [TodoIntent; 2] {
        [TodoIntent::NewTextChanged(text.into()), TodoIntent::AddTodo]
    }

    #[test]
    fn test_add_todo_success() {
        ViewModelTest::new(vm())
            .given_intents([TodoIntent::NewTextChanged("Buy milk".into())])
            .when_intent(TodoIntent::AddTodo)
            .then_view(|vm| {
                assert_eq!(
                    vm.all_todos().get(),
                    vec![TodoItem::new(TodoId::new("todo-0"), "Buy milk")]
                );
                assert_eq!(vm.new_todo_text().get(), "");
                assert_eq!(vm.latest_uid(), 0);
            })
            .run();
    }

    #[test]
    fn test_add_empty_text_is_ignored() {
        let vm = vm();
        let list_id = vm.all_todos().id();
        ViewModelTest::new(vm)
            .given_intents([TodoIntent::NewTextChanged(String::new())])
            .when_intent(TodoIntent::AddTodo)
            .then_view(|vm| {
                assert!(vm.all_todos().get().is_empty());
                assert_eq!(vm.latest_uid(), -1);
            })
            .then_report(move |report| {
                assertions::assert_untouched(report, list_id);
                assertions::assert_quiet(report);
            })
            .run();
    }

    #[test]
    fn test_toggle_todo_flips_only_target() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .given_intents(add("b"))
            .when_intent(TodoIntent::ToggleTodo(TodoId::new("todo-1")))
            .then_view(|vm| {
                let todos = vm.all_todos().get();
                assert!(!todos[0].completed);
                assert!(todos[1].completed);
                assert_eq!(vm.active_count().get(), 1);
                assert_eq!(vm.completed_count().get(), 1);
            })
            .run();
    }

    #[test]
    fn test_delete_todo() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .given_intents(add("b"))
            .when_intent(TodoIntent::DeleteTodo(TodoId::new("todo-0")))
            .then_view(|vm| {
                let texts: Vec<_> = vm.all_todos().get().into_iter().map(|t| t.text).collect();
                assert_eq!(texts, vec!["b"]);
            })
            .run();
    }

    #[test]
    fn test_unknown_id_is_quiet() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .when_intent(TodoIntent::ToggleTodo(TodoId::new("todo-42")))
            .then_report(assertions::assert_quiet)
            .run();
    }

    #[test]
    fn test_filter_switches_todos() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .given_intents(add("b"))
            .given_intents([TodoIntent::ToggleTodo(TodoId::new("todo-0"))])
            .when_intent(TodoIntent::SetFilter(TodoFilter::Completed))
            .then_view(|vm| {
                let todos = vm.todos().get();
                assert_eq!(todos.len(), 1);
                assert_eq!(todos[0].text, "a");
                assert_eq!(vm.current_filter().get(), TodoFilter::Completed);
            })
            .run();
    }

    #[test]
    fn test_filtered_view_follows_list_changes() {
        ViewModelTest::new(vm())
            .given_intents([TodoIntent::SetFilter(TodoFilter::Active)])
            .given_intents(add("a"))
            .when_intent(TodoIntent::ToggleAll)
            .then_view(|vm| {
                assert!(vm.todos().get().is_empty());
                assert_eq!(vm.all_todos().get().len(), 1);
            })
            .run();
    }

    #[test]
    fn test_start_editing_seeds_buffer() {
        ViewModelTest::new(vm())
            .given_intents(add("Buy milk"))
            .when_intent(TodoIntent::StartEditing(TodoId::new("todo-0")))
            .then_view(|vm| {
                assert_eq!(vm.editing_item_id().get(), Some(TodoId::new("todo-0")));
                assert_eq!(vm.editing_text().get(), "Buy milk");
            })
            .run();
    }

    #[test]
    fn test_start_editing_missing_item_is_a_no_op() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .given_intents([
                TodoIntent::StartEditing(TodoId::new("todo-0")),
                TodoIntent::UpdateEditingText("draft".into()),
            ])
            .when_intent(TodoIntent::StartEditing(TodoId::new("todo-9")))
            .then_view(|vm| {
                assert_eq!(vm.editing_item_id().get(), Some(TodoId::new("todo-0")));
                assert_eq!(vm.editing_text().get(), "draft");
            })
            .then_report(assertions::assert_quiet)
            .run();
    }

    #[test]
    fn test_submit_edit_uses_buffer_at_submit_time() {
        ViewModelTest::new(vm())
            .given_intents(add("Buy milk"))
            .given_intents([
                TodoIntent::StartEditing(TodoId::new("todo-0")),
                TodoIntent::UpdateEditingText("Buy oat milk".into()),
            ])
            .when_intent(TodoIntent::SubmitEdit(TodoId::new("todo-0")))
            .then_view(|vm| {
                assert_eq!(vm.all_todos().get()[0].text, "Buy oat milk");
                assert_eq!(vm.editing_item_id().get(), None);
                assert_eq!(vm.editing_text().get(), "");
            })
            .run();
    }

    #[test]
    fn test_cancel_edit_keeps_text() {
        ViewModelTest::new(vm())
            .given_intents(add("Buy milk"))
            .given_intents([
                TodoIntent::StartEditing(TodoId::new("todo-0")),
                TodoIntent::UpdateEditingText("scrap this".into()),
            ])
            .when_intent(TodoIntent::CancelEdit)
            .then_view(|vm| {
                assert_eq!(vm.all_todos().get()[0].text, "Buy milk");
                assert_eq!(vm.editing_item_id().get(), None);
                assert_eq!(vm.editing_text().get(), "");
            })
            .run();
    }

    #[test]
    fn test_update_editing_text_ignored_when_idle() {
        ViewModelTest::new(vm())
            .when_intent(TodoIntent::UpdateEditingText("stray".into()))
            .then_view(|vm| assert_eq!(vm.editing_text().get(), ""))
            .then_report(assertions::assert_quiet)
            .run();
    }

    #[test]
    fn test_submit_without_session_writes_empty_buffer() {
        let vm = vm();
        let list_id = vm.all_todos().id();
        ViewModelTest::new(vm)
            .given_intents(add("keep me"))
            .when_intent(TodoIntent::SubmitEdit(TodoId::new("todo-0")))
            .then_view(|vm| {
                assert_eq!(vm.all_todos().get()[0].text, "");
                assert_eq!(vm.editing_item_id().get(), None);
            })
            .then_report(move |report| assertions::assert_touched(report, list_id))
            .run();
    }

    #[test]
    fn test_submit_with_other_id_edits_that_item_and_ends_session() {
        ViewModelTest::new(vm())
            .given_intents(add("a"))
            .given_intents(add("b"))
            .given_intents([
                TodoIntent::StartEditing(TodoId::new("todo-0")),
                TodoIntent::UpdateEditingText("x".into()),
            ])
            .when_intent(TodoIntent::SubmitEdit(TodoId::new("todo-1")))
            .then_view(|vm| {
                let texts: Vec<_> = vm.all_todos().get().into_iter().map(|t| t.text).collect();
                assert_eq!(texts, vec!["a", "x"]);
                assert_eq!(vm.editing_item_id().get(), None);
            })
            .run();
    }

    #[test]
    fn test_snapshot_matches_outputs() {
        let mut vm = vm();
        for intent in add("a") {
            vm.send(intent).unwrap();
        }
        let snapshot = vm.snapshot();
        assert_eq!(snapshot.all_todos, vm.all_todos().get());
        assert_eq!(snapshot.todos, snapshot.all_todos);
        assert_eq!(snapshot.active_count, 1);
        assert_eq!(snapshot.current_filter, TodoFilter::All);
    }
}
