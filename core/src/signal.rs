//! Typed handles onto graph nodes.
//!
//! Handles are reference-counted and cheap to clone. They read node values
//! without borrowing the [`Graph`](crate::Graph), which is what lets fold
//! handlers and view-model accessors sample signals freely.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::GraphError;

/// Graph-unique identifier of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) graph: u64,
    pub(crate) index: usize,
}

impl NodeId {
    /// Position of the node in its graph's creation order
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

pub(crate) struct SignalCell<T> {
    id: NodeId,
    name: String,
    committed: RefCell<T>,
    pending: RefCell<Option<T>>,
    version: Cell<u64>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_subscriber: Cell<u64>,
}

/// A continuously valued node.
///
/// Reads always return the value committed by the last completed step. During
/// a step that means fold handlers observe the pre-step snapshot.
pub struct Signal<T> {
    cell: Rc<SignalCell<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("value", &*self.cell.committed.borrow())
            .field("version", &self.cell.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub(crate) fn new(id: NodeId, name: String, initial: T) -> Self {
        Self {
            cell: Rc::new(SignalCell {
                id,
                name,
                committed: RefCell::new(initial),
                pending: RefCell::new(None),
                version: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber: Cell::new(0),
            }),
        }
    }

    /// Clone of the committed value
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.committed.borrow().clone()
    }

    /// Borrow the committed value without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.committed.borrow())
    }

    /// Number of committed changes since creation
    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.version.get()
    }

    /// Identifier of the underlying node
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.cell.id
    }

    /// Name given at creation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Whether two handles point at the same node
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Register a callback invoked after every committed change.
    ///
    /// Callbacks run in subscription order once the whole step has committed.
    /// The callback is detached when the returned guard is dropped.
    #[must_use = "dropping the Subscription detaches the callback immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let key = self.cell.next_subscriber.get();
        self.cell.next_subscriber.set(key + 1);
        self.cell
            .subscribers
            .borrow_mut()
            .push((key, Rc::new(callback)));

        let weak: Weak<SignalCell<T>> = Rc::downgrade(&self.cell);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(cell) = weak.upgrade() {
                    cell.subscribers.borrow_mut().retain(|(k, _)| *k != key);
                }
            })),
        }
    }

    /// Borrow the value as of the running step: pending if staged, committed otherwise.
    pub(crate) fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let pending = self.cell.pending.borrow();
        match pending.as_ref() {
            Some(value) => f(value),
            None => f(&self.cell.committed.borrow()),
        }
    }

    /// Stage a new value for this step. Returns `false` when it equals the
    /// committed value, in which case nothing is staged.
    pub(crate) fn stage(&self, value: T) -> bool {
        if *self.cell.committed.borrow() == value {
            self.cell.pending.borrow_mut().take();
            return false;
        }
        *self.cell.pending.borrow_mut() = Some(value);
        true
    }

    pub(crate) fn commit(&self) -> bool {
        let Some(value) = self.cell.pending.borrow_mut().take() else {
            return false;
        };
        *self.cell.committed.borrow_mut() = value;
        self.cell.version.set(self.cell.version.get() + 1);
        true
    }

    pub(crate) fn discard(&self) {
        self.cell.pending.borrow_mut().take();
    }

    pub(crate) fn notify(&self) {
        // Snapshot so callbacks may subscribe or unsubscribe while running.
        let callbacks: Vec<Callback<T>> = self
            .cell
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        let value = self.get();
        for callback in callbacks {
            callback(&value);
        }
    }

    /// Number of attached subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscribers.borrow().len()
    }
}

/// RAII guard for a [`Signal::subscribe`] callback
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Detach the callback now instead of at drop
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

pub(crate) struct EventCell<T> {
    id: NodeId,
    name: String,
    occurrence: RefCell<Option<T>>,
}

/// A discrete input node
pub struct Event<T> {
    cell: Rc<EventCell<T>>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .finish()
    }
}

impl<T: 'static> Event<T> {
    pub(crate) fn new(id: NodeId, name: String) -> Self {
        Self {
            cell: Rc::new(EventCell {
                id,
                name,
                occurrence: RefCell::new(None),
            }),
        }
    }

    /// Identifier of the underlying node
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.cell.id
    }

    /// Name given at creation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub(crate) fn stage(&self, payload: T) {
        *self.cell.occurrence.borrow_mut() = Some(payload);
    }

    /// Apply `f` to the payload if this event fired in the running step
    pub(crate) fn with_payload<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.cell.occurrence.borrow().as_ref().map(f)
    }

    pub(crate) fn clear(&self) {
        self.cell.occurrence.borrow_mut().take();
    }
}

/// A forward reference to a signal that is created later.
///
/// Fold handlers sometimes need to sample a signal whose own definition
/// samples the fold (for example an item list that reads an edit buffer, while
/// the edit buffer seeds itself from the item list). Create the loop first,
/// sample it from the handler, then [`bind`](Self::bind) it once the real
/// signal exists. [`Graph::fire`](crate::Graph::fire) refuses to step while
/// any loop is unbound.
pub struct SignalLoop<T> {
    graph: u64,
    name: Rc<str>,
    target: Rc<OnceCell<Signal<T>>>,
}

impl<T> Clone for SignalLoop<T> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            name: Rc::clone(&self.name),
            target: Rc::clone(&self.target),
        }
    }
}

impl<T> fmt::Debug for SignalLoop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalLoop")
            .field("name", &self.name)
            .field("bound", &self.target.get().is_some())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> SignalLoop<T> {
    pub(crate) fn new(graph: u64, name: String) -> Self {
        Self {
            graph,
            name: name.into(),
            target: Rc::new(OnceCell::new()),
        }
    }

    /// Point this loop at `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::AlreadyBound`] on a second bind and
    /// [`GraphError::ForeignNode`] if `signal` lives in another graph.
    pub fn bind(&self, signal: &Signal<T>) -> Result<(), GraphError> {
        if signal.id().graph != self.graph {
            return Err(GraphError::ForeignNode { node: signal.id() });
        }
        self.target
            .set(signal.clone())
            .map_err(|_| GraphError::AlreadyBound {
                name: self.name.to_string(),
            })
    }

    /// Committed value of the bound signal, `None` until bound
    #[must_use]
    pub fn sample(&self) -> Option<T> {
        self.target.get().map(Signal::get)
    }

    /// The bound signal, if any
    #[must_use]
    pub fn signal(&self) -> Option<Signal<T>> {
        self.target.get().cloned()
    }

    /// Whether [`bind`](Self::bind) has succeeded
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    /// Name given at creation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> NodeId {
        NodeId { graph: 0, index }
    }

    #[test]
    fn stage_equal_value_is_not_a_change() {
        let signal = Signal::new(id(0), "s".into(), 5);
        assert!(!signal.stage(5));
        assert!(!signal.commit());
        assert_eq!(signal.version(), 0);
    }

    #[test]
    fn commit_bumps_version_once() {
        let signal = Signal::new(id(0), "s".into(), 5);
        assert!(signal.stage(6));
        assert_eq!(signal.get(), 5, "staged value is not visible to get()");
        signal.with_current(|v| assert_eq!(*v, 6));
        assert!(signal.commit());
        assert_eq!(signal.get(), 6);
        assert_eq!(signal.version(), 1);
    }

    #[test]
    fn discard_drops_pending_value() {
        let signal = Signal::new(id(0), "s".into(), 1);
        signal.stage(2);
        signal.discard();
        assert!(!signal.commit());
        assert_eq!(signal.get(), 1);
    }

    #[test]
    fn subscription_detaches_on_drop() {
        let signal = Signal::new(id(0), "s".into(), 0);
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);
        let sub = signal.subscribe(move |v| seen_clone.set(*v));
        assert_eq!(signal.subscriber_count(), 1);

        signal.stage(3);
        signal.commit();
        signal.notify();
        assert_eq!(seen.get(), 3);

        drop(sub);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_detaches_only_that_callback() {
        let signal = Signal::new(id(0), "s".into(), 0);
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let sub_first = {
            let first = Rc::clone(&first);
            signal.subscribe(move |v| first.set(*v))
        };
        let _sub_second = {
            let second = Rc::clone(&second);
            signal.subscribe(move |v| second.set(*v))
        };

        sub_first.unsubscribe();
        assert_eq!(signal.subscriber_count(), 1);

        signal.stage(7);
        signal.commit();
        signal.notify();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 7);
    }

    #[test]
    fn loop_binds_once() {
        let signal = Signal::new(id(1), "target".into(), "x".to_string());
        let forward = SignalLoop::<String>::new(0, "forward".into());
        assert_eq!(forward.sample(), None);

        forward.bind(&signal).unwrap();
        assert_eq!(forward.sample().as_deref(), Some("x"));
        assert_eq!(
            forward.bind(&signal),
            Err(GraphError::AlreadyBound {
                name: "forward".into()
            })
        );
    }

    #[test]
    fn loop_rejects_foreign_signal() {
        let foreign = Signal::new(NodeId { graph: 9, index: 0 }, "f".into(), 0);
        let forward = SignalLoop::<i32>::new(0, "forward".into());
        assert!(matches!(
            forward.bind(&foreign),
            Err(GraphError::ForeignNode { .. })
        ));
    }
}
