//! Type-erased node drivers.
//!
//! The [`Graph`](crate::Graph) stores one driver per node. A driver owns the
//! typed handles it reads and writes, so settling never needs downcasts.

use std::cell::RefCell;

use smallvec::{smallvec, SmallVec};

use crate::signal::{Event, NodeId, Signal};

/// Dependency list of a node. Most nodes have one or two.
pub type Dependencies = SmallVec<[NodeId; 4]>;

/// Read-only view of the running step handed to drivers
pub struct StepContext<'a> {
    pub(crate) fired: NodeId,
    pub(crate) changed: &'a [bool],
}

impl StepContext<'_> {
    /// Whether `node` fired or changed earlier in this step
    #[must_use]
    pub fn changed(&self, node: NodeId) -> bool {
        node == self.fired || self.changed.get(node.index).copied().unwrap_or(false)
    }

    /// Whether any of `nodes` fired or changed earlier in this step
    #[must_use]
    pub fn any_changed(&self, nodes: &[NodeId]) -> bool {
        nodes.iter().any(|node| self.changed(*node))
    }
}

/// Outcome of committing one node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Commit {
    /// The committed value differs from the previous one
    pub changed: bool,
    /// The node's dynamic dependency moved to another node
    pub rewired: bool,
}

/// A node driver
pub trait Node {
    /// Identifier of the driven node
    fn id(&self) -> NodeId;

    /// Name given at creation
    fn name(&self) -> &str;

    /// Nodes that must settle before this one, fixed at creation
    fn dependencies(&self) -> Dependencies;

    /// Dependency chosen from this step's values, asked after the static
    /// dependencies have settled
    fn dynamic_dependency(&self, _cx: &StepContext<'_>) -> Option<NodeId> {
        None
    }

    /// Dynamic dependency as of the last committed step, used for ordering
    fn wired_dependency(&self) -> Option<NodeId> {
        None
    }

    /// Compute this step's value. Returns whether the value changed.
    fn settle(&self, cx: &StepContext<'_>) -> bool;

    /// Make this step's value current
    fn commit(&self) -> Commit;

    /// Drop anything staged by an abandoned step
    fn discard(&self);

    /// Run subscriber callbacks after a committed change
    fn notify(&self) {}
}

pub(crate) struct EventNode<T> {
    pub(crate) event: Event<T>,
}

impl<T: 'static> Node for EventNode<T> {
    fn id(&self) -> NodeId {
        self.event.id()
    }

    fn name(&self) -> &str {
        self.event.name()
    }

    fn dependencies(&self) -> Dependencies {
        SmallVec::new()
    }

    fn settle(&self, cx: &StepContext<'_>) -> bool {
        cx.fired == self.event.id()
    }

    fn commit(&self) -> Commit {
        self.event.clear();
        Commit::default()
    }

    fn discard(&self) {
        self.event.clear();
    }
}

/// Returns the next value if the handler's event fired this step
pub(crate) type FoldHandler<T> = Box<dyn Fn(&T) -> Option<T>>;

pub(crate) struct FoldNode<T> {
    pub(crate) signal: Signal<T>,
    pub(crate) events: Dependencies,
    pub(crate) handlers: Vec<FoldHandler<T>>,
}

impl<T: Clone + PartialEq + 'static> Node for FoldNode<T> {
    fn id(&self) -> NodeId {
        self.signal.id()
    }

    fn name(&self) -> &str {
        self.signal.name()
    }

    fn dependencies(&self) -> Dependencies {
        self.events.clone()
    }

    fn settle(&self, cx: &StepContext<'_>) -> bool {
        if !cx.any_changed(&self.events) {
            return false;
        }

        // Handlers for the same event chain in registration order.
        let mut next: Option<T> = None;
        for handler in &self.handlers {
            let stepped = match next.as_ref() {
                Some(value) => handler(value),
                None => self.signal.with(|prev| handler(prev)),
            };
            if stepped.is_some() {
                next = stepped;
            }
        }

        next.is_some_and(|value| self.signal.stage(value))
    }

    fn commit(&self) -> Commit {
        Commit {
            changed: self.signal.commit(),
            rewired: false,
        }
    }

    fn discard(&self) {
        self.signal.discard();
    }

    fn notify(&self) {
        self.signal.notify();
    }
}

pub(crate) struct MapNode<T> {
    pub(crate) signal: Signal<T>,
    pub(crate) sources: Dependencies,
    pub(crate) compute: Box<dyn Fn() -> T>,
}

impl<T: Clone + PartialEq + 'static> Node for MapNode<T> {
    fn id(&self) -> NodeId {
        self.signal.id()
    }

    fn name(&self) -> &str {
        self.signal.name()
    }

    fn dependencies(&self) -> Dependencies {
        self.sources.clone()
    }

    fn settle(&self, cx: &StepContext<'_>) -> bool {
        if !cx.any_changed(&self.sources) {
            return false;
        }
        self.signal.stage((self.compute)())
    }

    fn commit(&self) -> Commit {
        Commit {
            changed: self.signal.commit(),
            rewired: false,
        }
    }

    fn discard(&self) {
        self.signal.discard();
    }

    fn notify(&self) {
        self.signal.notify();
    }
}

pub(crate) struct FlatMapNode<S, T> {
    pub(crate) signal: Signal<T>,
    pub(crate) outer: Signal<S>,
    pub(crate) select: Box<dyn Fn(&S) -> Signal<T>>,
    pub(crate) selected: RefCell<Signal<T>>,
    pub(crate) reselected: RefCell<Option<Signal<T>>>,
}

impl<S, T> FlatMapNode<S, T>
where
    S: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    fn inner(&self) -> Signal<T> {
        self.reselected
            .borrow()
            .clone()
            .unwrap_or_else(|| self.selected.borrow().clone())
    }
}

impl<S, T> Node for FlatMapNode<S, T>
where
    S: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    fn id(&self) -> NodeId {
        self.signal.id()
    }

    fn name(&self) -> &str {
        self.signal.name()
    }

    fn dependencies(&self) -> Dependencies {
        smallvec![self.outer.id()]
    }

    fn dynamic_dependency(&self, cx: &StepContext<'_>) -> Option<NodeId> {
        if cx.changed(self.outer.id()) {
            let inner = self.outer.with_current(|outer| (self.select)(outer));
            let id = inner.id();
            let same = inner.same_node(&self.selected.borrow());
            *self.reselected.borrow_mut() = if same { None } else { Some(inner) };
            return Some(id);
        }
        Some(self.selected.borrow().id())
    }

    fn wired_dependency(&self) -> Option<NodeId> {
        Some(self.selected.borrow().id())
    }

    fn settle(&self, cx: &StepContext<'_>) -> bool {
        let inner = self.inner();
        if !cx.changed(self.outer.id()) && !cx.changed(inner.id()) {
            return false;
        }
        self.signal.stage(inner.with_current(Clone::clone))
    }

    fn commit(&self) -> Commit {
        let rewired = match self.reselected.borrow_mut().take() {
            Some(inner) => {
                *self.selected.borrow_mut() = inner;
                true
            }
            None => false,
        };
        Commit {
            changed: self.signal.commit(),
            rewired,
        }
    }

    fn discard(&self) {
        self.reselected.borrow_mut().take();
        self.signal.discard();
    }

    fn notify(&self) {
        self.signal.notify();
    }
}
