//! The signal graph and its step engine.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GraphError;
use crate::node::{
    Dependencies, EventNode, FlatMapNode, FoldHandler, FoldNode, MapNode, Node, StepContext,
};
use crate::signal::{Event, NodeId, Signal, SignalLoop};

static NEXT_GRAPH: AtomicU64 = AtomicU64::new(1);

struct LoopEntry {
    name: String,
    bound: Box<dyn Fn() -> bool>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Settled,
}

/// Summary of one completed step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Step number, starting at 1
    pub step: u64,
    /// The event that fired
    pub fired: NodeId,
    /// Signals whose committed value changed, in topological order
    pub changed: Vec<NodeId>,
}

impl StepReport {
    /// Whether `node` changed in this step
    #[must_use]
    pub fn touched(&self, node: NodeId) -> bool {
        self.changed.contains(&node)
    }

    /// Whether the step left every signal as it was
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.changed.is_empty()
    }
}

/// A single-threaded signal graph.
///
/// Nodes are only ever added, never removed. Every handle the graph returns
/// stays valid for the graph's lifetime.
pub struct Graph {
    id: u64,
    nodes: Vec<Box<dyn Node>>,
    loops: Vec<LoopEntry>,
    order: Option<Vec<usize>>,
    step: u64,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("loops", &self.loops.len())
            .field("step", &self.step)
            .finish()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            loops: Vec::new(),
            order: None,
            step: 0,
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of completed steps
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Name of a node, if it belongs to this graph
    #[must_use]
    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        self.index_of(node).ok().map(|index| self.nodes[index].name())
    }

    fn next_id(&self) -> NodeId {
        NodeId {
            graph: self.id,
            index: self.nodes.len(),
        }
    }

    fn push(&mut self, node: Box<dyn Node>) {
        tracing::trace!(node = %node.id(), name = node.name(), "Registered node");
        self.nodes.push(node);
        self.order = None;
    }

    fn index_of(&self, node: NodeId) -> Result<usize, GraphError> {
        if node.graph != self.id || node.index >= self.nodes.len() {
            return Err(GraphError::ForeignNode { node });
        }
        Ok(node.index)
    }

    /// Register a named input event
    pub fn event<T: 'static>(&mut self, name: impl Into<String>) -> Event<T> {
        let event = Event::new(self.next_id(), name.into());
        self.push(Box::new(EventNode {
            event: event.clone(),
        }));
        event
    }

    /// Start building an accumulator over events.
    ///
    /// Register handlers with [`FoldBuilder::on`], then call
    /// [`FoldBuilder::build`].
    pub fn fold<T>(&mut self, name: impl Into<String>, initial: T) -> FoldBuilder<'_, T>
    where
        T: Clone + PartialEq + 'static,
    {
        FoldBuilder {
            graph: self,
            name: name.into(),
            initial,
            events: Dependencies::new(),
            handlers: Vec::new(),
        }
    }

    /// A signal that takes the payload of every `event` occurrence
    pub fn hold<T>(&mut self, name: impl Into<String>, initial: T, event: &Event<T>) -> Signal<T>
    where
        T: Clone + PartialEq + 'static,
    {
        self.fold(name, initial).on(event, |_, next| next.clone()).build()
    }

    /// A signal derived from one source
    pub fn map<S, T>(
        &mut self,
        name: impl Into<String>,
        source: &Signal<S>,
        f: impl Fn(&S) -> T + 'static,
    ) -> Signal<T>
    where
        S: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let signal = Signal::new(self.next_id(), name.into(), source.with(&f));
        let source = source.clone();
        let sources = smallvec::smallvec![source.id()];
        self.push(Box::new(MapNode {
            signal: signal.clone(),
            sources,
            compute: Box::new(move || source.with_current(&f)),
        }));
        signal
    }

    /// A signal derived from two sources
    pub fn map2<A, B, T>(
        &mut self,
        name: impl Into<String>,
        a: &Signal<A>,
        b: &Signal<B>,
        f: impl Fn(&A, &B) -> T + 'static,
    ) -> Signal<T>
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let initial = a.with(|a| b.with(|b| f(a, b)));
        let signal = Signal::new(self.next_id(), name.into(), initial);
        let (a, b) = (a.clone(), b.clone());
        let sources = smallvec::smallvec![a.id(), b.id()];
        self.push(Box::new(MapNode {
            signal: signal.clone(),
            sources,
            compute: Box::new(move || a.with_current(|a| b.with_current(|b| f(a, b)))),
        }));
        signal
    }

    /// A signal that follows whichever signal `select` picks from `outer`.
    ///
    /// The selected signal becomes a dynamic dependency: it is settled before
    /// this node in every step, including the step in which the selection
    /// changes.
    pub fn flat_map<S, T>(
        &mut self,
        name: impl Into<String>,
        outer: &Signal<S>,
        select: impl Fn(&S) -> Signal<T> + 'static,
    ) -> Signal<T>
    where
        S: Clone + PartialEq + 'static,
        T: Clone + PartialEq + 'static,
    {
        let selected = outer.with(&select);
        let signal = Signal::new(self.next_id(), name.into(), selected.get());
        self.push(Box::new(FlatMapNode {
            signal: signal.clone(),
            outer: outer.clone(),
            select: Box::new(select),
            selected: RefCell::new(selected),
            reselected: RefCell::new(None),
        }));
        signal
    }

    /// A forward reference to a signal defined later; see [`SignalLoop`]
    pub fn signal_loop<T>(&mut self, name: impl Into<String>) -> SignalLoop<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let name = name.into();
        let forward = SignalLoop::new(self.id, name.clone());
        let probe = forward.clone();
        self.loops.push(LoopEntry {
            name,
            bound: Box::new(move || probe.is_bound()),
        });
        forward
    }

    /// Dependency order of every node: Kahn's algorithm over static edges
    /// plus each flat-map's currently selected inner signal, ties broken by
    /// creation order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] if the edges do not form a DAG, or
    /// [`GraphError::ForeignNode`] if a node depends on another graph's node.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        Ok(self
            .compute_order()?
            .into_iter()
            .map(|index| self.nodes[index].id())
            .collect())
    }

    fn compute_order(&self) -> Result<Vec<usize>, GraphError> {
        let count = self.nodes.len();
        let mut in_degree = vec![0_usize; count];
        let mut dependants: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, node) in self.nodes.iter().enumerate() {
            let mut deps = node.dependencies();
            deps.extend(node.wired_dependency());
            for dep in deps {
                let dep = self.index_of(dep)?;
                dependants[dep].push(index);
                in_degree[index] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(index))
            .collect();
        let mut order = Vec::with_capacity(count);

        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for &dependant in &dependants[index] {
                in_degree[dependant] -= 1;
                if in_degree[dependant] == 0 {
                    ready.push(Reverse(dependant));
                }
            }
        }

        if order.len() < count {
            let stuck = in_degree
                .iter()
                .position(|degree| *degree > 0)
                .unwrap_or_default();
            return Err(GraphError::Cycle {
                node: self.nodes[stuck].id(),
            });
        }

        Ok(order)
    }

    /// Fire `event` with `payload` and run one atomic step.
    ///
    /// On error nothing is committed and every staged value is discarded.
    ///
    /// # Errors
    ///
    /// - [`GraphError::ForeignNode`] if `event` belongs to another graph
    /// - [`GraphError::UnboundLoop`] if a [`SignalLoop`] was never bound
    /// - [`GraphError::Cycle`] if settling detects a dependency cycle
    #[tracing::instrument(skip(self, event, payload), fields(fired_event = event.name()), name = "graph_fire")]
    pub fn fire<T: 'static>(&mut self, event: &Event<T>, payload: T) -> Result<StepReport, GraphError> {
        let fired = event.id();
        self.index_of(fired)?;
        if let Some(unbound) = self.loops.iter().find(|entry| !(entry.bound)()) {
            return Err(GraphError::UnboundLoop {
                name: unbound.name.clone(),
            });
        }

        let order = match self.order.take() {
            Some(order) => order,
            None => self.compute_order()?,
        };

        event.stage(payload);
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut changed = vec![false; self.nodes.len()];

        let settled = order
            .iter()
            .try_for_each(|&index| self.settle(index, &mut marks, &mut changed, fired));
        if let Err(error) = settled {
            tracing::warn!(%error, "Abandoning step");
            for node in &self.nodes {
                node.discard();
            }
            self.order = Some(order);
            return Err(error);
        }

        let mut committed = Vec::new();
        let mut rewired = false;
        for &index in &order {
            let commit = self.nodes[index].commit();
            rewired |= commit.rewired;
            if commit.changed {
                committed.push(index);
            }
        }

        self.step += 1;
        self.order = if rewired { None } else { Some(order) };

        tracing::debug!(
            step = self.step,
            changed = committed.len(),
            rewired,
            "Step committed"
        );

        for &index in &committed {
            self.nodes[index].notify();
        }

        Ok(StepReport {
            step: self.step,
            fired,
            changed: committed
                .into_iter()
                .map(|index| self.nodes[index].id())
                .collect(),
        })
    }

    fn settle(
        &self,
        index: usize,
        marks: &mut [Mark],
        changed: &mut [bool],
        fired: NodeId,
    ) -> Result<(), GraphError> {
        match marks[index] {
            Mark::Settled => return Ok(()),
            Mark::InProgress => {
                return Err(GraphError::Cycle {
                    node: self.nodes[index].id(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[index] = Mark::InProgress;

        let node = &self.nodes[index];
        for dep in node.dependencies() {
            self.settle(self.index_of(dep)?, marks, changed, fired)?;
        }

        let dynamic = node.dynamic_dependency(&StepContext {
            fired,
            changed: &*changed,
        });
        if let Some(dep) = dynamic {
            self.settle(self.index_of(dep)?, marks, changed, fired)?;
        }

        let node_changed = node.settle(&StepContext {
            fired,
            changed: &*changed,
        });
        if node_changed {
            tracing::trace!(node = %node.id(), name = node.name(), "Node changed");
        }
        changed[index] = node_changed;
        marks[index] = Mark::Settled;
        Ok(())
    }
}

/// Builder returned by [`Graph::fold`]
pub struct FoldBuilder<'g, T> {
    graph: &'g mut Graph,
    name: String,
    initial: T,
    events: Dependencies,
    handlers: Vec<FoldHandler<T>>,
}

impl<T: Clone + PartialEq + 'static> FoldBuilder<'_, T> {
    /// Add a handler: `handler(&previous, &payload) -> next`.
    ///
    /// Reading any other signal inside the handler yields its value from
    /// before the step.
    #[must_use]
    pub fn on<E: 'static>(
        mut self,
        event: &Event<E>,
        handler: impl Fn(&T, &E) -> T + 'static,
    ) -> Self {
        if !self.events.contains(&event.id()) {
            self.events.push(event.id());
        }
        let event = event.clone();
        self.handlers
            .push(Box::new(move |prev: &T| {
                event.with_payload(|payload| handler(prev, payload))
            }));
        self
    }

    /// Register the fold and return its signal
    pub fn build(self) -> Signal<T> {
        let signal = Signal::new(self.graph.next_id(), self.name, self.initial);
        self.graph.push(Box::new(FoldNode {
            signal: signal.clone(),
            events: self.events,
            handlers: self.handlers,
        }));
        signal
    }
}
