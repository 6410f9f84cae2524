//! # Composable Signals Core
//!
//! A single-threaded, push-based signal graph for building view-models.
//!
//! The graph is made of two kinds of nodes:
//!
//! - **Events** ([`Event`]): discrete inputs that carry a payload only during the
//!   step in which they fire.
//! - **Signals** ([`Signal`]): continuously valued nodes. A signal is either an
//!   accumulator (`fold`/`hold`) over events, or a pure derivation
//!   (`map`/`map2`/`flat_map`) of other signals.
//!
//! ## Steps
//!
//! Every call to [`Graph::fire`] runs exactly one atomic *step*:
//!
//! 1. The fired event's payload is staged.
//! 2. Nodes are settled in topological order. Derivations read their sources
//!    as of this step; fold handlers that read other signals through
//!    [`Signal::get`] (or a [`SignalLoop`]) see the values committed *before* the
//!    step, regardless of where those signals sit in the order.
//! 3. All pending values are committed together, then subscribers are
//!    notified in topological order.
//!
//! A node whose recomputed value equals its committed value is unchanged: its
//! version does not move and its dependants are not dirtied.
//!
//! ## Example
//!
//! ```
//! use composable_signals_core::Graph;
//!
//! # fn main() -> Result<(), composable_signals_core::GraphError> {
//! let mut graph = Graph::new();
//! let increment = graph.event::<i64>("increment");
//! let reset = graph.event::<()>("reset");
//!
//! let count = graph
//!     .fold("count", 0_i64)
//!     .on(&increment, |count, by| count + by)
//!     .on(&reset, |_, ()| 0)
//!     .build();
//! let doubled = graph.map("doubled", &count, |count| count * 2);
//!
//! graph.fire(&increment, 3)?;
//! assert_eq!(doubled.get(), 6);
//!
//! graph.fire(&reset, ())?;
//! assert_eq!(count.get(), 0);
//! # Ok(())
//! # }
//! ```

pub mod graph;
mod node;
pub mod signal;

pub use graph::{FoldBuilder, Graph, StepReport};
pub use signal::{Event, NodeId, Signal, SignalLoop, Subscription};

/// Error types for the signal graph
pub mod error {
    use crate::signal::NodeId;
    use thiserror::Error;

    /// Errors raised while building or stepping a [`Graph`](crate::Graph)
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum GraphError {
        /// Settling reached a node that was already being settled.
        ///
        /// Only reachable through a [`SignalLoop`](crate::SignalLoop) selected by a
        /// flat-map, since every other dependency must exist before its dependant.
        #[error("Dependency cycle detected at node {node}")]
        Cycle {
            /// Node at which the cycle was detected
            node: NodeId,
        },

        /// A handle created by a different graph was passed to this one
        #[error("Node {node} belongs to a different graph")]
        ForeignNode {
            /// The offending node
            node: NodeId,
        },

        /// A step was attempted before every signal loop was bound
        #[error("Signal loop '{name}' was never bound")]
        UnboundLoop {
            /// Name given to the loop at creation
            name: String,
        },

        /// A signal loop was bound twice
        #[error("Signal loop '{name}' is already bound")]
        AlreadyBound {
            /// Name given to the loop at creation
            name: String,
        },
    }
}

pub use error::GraphError;

/// View-model module - the seam between intent sources and a signal graph
pub mod view_model {
    use crate::error::GraphError;
    use crate::graph::{Graph, StepReport};

    /// A view-model owns a [`Graph`] and maps user intents onto its events.
    ///
    /// Every intent is processed as one step; the returned [`StepReport`] lists
    /// the nodes whose values changed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl ViewModel for CounterViewModel {
    ///     type Intent = CounterIntent;
    ///
    ///     fn send(&mut self, intent: CounterIntent) -> Result<StepReport, GraphError> {
    ///         match intent {
    ///             CounterIntent::Increment => self.graph.fire(&self.increment, 1),
    ///         }
    ///     }
    ///
    ///     fn graph(&self) -> &Graph {
    ///         &self.graph
    ///     }
    /// }
    /// ```
    pub trait ViewModel {
        /// The intent type this view-model accepts
        type Intent;

        /// Process one intent as a single atomic step
        ///
        /// # Errors
        ///
        /// Returns [`GraphError`] if the underlying graph rejects the step.
        fn send(&mut self, intent: Self::Intent) -> Result<StepReport, GraphError>;

        /// The graph backing this view-model
        fn graph(&self) -> &Graph;
    }
}

pub use view_model::ViewModel;
