//! Trace checking for view-models.
//!
//! A *trace* is the sequence of observable states a view-model passes through
//! while replaying intents: one snapshot before the first intent and one after
//! each. [`check_trace`] verifies that the first snapshot satisfies an initial
//! condition and that every consecutive pair satisfies at least one of a set
//! of named transitions, which is how UI behaviour such as TodoMVC's is
//! usually phrased ("always: enter text, or add, or toggle, or ...").

use std::fmt::Debug;

use composable_signals_core::{GraphError, ViewModel};
use thiserror::Error;

/// A named condition over a `(current, next)` pair of states
pub struct Transition<S> {
    name: &'static str,
    holds: Box<dyn Fn(&S, &S) -> bool>,
}

impl<S> Transition<S> {
    /// Name used when reporting violations
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the condition holds between `current` and `next`
    #[must_use]
    pub fn holds(&self, current: &S, next: &S) -> bool {
        (self.holds)(current, next)
    }
}

impl<S> std::fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

/// Build a named transition condition
pub fn transition<S>(
    name: &'static str,
    holds: impl Fn(&S, &S) -> bool + 'static,
) -> Transition<S> {
    Transition {
        name,
        holds: Box::new(holds),
    }
}

/// Why a trace was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// The trace contained no states
    #[error("Trace is empty")]
    Empty,

    /// The first state failed the initial condition
    #[error("Initial state rejected: {state}")]
    Initial {
        /// Debug rendering of the state
        state: String,
    },

    /// No transition condition covered a step
    #[error("No transition allows step {step}:\n  current: {current}\n  next:    {next}")]
    Transition {
        /// Index of the step (1-based, matching the intent that caused it)
        step: usize,
        /// Debug rendering of the state before the step
        current: String,
        /// Debug rendering of the state after the step
        next: String,
    },

    /// A step failed while recording the trace
    #[error("Step failed while recording trace: {0}")]
    Graph(#[from] GraphError),
}

/// Verify a trace against an initial condition and a set of transitions
///
/// # Errors
///
/// Returns the first [`TraceError`] found, scanning from the start.
pub fn check_trace<S: Debug>(
    trace: &[S],
    initial: impl Fn(&S) -> bool,
    allowed: &[Transition<S>],
) -> Result<(), TraceError> {
    let first = trace.first().ok_or(TraceError::Empty)?;
    if !initial(first) {
        return Err(TraceError::Initial {
            state: format!("{first:?}"),
        });
    }

    for (step, pair) in trace.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        if !allowed.iter().any(|t| t.holds(current, next)) {
            return Err(TraceError::Transition {
                step: step + 1,
                current: format!("{current:?}"),
                next: format!("{next:?}"),
            });
        }
    }

    Ok(())
}

/// Replay `intents` and collect a snapshot before the first and after each
///
/// # Errors
///
/// Returns [`TraceError::Graph`] if the view-model rejects a step.
pub fn record_trace<V, S>(
    view_model: &mut V,
    intents: impl IntoIterator<Item = V::Intent>,
    snapshot: impl Fn(&V) -> S,
) -> Result<Vec<S>, TraceError>
where
    V: ViewModel,
{
    let mut trace = vec![snapshot(view_model)];
    for intent in intents {
        view_model.send(intent)?;
        trace.push(snapshot(view_model));
    }
    tracing::trace!(states = trace.len(), "Recorded trace");
    Ok(trace)
}
