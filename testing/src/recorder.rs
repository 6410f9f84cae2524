//! Subscription recorder for asserting on notifications.

use std::cell::RefCell;
use std::rc::Rc;

use composable_signals_core::{Signal, Subscription};

/// Records every value a signal notifies, in order.
///
/// Recording stops when the recorder is dropped.
///
/// # Example
///
/// ```
/// use composable_signals_core::Graph;
/// use composable_signals_testing::Recorder;
///
/// # fn main() -> Result<(), composable_signals_core::GraphError> {
/// let mut graph = Graph::new();
/// let set = graph.event::<i32>("set");
/// let value = graph.hold("value", 0, &set);
/// let recorder = Recorder::attach(&value);
///
/// graph.fire(&set, 1)?;
/// graph.fire(&set, 1)?;
/// graph.fire(&set, 2)?;
/// assert_eq!(recorder.values(), vec![1, 2]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Recorder<T> {
    values: Rc<RefCell<Vec<T>>>,
    _subscription: Subscription,
}

impl<T: Clone + PartialEq + 'static> Recorder<T> {
    /// Start recording `signal`'s notifications
    #[must_use]
    pub fn attach(signal: &Signal<T>) -> Self {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&values);
        let subscription = signal.subscribe(move |value: &T| sink.borrow_mut().push(value.clone()));
        Self {
            values,
            _subscription: subscription,
        }
    }

    /// Values recorded so far
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values.borrow().clone()
    }

    /// Number of notifications recorded
    #[must_use]
    pub fn count(&self) -> usize {
        self.values.borrow().len()
    }

    /// Most recent notification
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.values.borrow().last().cloned()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}
