//! # Composable Signals Testing
//!
//! Testing utilities and helpers for the Composable Signals architecture.
//!
//! This crate provides:
//! - [`ViewModelTest`]: Given-When-Then harness for view-models
//! - [`Recorder`]: captures the notifications a signal emits
//! - [`transitions`]: trace checking against named transition conditions
//! - [`properties`]: proptest helpers for intent sequences
//!
//! ## Example
//!
//! ```ignore
//! use composable_signals_testing::{transitions, ViewModelTest};
//!
//! #[test]
//! fn add_resets_pending_text() {
//!     ViewModelTest::new(TodoViewModel::new())
//!         .given_intents([TodoIntent::NewTextChanged("Buy milk".into())])
//!         .when_intent(TodoIntent::AddTodo)
//!         .then_view(|vm| assert_eq!(vm.new_todo_text(), ""))
//!         .run();
//! }
//! ```

pub mod recorder;
pub mod transitions;

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::strategy::Strategy;

    /// Sequences of up to `max_len` values drawn from `intent`
    pub fn intent_sequences<S: Strategy>(
        intent: S,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<S::Value>> {
        vec(intent, 0..=max_len)
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "composable_signals_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use recorder::Recorder;
pub use transitions::{check_trace, record_trace, transition, TraceError, Transition};
pub use view_model_test::{assertions, ViewModelTest};

#[cfg(test)]
mod tests {
    use super::*;
    use composable_signals_core::Graph;
    use proptest::prelude::*;

    #[test]
    fn recorder_skips_unchanged_steps() {
        init_test_tracing();
        let mut graph = Graph::new();
        let set = graph.event::<&'static str>("set");
        let value = graph.hold("value", "a", &set);
        let recorder = Recorder::attach(&value);

        graph.fire(&set, "a").unwrap();
        graph.fire(&set, "b").unwrap();
        graph.fire(&set, "c").unwrap();

        assert_eq!(recorder.values(), vec!["b", "c"]);
        assert_eq!(recorder.last(), Some("c"));
        recorder.clear();
        assert_eq!(recorder.count(), 0);
    }

    proptest! {
        #[test]
        fn intent_sequences_respect_max_len(seq in properties::intent_sequences(any::<u8>(), 5)) {
            prop_assert!(seq.len() <= 5);
        }
    }
}
