use crate::backend::CounterBackend;
use crate::display::Element;
use crate::models::CounterName;
use crate::session::SessionGate;
use crate::storage::KeyValueStore;
use crate::tween::CounterDisplay;
use tracing::{error, info};

/// Keeps each named counter's display in line with its authoritative count.
pub struct CounterReconciler<B, S> {
    backend: B,
    gate: SessionGate<S>,
}

impl<B: CounterBackend, S: KeyValueStore> CounterReconciler<B, S> {
    pub fn new(backend: B, gate: SessionGate<S>) -> Self {
        Self { backend, gate }
    }

    pub fn gate(&self) -> &SessionGate<S> {
        &self.gate
    }

    /// Page-load entry point: counts the visit once per session, otherwise
    /// only reads. Failures leave the counter's placeholder on screen.
    pub async fn init<E: Element>(&self, counter: CounterName, display: &CounterDisplay<E>) {
        let should_increment = counter.counts_on_load() && !self.gate.has_acted(counter);

        let outcome = if should_increment {
            self.backend
                .increment(counter)
                .await
                .inspect(|_| self.gate.mark_acted(counter))
        } else {
            self.backend.read(counter).await
        };

        match outcome {
            Ok(count) => {
                info!(counter = %counter, count, counted = should_increment, "counter loaded");
                display.animate_to(count).await;
            }
            Err(err) => {
                error!(counter = %counter, "counter unavailable: {err}");
                display.set_text(counter.placeholder());
            }
        }
    }

    /// Explicit user action (e.g. a download click); always counts.
    pub async fn record<E: Element>(&self, counter: CounterName, display: &CounterDisplay<E>) {
        match self.backend.increment(counter).await {
            Ok(count) => {
                info!(counter = %counter, count, "counter recorded");
                display.animate_to(count).await;
            }
            Err(err) => error!(counter = %counter, "failed to record: {err}"),
        }
    }
}
