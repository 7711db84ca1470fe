use crate::models::CounterName;
use crate::storage::KeyValueStore;
use tracing::warn;

/// Remembers, per browsing session, which counters have already counted.
pub struct SessionGate<S> {
    store: S,
}

impl<S: KeyValueStore> SessionGate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unreadable storage reads as "not yet acted".
    pub fn has_acted(&self, counter: CounterName) -> bool {
        match self.store.get(&flag_key(counter)) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                warn!(counter = %counter, "session flag unreadable: {err}");
                false
            }
        }
    }

    pub fn mark_acted(&self, counter: CounterName) {
        if let Err(err) = self.store.set(&flag_key(counter), "true") {
            warn!(counter = %counter, "session flag not recorded: {err}");
        }
    }
}

fn flag_key(counter: CounterName) -> String {
    format!("acted:{}", counter.as_str())
}
