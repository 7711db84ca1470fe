//! Per-post reaction buttons.
//!
//! Each key's [`InteractionState`] is held in memory for the life of the
//! store and written through to storage, so toggling keeps alternating even
//! when storage is unavailable.
//!
//! A toggle runs in two phases. The local phase updates the cached
//! [`InteractionState`], the button and storage synchronously; the
//! confirmation phase asks the counting service for the authoritative count
//! and may only overwrite `count`. `active` is owned by this browser and is
//! never taken from the server. Concurrent confirmations resolve as last
//! response wins.

use crate::backend::InteractionBackend;
use crate::display::{ACTIVE_CLASS, Button, Element, POP_CLASS};
use crate::models::{InteractionAction, InteractionKey, InteractionState, ToggleRequest};
use crate::storage::{KeyValueStore, load_json, save_json};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const POP_DURATION: Duration = Duration::from_millis(300);

/// Outcome of the local phase, carried into confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSync {
    pub key: InteractionKey,
    pub action: InteractionAction,
    pub optimistic: InteractionState,
}

pub struct InteractionStore<B, S> {
    backend: B,
    store: S,
    states: Mutex<HashMap<InteractionKey, InteractionState>>,
}

impl<B: InteractionBackend, S: KeyValueStore> InteractionStore<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Current state for `key`. The first lookup loads it from storage;
    /// missing or unreadable entries start from the default.
    pub fn state(&self, key: &InteractionKey) -> InteractionState {
        let cached = self.states().get(key).copied();
        if let Some(state) = cached {
            return state;
        }

        let state = match load_json(&self.store, &key.storage_key()) {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                warn!(key = %key, "interaction state unreadable: {err}");
                InteractionState::default()
            }
        };
        self.states().insert(key.clone(), state);
        state
    }

    fn save(&self, key: &InteractionKey, state: InteractionState) {
        self.states().insert(key.clone(), state);
        if let Err(err) = save_json(&self.store, &key.storage_key(), &state) {
            warn!(key = %key, "interaction state not persisted: {err}");
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<InteractionKey, InteractionState>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn init<Btn: Button>(&self, buttons: &[Btn]) {
        let keyed: Vec<(InteractionKey, &Btn)> = buttons
            .iter()
            .filter_map(|button| key_of(button).map(|key| (key, button)))
            .collect();
        if keyed.is_empty() {
            return;
        }

        let remote_counts = if self.backend.is_authoritative() {
            match self.backend.interaction_counts().await {
                Ok(counts) => Some(counts),
                Err(err) => {
                    error!("failed to load interactions: {err}");
                    None
                }
            }
        } else {
            None
        };

        for (key, button) in keyed {
            let mut state = self.state(&key);
            if let Some(counts) = &remote_counts {
                state.count = counts.get(&key.storage_key()).copied().unwrap_or(0);
                self.save(&key, state);
            }
            render(button, state);
        }
        info!(buttons = buttons.len(), "interactions rendered");
    }

    /// Local phase of a click. Returns `None` for buttons without a key.
    pub fn apply_local<Btn: Button>(&self, button: &Btn) -> Option<PendingSync> {
        let key = key_of(button)?;
        let current = self.state(&key);
        let action = current.next_action();
        let optimistic = current.toggled();

        self.save(&key, optimistic);
        render(button, optimistic);
        if action == InteractionAction::Add {
            button.set_class(POP_CLASS, true);
        }

        Some(PendingSync {
            key,
            action,
            optimistic,
        })
    }

    /// Confirmation phase. No-op when the local cache is authoritative.
    pub async fn confirm<Btn: Button>(&self, button: &Btn, pending: &PendingSync) {
        if !self.backend.is_authoritative() {
            return;
        }

        let request = ToggleRequest::new(&pending.key, pending.action);
        match self.backend.toggle_interaction(&request).await {
            Ok(count) => {
                if count != pending.optimistic.count {
                    debug!(
                        key = %pending.key,
                        guessed = pending.optimistic.count,
                        count,
                        "server count differs from optimistic guess"
                    );
                }
                button.count().set_text(&count.to_string());
                let mut cached = self.state(&pending.key);
                cached.count = count;
                self.save(&pending.key, cached);
            }
            Err(err) => error!(
                key = %pending.key,
                action = pending.action.as_str(),
                "interaction sync failed: {err}"
            ),
        }
    }

    pub async fn click<Btn: Button>(&self, button: &Btn) {
        let Some(pending) = self.apply_local(button) else {
            return;
        };
        let popped = pending.action == InteractionAction::Add;
        tokio::join!(clear_pop(button, popped), self.confirm(button, &pending));
    }
}

pub fn key_of<Btn: Button>(button: &Btn) -> Option<InteractionKey> {
    let post_id = button.data("postId").filter(|value| !value.is_empty());
    let kind = button.data("type").filter(|value| !value.is_empty());
    match (post_id, kind) {
        (Some(post_id), Some(kind)) => Some(InteractionKey::new(post_id, kind)),
        _ => {
            warn!("skipping interaction button without postId/type");
            None
        }
    }
}

fn render<Btn: Button>(button: &Btn, state: InteractionState) {
    button.count().set_text(&state.count.to_string());
    button.set_class(ACTIVE_CLASS, state.active);
}

async fn clear_pop<Btn: Button>(button: &Btn, popped: bool) {
    if popped {
        tokio::time::sleep(POP_DURATION).await;
        button.set_class(POP_CLASS, false);
    }
}
