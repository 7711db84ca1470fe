//! In-process stand-in for the counting service, used by unit tests.

use crate::backend::{CounterBackend, InteractionBackend};
use crate::errors::SyncError;
use crate::models::{CounterName, InteractionAction, InteractionCounts, ToggleRequest};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct FakeService {
    counters: Mutex<HashMap<CounterName, u64>>,
    interactions: Mutex<InteractionCounts>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(self, counter: CounterName, count: u64) -> Self {
        self.counters.lock().unwrap().insert(counter, count);
        self
    }

    pub fn with_interaction(self, key: &str, count: u64) -> Self {
        self.interactions.lock().unwrap().insert(key.to_string(), count);
        self
    }

    pub fn set_interaction(&self, key: &str, count: u64) {
        self.interactions.lock().unwrap().insert(key.to_string(), count);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(call);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::network("connection refused"));
        }
        Ok(())
    }
}

impl CounterBackend for FakeService {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError> {
        self.record(format!("POST {}", counter.path()))?;
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(counter).or_default();
        *count += 1;
        Ok(*count)
    }

    async fn read(&self, counter: CounterName) -> Result<u64, SyncError> {
        self.record(format!("GET {}", counter.path()))?;
        Ok(self.counters.lock().unwrap().get(&counter).copied().unwrap_or(0))
    }
}

impl InteractionBackend for FakeService {
    fn is_authoritative(&self) -> bool {
        true
    }

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError> {
        self.record("GET /interactions".to_string())?;
        Ok(self.interactions.lock().unwrap().clone())
    }

    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError> {
        self.record(format!(
            "POST /interactions {}_{} {}",
            request.post_id,
            request.kind,
            request.action.as_str()
        ))?;
        let mut interactions = self.interactions.lock().unwrap();
        let count = interactions
            .entry(format!("{}_{}", request.post_id, request.kind))
            .or_default();
        *count = match request.action {
            InteractionAction::Add => *count + 1,
            InteractionAction::Remove => count.saturating_sub(1),
        };
        Ok(*count)
    }
}
