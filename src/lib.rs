pub mod backend;
pub mod config;
pub mod counters;
pub mod display;
pub mod errors;
pub mod interactions;
pub mod models;
pub mod page;
pub mod session;
pub mod storage;
pub mod tween;

#[cfg(test)]
mod testing;

pub use backend::{Backend, CounterBackend, InteractionBackend, LocalBackend, RemoteBackend};
pub use config::{BackendMode, Config};
pub use counters::CounterReconciler;
pub use errors::{ErrorKind, SyncError};
pub use interactions::InteractionStore;
pub use models::{CounterName, InteractionKey, InteractionState};
pub use page::{Page, Site};
pub use session::SessionGate;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tween::CounterDisplay;
