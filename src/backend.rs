//! Sources of authoritative counts.
//!
//! [`RemoteBackend`] talks to the counting service over HTTP; [`LocalBackend`]
//! keeps everything in per-browser storage. [`Backend`] picks one of them at
//! configuration time so callers stay generic over a single type.

use crate::errors::SyncError;
use crate::models::{CountResponse, CounterName, InteractionCounts, ToggleRequest};
use crate::storage::KeyValueStore;
use reqwest::{Client, RequestBuilder, Response, header};
use std::collections::HashMap;
use tracing::{debug, warn};

#[allow(async_fn_in_trait)]
pub trait CounterBackend {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError>;
    async fn read(&self, counter: CounterName) -> Result<u64, SyncError>;
}

#[allow(async_fn_in_trait)]
pub trait InteractionBackend {
    /// Whether counts come from this backend. When false the locally cached
    /// state is final and nothing is fetched or synced.
    fn is_authoritative(&self) -> bool;

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError>;
    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError>;
}

impl<B: CounterBackend + ?Sized> CounterBackend for &B {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError> {
        (**self).increment(counter).await
    }

    async fn read(&self, counter: CounterName) -> Result<u64, SyncError> {
        (**self).read(counter).await
    }
}

impl<B: InteractionBackend + ?Sized> InteractionBackend for &B {
    fn is_authoritative(&self) -> bool {
        (**self).is_authoritative()
    }

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError> {
        (**self).interaction_counts().await
    }

    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError> {
        (**self).toggle_interaction(request).await
    }
}

pub const INTERACTIONS_PATH: &str = "/interactions";

#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
}

impl RemoteBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_count(request: RequestBuilder) -> Result<u64, SyncError> {
        let response = ensure_success(request.send().await?)?;
        let body: CountResponse = response.json().await?;
        Ok(body.count)
    }
}

fn ensure_success(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::network(format!(
            "{} responded with {status}",
            response.url()
        )));
    }
    Ok(response)
}

impl CounterBackend for RemoteBackend {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError> {
        debug!(counter = %counter, "POST {}", counter.path());
        let request = self
            .client
            .post(self.url(counter.path()))
            .header(header::CONTENT_TYPE, "application/json");
        Self::fetch_count(request).await
    }

    async fn read(&self, counter: CounterName) -> Result<u64, SyncError> {
        debug!(counter = %counter, "GET {}", counter.path());
        Self::fetch_count(self.client.get(self.url(counter.path()))).await
    }
}

impl InteractionBackend for RemoteBackend {
    fn is_authoritative(&self) -> bool {
        true
    }

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError> {
        let response = self.client.get(self.url(INTERACTIONS_PATH)).send().await?;
        let counts: InteractionCounts = ensure_success(response)?.json().await?;
        Ok(counts)
    }

    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError> {
        let builder = self.client.post(self.url(INTERACTIONS_PATH)).json(request);
        Self::fetch_count(builder).await
    }
}

/// Counts kept as plain integers in durable storage, keyed by counter name.
#[derive(Debug, Clone)]
pub struct LocalBackend<S> {
    store: S,
}

impl<S: KeyValueStore> LocalBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn stored_count(&self, counter: CounterName) -> u64 {
        match self.store.get(counter.as_str()) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|err| {
                warn!(counter = %counter, "ignoring stored count '{raw}': {err}");
                0
            }),
            Ok(None) => 0,
            Err(err) => {
                warn!(counter = %counter, "stored count unreadable: {err}");
                0
            }
        }
    }
}

impl<S: KeyValueStore> CounterBackend for LocalBackend<S> {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError> {
        let next = self.stored_count(counter).saturating_add(1);
        self.store.set(counter.as_str(), &next.to_string())?;
        Ok(next)
    }

    async fn read(&self, counter: CounterName) -> Result<u64, SyncError> {
        Ok(self.stored_count(counter))
    }
}

impl<S: KeyValueStore> InteractionBackend for LocalBackend<S> {
    fn is_authoritative(&self) -> bool {
        false
    }

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError> {
        Ok(HashMap::new())
    }

    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError> {
        Err(SyncError::config(format!(
            "{}_{} has no remote counterpart in local-only mode",
            request.post_id, request.kind
        )))
    }
}

#[derive(Debug, Clone)]
pub enum Backend<S> {
    Remote(RemoteBackend),
    Local(LocalBackend<S>),
}

impl<S: KeyValueStore> CounterBackend for Backend<S> {
    async fn increment(&self, counter: CounterName) -> Result<u64, SyncError> {
        match self {
            Backend::Remote(remote) => remote.increment(counter).await,
            Backend::Local(local) => local.increment(counter).await,
        }
    }

    async fn read(&self, counter: CounterName) -> Result<u64, SyncError> {
        match self {
            Backend::Remote(remote) => remote.read(counter).await,
            Backend::Local(local) => local.read(counter).await,
        }
    }
}

impl<S: KeyValueStore> InteractionBackend for Backend<S> {
    fn is_authoritative(&self) -> bool {
        match self {
            Backend::Remote(remote) => remote.is_authoritative(),
            Backend::Local(local) => local.is_authoritative(),
        }
    }

    async fn interaction_counts(&self) -> Result<InteractionCounts, SyncError> {
        match self {
            Backend::Remote(remote) => remote.interaction_counts().await,
            Backend::Local(local) => local.interaction_counts().await,
        }
    }

    async fn toggle_interaction(&self, request: &ToggleRequest) -> Result<u64, SyncError> {
        match self {
            Backend::Remote(remote) => remote.toggle_interaction(request).await,
            Backend::Local(local) => local.toggle_interaction(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::{InteractionAction, InteractionKey};
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn local_increment_persists_under_counter_name() {
        let store = MemoryStore::new();
        let backend = LocalBackend::new(&store);
        assert_eq!(backend.increment(CounterName::SiteViews).await.unwrap(), 1);
        assert_eq!(backend.increment(CounterName::SiteViews).await.unwrap(), 2);
        assert_eq!(backend.read(CounterName::SiteViews).await.unwrap(), 2);
        assert_eq!(backend.read(CounterName::BlogViews).await.unwrap(), 0);
        assert_eq!(store.get("site-views").unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn local_read_defaults_when_storage_unavailable() {
        let store = MemoryStore::new();
        store.set("downloads", "4").unwrap();
        store.set_unavailable(true);
        let backend = LocalBackend::new(&store);
        assert_eq!(backend.read(CounterName::Downloads).await.unwrap(), 0);
        let err = backend.increment(CounterName::Downloads).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StorageUnavailable);
    }

    #[tokio::test]
    async fn local_backend_is_not_authoritative_for_interactions() {
        let backend = Backend::Local(LocalBackend::new(MemoryStore::new()));
        assert!(!backend.is_authoritative());
        assert!(backend.interaction_counts().await.unwrap().is_empty());
        let request = ToggleRequest::new(&InteractionKey::new("p1", "like"), InteractionAction::Add);
        assert!(backend.toggle_interaction(&request).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_failure() {
        let backend = RemoteBackend::new("http://127.0.0.1:9/");
        assert_eq!(backend.base_url(), "http://127.0.0.1:9");
        let err = backend.read(CounterName::SiteViews).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }
}
