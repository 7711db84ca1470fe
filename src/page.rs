use crate::backend::{Backend, LocalBackend, RemoteBackend};
use crate::config::{BackendMode, Config};
use crate::counters::CounterReconciler;
use crate::display::{Button, Element, MemoryButton, MemoryElement};
use crate::errors::SyncError;
use crate::interactions::InteractionStore;
use crate::models::{CounterName, InteractionKey};
use crate::session::SessionGate;
use crate::storage::{FileStore, KeyValueStore};
use crate::tween::CounterDisplay;
use std::sync::Arc;
use tracing::info;

/// Elements on one page. Counters the page doesn't show are `None`.
pub struct Page<E, Btn> {
    pub site_views: Option<CounterDisplay<E>>,
    pub blog_views: Option<CounterDisplay<E>>,
    pub downloads: Option<CounterDisplay<E>>,
    pub buttons: Vec<Btn>,
}

impl<E: Element, Btn: Button> Page<E, Btn> {
    pub fn counter(&self, counter: CounterName) -> Option<&CounterDisplay<E>> {
        match counter {
            CounterName::SiteViews => self.site_views.as_ref(),
            CounterName::BlogViews => self.blog_views.as_ref(),
            CounterName::Downloads => self.downloads.as_ref(),
        }
    }

    pub fn button(&self, key: &InteractionKey) -> Option<&Btn> {
        self.buttons.iter().find(|button| {
            button.data("postId").as_deref() == Some(key.post_id.as_str())
                && button.data("type").as_deref() == Some(key.kind.as_str())
        })
    }
}

impl Page<MemoryElement, MemoryButton> {
    /// A page showing all three counters and one button per key.
    pub fn in_memory(reactions: &[InteractionKey]) -> Self {
        Self {
            site_views: Some(CounterDisplay::new(MemoryElement::new())),
            blog_views: Some(CounterDisplay::new(MemoryElement::new())),
            downloads: Some(CounterDisplay::new(MemoryElement::new())),
            buttons: reactions
                .iter()
                .map(|key| MemoryButton::new(&key.post_id, &key.kind))
                .collect(),
        }
    }
}

/// Composition root: one backend, one durable store, one session store.
pub struct Site<D, T> {
    backend: Backend<D>,
    durable: D,
    session: T,
}

impl Site<Arc<FileStore>, FileStore> {
    pub async fn open(config: &Config) -> Result<Self, SyncError> {
        config.validate()?;
        let durable = Arc::new(FileStore::durable(config.durable_path()).await);
        let session = FileStore::session(config.session_path(), config.session_idle()).await;
        info!(
            backend = ?config.backend,
            data_dir = %config.data_dir.display(),
            "site storage opened"
        );
        Ok(Self::new(config.backend, &config.api_url, durable, session))
    }

    /// Waits for both stores' queued writes.
    pub async fn flush(&self) {
        tokio::join!(self.durable.flush(), self.session.flush());
    }
}

impl<D: KeyValueStore + Clone, T: KeyValueStore> Site<D, T> {
    pub fn new(mode: BackendMode, api_url: &str, durable: D, session: T) -> Self {
        let backend = match mode {
            BackendMode::Remote => Backend::Remote(RemoteBackend::new(api_url)),
            BackendMode::Local => Backend::Local(LocalBackend::new(durable.clone())),
        };
        Self {
            backend,
            durable,
            session,
        }
    }

    pub fn counters(&self) -> CounterReconciler<&Backend<D>, &T> {
        CounterReconciler::new(&self.backend, SessionGate::new(&self.session))
    }

    pub fn interactions(&self) -> InteractionStore<&Backend<D>, &D> {
        InteractionStore::new(&self.backend, &self.durable)
    }

    /// Runs every initializer concurrently; each settles on its own.
    pub async fn on_page_ready<E: Element, Btn: Button>(&self, page: &Page<E, Btn>) {
        let counters = self.counters();
        let interactions = self.interactions();

        tokio::join!(
            init_counter(&counters, CounterName::SiteViews, page),
            init_counter(&counters, CounterName::BlogViews, page),
            init_counter(&counters, CounterName::Downloads, page),
            interactions.init(&page.buttons),
        );
    }
}

async fn init_counter<D, T, E, Btn>(
    counters: &CounterReconciler<&Backend<D>, &T>,
    counter: CounterName,
    page: &Page<E, Btn>,
) where
    D: KeyValueStore,
    T: KeyValueStore,
    E: Element,
    Btn: Button,
{
    if let Some(display) = page.counter(counter) {
        counters.init(counter, display).await;
    }
}
