//! Page elements the counters render into.
//!
//! The core only ever writes an element's text and toggles the `active` and
//! `pop` classes; buttons additionally expose `postId`/`type` dataset entries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub const ACTIVE_CLASS: &str = "active";
pub const POP_CLASS: &str = "pop";

pub trait Element {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
    fn has_class(&self, class: &str) -> bool;
    fn set_class(&self, class: &str, enabled: bool);
}

pub trait Button: Element {
    type Count: Element;

    fn data(&self, name: &str) -> Option<String>;
    fn count(&self) -> &Self::Count;
}

#[derive(Debug, Default)]
struct ElementState {
    text: String,
    classes: BTreeSet<String>,
    frames: Vec<String>,
}

/// In-memory element. Clones are handles to the same element.
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    state: Arc<Mutex<ElementState>>,
}

impl MemoryElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let element = Self::new();
        element.lock().text = text.to_string();
        element
    }

    /// Every text value written so far, oldest first.
    pub fn frames(&self) -> Vec<String> {
        self.lock().frames.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Element for MemoryElement {
    fn text(&self) -> String {
        self.lock().text.clone()
    }

    fn set_text(&self, text: &str) {
        let mut state = self.lock();
        state.text = text.to_string();
        state.frames.push(text.to_string());
    }

    fn has_class(&self, class: &str) -> bool {
        self.lock().classes.contains(class)
    }

    fn set_class(&self, class: &str, enabled: bool) {
        let mut state = self.lock();
        if enabled {
            state.classes.insert(class.to_string());
        } else {
            state.classes.remove(class);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryButton {
    element: MemoryElement,
    count: MemoryElement,
    dataset: BTreeMap<String, String>,
}

impl MemoryButton {
    pub fn new(post_id: &str, kind: &str) -> Self {
        let mut dataset = BTreeMap::new();
        dataset.insert("postId".to_string(), post_id.to_string());
        dataset.insert("type".to_string(), kind.to_string());
        Self::with_dataset(dataset)
    }

    pub fn with_dataset(dataset: BTreeMap<String, String>) -> Self {
        Self {
            element: MemoryElement::new(),
            count: MemoryElement::with_text("0"),
            dataset,
        }
    }

    pub fn count_element(&self) -> &MemoryElement {
        &self.count
    }
}

impl Element for MemoryButton {
    fn text(&self) -> String {
        self.element.text()
    }

    fn set_text(&self, text: &str) {
        self.element.set_text(text);
    }

    fn has_class(&self, class: &str) -> bool {
        self.element.has_class(class)
    }

    fn set_class(&self, class: &str, enabled: bool) {
        self.element.set_class(class, enabled);
    }
}

impl Button for MemoryButton {
    type Count = MemoryElement;

    fn data(&self, name: &str) -> Option<String> {
        self.dataset.get(name).cloned()
    }

    fn count(&self) -> &MemoryElement {
        &self.count
    }
}
