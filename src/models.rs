use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CounterName {
    SiteViews,
    BlogViews,
    Downloads,
}

impl CounterName {
    pub const ALL: [CounterName; 3] = [
        CounterName::SiteViews,
        CounterName::BlogViews,
        CounterName::Downloads,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CounterName::SiteViews => "site-views",
            CounterName::BlogViews => "blog-views",
            CounterName::Downloads => "downloads",
        }
    }

    /// Endpoint path on the counting service.
    pub fn path(self) -> &'static str {
        match self {
            CounterName::SiteViews => "/",
            CounterName::BlogViews => "/blog",
            CounterName::Downloads => "/downloads",
        }
    }

    /// Whether a page load counts as an action for this counter.
    pub fn counts_on_load(self) -> bool {
        !matches!(self, CounterName::Downloads)
    }

    /// Text shown when the count could not be obtained.
    pub fn placeholder(self) -> &'static str {
        match self {
            CounterName::Downloads => "0",
            _ => "–",
        }
    }
}

impl fmt::Display for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionKey {
    pub post_id: String,
    pub kind: String,
}

impl InteractionKey {
    pub fn new(post_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            kind: kind.into(),
        }
    }

    /// `"{postId}_{type}"`, shared by the wire format and local storage.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.post_id, self.kind)
    }
}

impl fmt::Display for InteractionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.post_id, self.kind)
    }
}

/// Parses the `POST:TYPE` form used on the command line.
impl FromStr for InteractionKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((post_id, kind)) if !post_id.trim().is_empty() && !kind.trim().is_empty() => {
                Ok(Self::new(post_id.trim(), kind.trim()))
            }
            _ => Err(format!("expected POST:TYPE, got '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InteractionState {
    pub count: u64,
    pub active: bool,
}

impl InteractionState {
    pub fn next_action(&self) -> InteractionAction {
        if self.active {
            InteractionAction::Remove
        } else {
            InteractionAction::Add
        }
    }

    /// Local phase of a toggle. The count floors at zero.
    pub fn toggled(&self) -> Self {
        match self.next_action() {
            InteractionAction::Add => Self {
                count: self.count.saturating_add(1),
                active: true,
            },
            InteractionAction::Remove => Self {
                count: self.count.saturating_sub(1),
                active: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Add,
    Remove,
}

impl InteractionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionAction::Add => "add",
            InteractionAction::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    #[serde(rename = "postId")]
    pub post_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub action: InteractionAction,
}

impl ToggleRequest {
    pub fn new(key: &InteractionKey, action: InteractionAction) -> Self {
        Self {
            post_id: key.post_id.clone(),
            kind: key.kind.clone(),
            action,
        }
    }
}

/// Batched interaction counts keyed by `"{postId}_{type}"`.
pub type InteractionCounts = HashMap<String, u64>;
