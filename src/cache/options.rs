//! Per-call options for the cache facade.

use std::time::Duration;

/// Write priority. Low priority values stay in the local tier only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Options for [`Cache::set`](crate::cache::Cache::set).
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Entry lifetime; the configured default when `None`
    pub ttl: Option<Duration>,
    /// Invalidation labels
    pub tags: Vec<String>,
    pub priority: Priority,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Options for [`Cache::get_or_fetch`](crate::cache::Cache::get_or_fetch).
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
    /// Skip the cached value and always call the fetch function
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub(crate) fn to_set_options(&self) -> SetOptions {
        SetOptions {
            ttl: self.ttl,
            tags: self.tags.clone(),
            priority: Priority::Normal,
        }
    }
}

/// Target of an invalidation: one exact key, or every entry carrying any of a set of tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(String),
    Tags(Vec<String>),
}

impl From<&str> for Invalidation {
    fn from(key: &str) -> Self {
        Invalidation::Key(key.to_string())
    }
}

impl From<String> for Invalidation {
    fn from(key: String) -> Self {
        Invalidation::Key(key)
    }
}

impl From<Vec<String>> for Invalidation {
    fn from(tags: Vec<String>) -> Self {
        Invalidation::Tags(tags)
    }
}

impl<const N: usize> From<[&str; N]> for Invalidation {
    fn from(tags: [&str; N]) -> Self {
        Invalidation::Tags(tags.iter().map(|t| t.to_string()).collect())
    }
}

impl From<&[&str]> for Invalidation {
    fn from(tags: &[&str]) -> Self {
        Invalidation::Tags(tags.iter().map(|t| t.to_string()).collect())
    }
}
