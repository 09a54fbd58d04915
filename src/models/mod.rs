//! Core data model shared by the aggregation pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Separator between the region and category halves of a group label
pub const GROUP_SEPARATOR: &str = " | ";

/// One configured remote playlist, identified by its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub region: String,
}

impl Source {
    pub fn new<U: Into<String>, R: Into<String>>(url: U, region: R) -> Self {
        Self {
            url: url.into(),
            region: region.into(),
        }
    }
}

/// A (display name, stream URL) pair as it appears in a fetched playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub display_name: String,
    pub stream_url: String,
}

impl RawEntry {
    pub fn new<N: Into<String>, U: Into<String>>(display_name: N, stream_url: U) -> Self {
        Self {
            display_name: display_name.into(),
            stream_url: stream_url.into(),
        }
    }
}

/// Hierarchical classification label `"<region> | <category>"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Group {
    pub region: String,
    pub category: String,
}

impl Group {
    pub fn new<R: Into<String>, C: Into<String>>(region: R, category: C) -> Self {
        Self {
            region: region.into(),
            category: category.into(),
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.region, GROUP_SEPARATOR, self.category)
    }
}

impl FromStr for Group {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (region, category) = s
            .split_once('|')
            .ok_or_else(|| AppError::validation(format!("Group label '{s}' has no '|'")))?;
        let (region, category) = (region.trim(), category.trim());
        if region.is_empty() || category.is_empty() {
            return Err(AppError::validation(format!(
                "Group label '{s}' needs both a region and a category"
            )));
        }
        Ok(Self::new(region, category))
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.to_string()
    }
}

impl TryFrom<String> for Group {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A `(group, canonical name)` pair and every distinct stream URL seen for it
///
/// URLs keep first-seen order, so the earliest configured source that carried
/// a stream stays first in the rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub group: Group,
    pub name: String,
    pub urls: Vec<String>,
}

impl Channel {
    pub fn new(group: Group, name: String) -> Self {
        Self {
            group,
            name,
            urls: Vec::new(),
        }
    }

    /// Insert with set semantics; returns false if the URL was already present
    pub fn insert_url(&mut self, url: &str) -> bool {
        if self.urls.iter().any(|u| u == url) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }
}

pub type ChannelKey = (Group, String);

/// Complete set of channels produced by one rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPool {
    channels: BTreeMap<ChannelKey, Channel>,
}

impl ChannelPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a URL into the channel keyed by `(group, name)`, creating it if needed.
    /// Returns true if the URL was new for that channel.
    pub fn upsert(&mut self, group: Group, name: String, url: &str) -> bool {
        self.channels
            .entry((group.clone(), name.clone()))
            .or_insert_with(|| Channel::new(group, name))
            .insert_url(url)
    }

    pub fn get(&self, group: &Group, name: &str) -> Option<&Channel> {
        self.channels.get(&(group.clone(), name.to_string()))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Number of distinct `(group, name)` keys
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total number of URLs across all channels
    pub fn url_count(&self) -> usize {
        self.channels.values().map(|c| c.urls.len()).sum()
    }
}

/// What happens to a failure counter when its source fetches successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Forget the counter on any successful fetch
    #[default]
    ResetOnSuccess,
    /// Counters only ever grow
    Never,
}

/// What the failure ledger keys its counters on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureGranularity {
    #[default]
    PerSource,
    PerStreamUrl,
}

/// Why a rebuild was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTrigger {
    Startup,
    Scheduled,
    Manual,
    MissingOutput,
}

impl fmt::Display for BuildTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildTrigger::Startup => "startup",
            BuildTrigger::Scheduled => "scheduled",
            BuildTrigger::Manual => "manual",
            BuildTrigger::MissingOutput => "missing_output",
        };
        f.write_str(s)
    }
}
