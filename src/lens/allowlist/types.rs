use crate::config::PipelineVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display name of the registry delegation feed
pub const REGISTRY_FEED_NAME: &str = "APNIC delegated-apnic-extended-latest";

/// Display name of the vendor egress feed
pub const VENDOR_FEED_NAME: &str = "iCloud Private Relay egress-ip-ranges";

/// Weight token appended to every allow directive
pub const ALLOW_TOKEN: &str = "1;";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Pipe-separated registry delegation report
    Delegation,
    /// Vendor egress range CSV
    Egress,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Delegation => write!(f, "delegation"),
            FeedKind::Egress => write!(f, "egress"),
        }
    }
}

/// A feed to pull, in the order it is fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub kind: FeedKind,
    pub name: String,
    /// URL or local path the text was read from
    pub location: String,
}

impl Feed {
    pub fn registry(location: impl Into<String>) -> Self {
        Self {
            kind: FeedKind::Delegation,
            name: REGISTRY_FEED_NAME.to_string(),
            location: location.into(),
        }
    }

    pub fn vendor(location: impl Into<String>) -> Self {
        Self {
            kind: FeedKind::Egress,
            name: VENDOR_FEED_NAME.to_string(),
            location: location.into(),
        }
    }
}

/// CIDR entries extracted from one feed, in feed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSection {
    pub feed: Feed,
    pub entries: Vec<String>,
}

impl SourceSection {
    /// Allow directives for this section, without trailing newlines
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .map(|cidr| format!("{} {}", cidr, ALLOW_TOKEN))
    }
}

/// Everything that goes into one allow-list file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistDocument {
    pub created_at: DateTime<Utc>,
    pub variant: PipelineVariant,
    pub sections: Vec<SourceSection>,
}

impl AllowlistDocument {
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }
}

/// Per-feed line of a run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct SectionSummary {
    pub source: String,
    pub location: String,
    pub entries: usize,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistReport {
    /// Where the allow-list was written; `None` when it was only rendered
    pub output: Option<String>,
    pub created_at: String,
    pub variant: String,
    pub sections: Vec<SectionSummary>,
    pub total_entries: usize,
}

impl AllowlistReport {
    pub fn new(document: &AllowlistDocument, output: Option<String>) -> Self {
        Self {
            output,
            created_at: document.created_at.to_rfc3339(),
            variant: document.variant.to_string(),
            sections: document
                .sections
                .iter()
                .map(|s| SectionSummary {
                    source: s.feed.name.clone(),
                    location: s.feed.location.clone(),
                    entries: s.entries.len(),
                })
                .collect(),
            total_entries: document.entry_count(),
        }
    }
}
