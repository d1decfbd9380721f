use serde::{Deserialize, Serialize};

/// Arguments for a full fetch-and-write run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct AllowlistUpdateArgs {
    /// Print the generated allow-list to stdout instead of writing the output file
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub dry_run: bool,
}

impl AllowlistUpdateArgs {
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Arguments for rendering an allow-list from feed snapshots
///
/// Paths may be local files (optionally gzip/bzip2 compressed) or URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct AllowlistPreviewArgs {
    /// Registry delegation report snapshot
    #[cfg_attr(feature = "cli", clap(short, long, value_name = "PATH"))]
    pub delegation: String,

    /// Vendor egress range CSV snapshot; without it a single-source allow-list is rendered
    #[cfg_attr(feature = "cli", clap(short, long, value_name = "PATH"))]
    #[serde(default)]
    pub egress: Option<String>,
}

impl AllowlistPreviewArgs {
    pub fn new(delegation: impl Into<String>) -> Self {
        Self {
            delegation: delegation.into(),
            egress: None,
        }
    }

    pub fn with_egress(mut self, egress: impl Into<String>) -> Self {
        self.egress = Some(egress.into());
        self
    }
}
