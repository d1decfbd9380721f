//! Allow-list serialization.
//!
//! ```text
//! # created at 2024-01-01T00:00:00.000000+00:00.
//! # from APNIC delegated-apnic-extended-latest (http://...)
//! 203.0.113.0/24 1;
//! # from iCloud Private Relay egress-ip-ranges (https://...)
//! 198.51.100.0/24 1;
//! # EOF
//! ```
//!
//! The single-source layout is the header followed directly by the registry
//! lines, with no section comment and no end marker.

use crate::config::PipelineVariant;
use crate::lens::allowlist::types::AllowlistDocument;
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use std::path::Path;
use tracing::info;

pub const EOF_MARKER: &str = "# EOF";

impl AllowlistDocument {
    pub fn header(&self) -> String {
        format!(
            "# created at {}.",
            self.created_at.to_rfc3339_opts(SecondsFormat::Micros, false)
        )
    }

    /// Full file contents, newline-terminated
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header());
        out.push('\n');

        for section in &self.sections {
            if self.variant == PipelineVariant::Multi {
                out.push_str(&format!(
                    "# from {} ({})\n",
                    section.feed.name, section.feed.location
                ));
            }
            for line in section.lines() {
                out.push_str(&line);
                out.push('\n');
            }
        }

        if self.variant == PipelineVariant::Multi {
            out.push_str(EOF_MARKER);
            out.push('\n');
        }
        out
    }

    /// Replace the contents of `path` with the rendered document.
    ///
    /// The file is truncated and written in place; a crash mid-write can leave
    /// it partial. Missing parent directories are created. Returns the number
    /// of allow directives written.
    pub fn write_to(&self, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory {}", parent.display()))?;
        }

        std::fs::write(path, self.render())
            .with_context(|| format!("Unable to write allow-list {}", path.display()))?;

        let count = self.entry_count();
        info!("wrote {} entries to {}", count, path.display());
        Ok(count)
    }
}
