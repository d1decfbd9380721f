//! Allow-list lens
//!
//! Builds the nginx allow-list: fetch every configured feed, extract the
//! target country's ranges, normalize them to CIDR and write the result in one
//! pass.
//!
//! All feeds are fetched before anything is written, so a failed fetch leaves
//! the previous allow-list untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use nginx_ipfilter::lens::allowlist::AllowlistLens;
//! use nginx_ipfilter::IpfilterConfig;
//!
//! let config = IpfilterConfig::new(&None)?;
//! let lens = AllowlistLens::new(&config);
//!
//! let report = lens.update()?;
//! println!("{} entries written", report.total_entries);
//! ```

mod args;
mod fetch;
mod render;
mod types;

pub use args::{AllowlistPreviewArgs, AllowlistUpdateArgs};
pub use fetch::{FeedFetcher, FetchError, HttpFetcher};
pub use render::EOF_MARKER;
pub use types::{
    AllowlistDocument, AllowlistReport, Feed, FeedKind, SectionSummary, SourceSection,
    ALLOW_TOKEN, REGISTRY_FEED_NAME, VENDOR_FEED_NAME,
};

use crate::config::{IpfilterConfig, PipelineVariant};
use crate::datasets::{DelegationParser, EgressParser};
use crate::lens::utils::OutputFormat;
use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::{debug, info};

// =============================================================================
// Lens
// =============================================================================

/// Allow-list generation lens
///
/// Generic over the [`FeedFetcher`] so the pipeline can run against canned
/// feed text; [`AllowlistLens::new`] uses the HTTP fetcher.
pub struct AllowlistLens<'a, F: FeedFetcher = HttpFetcher> {
    config: &'a IpfilterConfig,
    fetcher: F,
}

impl<'a> AllowlistLens<'a, HttpFetcher> {
    pub fn new(config: &'a IpfilterConfig) -> Self {
        let fetcher = HttpFetcher::new(config.client_identifier.as_str());
        Self { config, fetcher }
    }
}

impl<'a, F: FeedFetcher> AllowlistLens<'a, F> {
    pub fn with_fetcher(config: &'a IpfilterConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Feeds in fetch order for the configured variant
    pub fn feeds(&self) -> Vec<Feed> {
        let mut feeds = vec![Feed::registry(self.config.registry_feed_url.as_str())];
        if self.config.variant == PipelineVariant::Multi {
            feeds.push(Feed::vendor(self.config.vendor_feed_url.as_str()));
        }
        feeds
    }

    /// Fetch every feed, then extract and normalize their entries.
    ///
    /// Fails on the first feed that cannot be fetched.
    pub fn collect(&self) -> Result<AllowlistDocument> {
        let mut fetched = Vec::new();
        for feed in self.feeds() {
            info!("fetching {}...", feed.name);
            let text = self.fetcher.fetch(&feed.name, &feed.location)?;
            fetched.push((feed, text));
        }
        self.assemble(fetched, self.config.variant)
    }

    /// Run the whole pipeline and overwrite the configured output file.
    pub fn update(&self) -> Result<AllowlistReport> {
        let document = self.collect()?;
        document.write_to(&self.config.output_path)?;
        Ok(AllowlistReport::new(
            &document,
            Some(self.config.output_path.to_string_lossy().to_string()),
        ))
    }

    /// Render an allow-list from feed snapshots read through `oneio`.
    ///
    /// Nothing is written. The layout is multi-source when an egress snapshot
    /// is given, single-source otherwise.
    pub fn preview(&self, args: &AllowlistPreviewArgs) -> Result<AllowlistDocument> {
        let mut snapshots = vec![(
            Feed::registry(args.delegation.as_str()),
            read_snapshot(&args.delegation)?,
        )];
        let variant = match &args.egress {
            Some(egress) => {
                snapshots.push((Feed::vendor(egress.as_str()), read_snapshot(egress)?));
                PipelineVariant::Multi
            }
            None => PipelineVariant::Single,
        };
        self.assemble(snapshots, variant)
    }

    /// Turn fetched feed text into sections, preserving feed and line order.
    pub fn assemble(
        &self,
        fetched: Vec<(Feed, String)>,
        variant: PipelineVariant,
    ) -> Result<AllowlistDocument> {
        let country = self.config.target_country_code.as_str();
        let delegation = DelegationParser::new(country)?;
        let egress = EgressParser::new(country)?;

        let sections = fetched
            .into_iter()
            .map(|(feed, text)| {
                let entries = match feed.kind {
                    FeedKind::Delegation => delegation_entries(&delegation, &text),
                    FeedKind::Egress => egress_entries(&egress, &text),
                };
                info!("{} - {} {} entries", feed.name, entries.len(), country);
                SourceSection { feed, entries }
            })
            .collect();

        Ok(AllowlistDocument {
            created_at: Utc::now(),
            variant,
            sections,
        })
    }

    /// Format a run report for display
    pub fn format_report(&self, report: &AllowlistReport, format: &OutputFormat) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Psv => {
                let mut lines = vec!["source|location|entries".to_string()];
                for s in &report.sections {
                    lines.push(format!("{}|{}|{}", s.source, s.location, s.entries));
                }
                lines.join("\n")
            }
            OutputFormat::Table | OutputFormat::Markdown => format_table(report, format),
        }
    }
}

fn delegation_entries(parser: &DelegationParser, text: &str) -> Vec<String> {
    let records = parser.parse(text);
    let entries: Vec<String> = records
        .iter()
        .filter_map(|r| r.to_block())
        .map(|block| block.to_string())
        .collect();
    debug!(
        "delegation: {} records matched, {} kept, {} dropped as multi-block ranges",
        records.len(),
        entries.len(),
        records.len() - entries.len()
    );
    entries
}

fn egress_entries(parser: &EgressParser, text: &str) -> Vec<String> {
    parser.parse(text).into_iter().map(|r| r.cidr).collect()
}

fn read_snapshot(path: &str) -> Result<String> {
    oneio::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read feed snapshot {}: {}", path, e))
}

#[cfg(feature = "display")]
fn format_table(report: &AllowlistReport, format: &OutputFormat) -> String {
    use tabled::settings::Style;
    use tabled::Table;

    let mut table = Table::new(&report.sections);
    match format {
        OutputFormat::Markdown => table.with(Style::markdown()),
        _ => table.with(Style::rounded()),
    };
    let mut out = table.to_string();
    if let Some(output) = &report.output {
        out.push_str(&format!("\n{} entries written to {}", report.total_entries, output));
    }
    out
}

#[cfg(not(feature = "display"))]
fn format_table(report: &AllowlistReport, _format: &OutputFormat) -> String {
    report
        .sections
        .iter()
        .map(|s| format!("{}: {} entries", s.source, s.entries))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    const REGISTRY_URL: &str = "http://registry.test/delegated-apnic-extended-latest";
    const VENDOR_URL: &str = "https://vendor.test/egress-ip-ranges.csv";

    const DELEGATION: &str = "2|apnic|20240101|1234|19830613|20231231|+1000
apnic|*|ipv4|*|45678|summary
APNIC|JP|ipv4|203.0.113.0|256|20200101|allocated
apnic|CN|ipv4|1.0.1.0|256|20110414|allocated|A92E1062
APNIC|JP|ipv4|203.0.113.5|10|20200101|allocated
apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated|A92D9378
apnic|JP|ipv6|2001:db8::|32|19990813|allocated|A91D6A8A
";

    const EGRESS: &str = "172.224.224.0/27,GB,GB-EN,London,
198.51.100.0/24,JP,true,east,
2a02:26f7:b3c0:4000::/64,JP,JP-13,Tokyo,
";

    /// Serves canned bodies keyed by URL and records the order of requests
    struct StubFetcher {
        bodies: HashMap<String, Result<String, String>>,
        requests: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn new(bodies: &[(&str, Result<&str, &str>)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| {
                        (
                            url.to_string(),
                            (*body).map(str::to_string).map_err(str::to_string),
                        )
                    })
                    .collect(),
                requests: RefCell::new(vec![]),
            }
        }
    }

    impl FeedFetcher for StubFetcher {
        fn fetch(&self, feed: &str, url: &str) -> Result<String, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            match self.bodies.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(msg)) => Err(FetchError::new(feed, url, msg.clone())),
                None => Err(FetchError::new(feed, url, "http status: 404")),
            }
        }
    }

    fn test_config(output: &Path, variant: PipelineVariant) -> IpfilterConfig {
        IpfilterConfig {
            registry_feed_url: REGISTRY_URL.to_string(),
            vendor_feed_url: VENDOR_URL.to_string(),
            output_path: output.to_path_buf(),
            variant,
            ..Default::default()
        }
    }

    /// Rendered file without the timestamp header
    fn body_of(rendered: &str) -> String {
        rendered.lines().skip(1).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_update_writes_both_sources_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("conf").join("nginx-ipfilter-jp.conf");
        let config = test_config(&output, PipelineVariant::Multi);
        let fetcher = StubFetcher::new(&[(REGISTRY_URL, Ok(DELEGATION)), (VENDOR_URL, Ok(EGRESS))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        let report = lens.update().unwrap();
        assert_eq!(report.total_entries, 5);
        assert_eq!(report.sections[0].entries, 3);
        assert_eq!(report.sections[1].entries, 2);
        assert_eq!(
            *lens.fetcher.requests.borrow(),
            vec![REGISTRY_URL.to_string(), VENDOR_URL.to_string()]
        );

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("# created at "));
        assert_eq!(
            body_of(&written),
            format!(
                "# from {} ({})\n\
                 203.0.113.0/24 1;\n\
                 1.0.16.0/20 1;\n\
                 2001:db8::/123 1;\n\
                 # from {} ({})\n\
                 198.51.100.0/24 1;\n\
                 2a02:26f7:b3c0:4000::/64 1;\n\
                 # EOF",
                REGISTRY_FEED_NAME, REGISTRY_URL, VENDOR_FEED_NAME, VENDOR_URL
            )
        );
    }

    #[test]
    fn test_single_source_skips_vendor_feed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("allow.conf");
        let config = test_config(&output, PipelineVariant::Single);
        let fetcher = StubFetcher::new(&[(REGISTRY_URL, Ok(DELEGATION))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        lens.update().unwrap();
        assert_eq!(*lens.fetcher.requests.borrow(), vec![REGISTRY_URL.to_string()]);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            body_of(&written),
            "203.0.113.0/24 1;\n1.0.16.0/20 1;\n2001:db8::/123 1;"
        );
    }

    #[test]
    fn test_unaligned_record_yields_no_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Single);
        let fetcher = StubFetcher::new(&[(
            REGISTRY_URL,
            Ok("APNIC|JP|ipv4|203.0.113.5|10|20200101|allocated\n"),
        )]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        let document = lens.collect().unwrap();
        assert_eq!(document.entry_count(), 0);
        assert_eq!(document.render().lines().count(), 1);
    }

    #[test]
    fn test_fetch_failure_leaves_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("allow.conf");
        std::fs::write(&output, "# previous run\n203.0.113.0/24 1;\n").unwrap();

        // registry succeeds, vendor fails: nothing is written
        let config = test_config(&output, PipelineVariant::Multi);
        let fetcher = StubFetcher::new(&[
            (REGISTRY_URL, Ok(DELEGATION)),
            (VENDOR_URL, Err("http status: 500")),
        ]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        let err = lens.update().unwrap_err();
        let fetch_err = err.downcast_ref::<FetchError>().unwrap();
        assert_eq!(fetch_err.feed, VENDOR_FEED_NAME);
        assert!(format!("{:#}", err).contains("http status: 500"));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "# previous run\n203.0.113.0/24 1;\n"
        );
    }

    #[test]
    fn test_registry_failure_stops_before_vendor_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("allow.conf");
        let config = test_config(&output, PipelineVariant::Multi);
        let fetcher = StubFetcher::new(&[(VENDOR_URL, Ok(EGRESS))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        assert!(lens.update().is_err());
        assert_eq!(*lens.fetcher.requests.borrow(), vec![REGISTRY_URL.to_string()]);
        assert!(!output.exists());
    }

    #[test]
    fn test_runs_are_identical_apart_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Multi);
        let fetcher = StubFetcher::new(&[(REGISTRY_URL, Ok(DELEGATION)), (VENDOR_URL, Ok(EGRESS))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        let first = lens.collect().unwrap().render();
        let second = lens.collect().unwrap().render();
        assert_eq!(body_of(&first), body_of(&second));
    }

    #[test]
    fn test_preview_from_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let delegation = dir.path().join("delegated.txt");
        let egress = dir.path().join("egress.csv");
        std::fs::write(&delegation, DELEGATION).unwrap();
        std::fs::write(&egress, EGRESS).unwrap();

        let config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Multi);
        let lens = AllowlistLens::with_fetcher(&config, StubFetcher::new(&[]));

        let args = AllowlistPreviewArgs::new(delegation.to_string_lossy());
        let single = lens.preview(&args).unwrap();
        assert_eq!(single.variant, PipelineVariant::Single);
        assert_eq!(single.entry_count(), 3);

        let multi = lens
            .preview(&args.with_egress(egress.to_string_lossy()))
            .unwrap();
        assert_eq!(multi.variant, PipelineVariant::Multi);
        assert_eq!(multi.sections[1].entries, vec!["198.51.100.0/24", "2a02:26f7:b3c0:4000::/64"]);
        assert!(lens.fetcher.requests.borrow().is_empty());
        assert!(!dir.path().join("allow.conf").exists());
    }

    #[test]
    fn test_preview_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Multi);
        let lens = AllowlistLens::with_fetcher(&config, StubFetcher::new(&[]));
        let args = AllowlistPreviewArgs::new(dir.path().join("nope.txt").to_string_lossy());
        assert!(lens.preview(&args).is_err());
    }

    #[test]
    fn test_other_country_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Single);
        config.target_country_code = "CN".to_string();
        let fetcher = StubFetcher::new(&[(REGISTRY_URL, Ok(DELEGATION))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);

        let document = lens.collect().unwrap();
        assert_eq!(document.sections[0].entries, vec!["1.0.1.0/24"]);
    }

    #[test]
    fn test_format_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("allow.conf"), PipelineVariant::Multi);
        let fetcher = StubFetcher::new(&[(REGISTRY_URL, Ok(DELEGATION)), (VENDOR_URL, Ok(EGRESS))]);
        let lens = AllowlistLens::with_fetcher(&config, fetcher);
        let report = lens.update().unwrap();

        let psv = lens.format_report(&report, &OutputFormat::Psv);
        assert_eq!(
            psv,
            format!(
                "source|location|entries\n{}|{}|3\n{}|{}|2",
                REGISTRY_FEED_NAME, REGISTRY_URL, VENDOR_FEED_NAME, VENDOR_URL
            )
        );

        let json: serde_json::Value =
            serde_json::from_str(&lens.format_report(&report, &OutputFormat::Json)).unwrap();
        assert_eq!(json["total_entries"], 5);
        assert_eq!(json["variant"], "multi");

        let table = lens.format_report(&report, &OutputFormat::Table);
        assert!(table.contains(REGISTRY_FEED_NAME));
    }
}
