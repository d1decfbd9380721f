#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! nginx-ipfilter - country allow-lists for nginx
//!
//! Pulls public address-range feeds, keeps the ranges registered to one
//! country, normalizes them to CIDR and writes an allow-list meant to be
//! included into an nginx `geo` block:
//!
//! ```text
//! # created at 2024-01-02T03:04:05.000000+00:00.
//! # from APNIC delegated-apnic-extended-latest (http://www.apnic.net/...)
//! 1.0.16.0/20 1;
//! ...
//! # from iCloud Private Relay egress-ip-ranges (https://mask-api.icloud.com/...)
//! 104.28.0.13/32 1;
//! ...
//! # EOF
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `lens-core` | Feed parsers, range summarizer, allow-list pipeline | `ureq`, `regex`, `ipnet`, `oneio` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | The `nginx-ipfilter` binary | All above + `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`config`]**: feed URLs, country code, output path and client identifier
//! - **[`datasets`]**: delegation report and egress CSV parsers, CIDR summarization
//! - **[`lens`]**: the allow-list pipeline (fetch all feeds, assemble, write once)
//!
//! # Example
//!
//! ```rust,ignore
//! use nginx_ipfilter::lens::allowlist::AllowlistLens;
//! use nginx_ipfilter::IpfilterConfig;
//!
//! let config = IpfilterConfig::new(&None)?;
//! let report = AllowlistLens::new(&config).update()?;
//! for section in &report.sections {
//!     println!("{}: {}", section.source, section.entries);
//! }
//! ```

pub mod config;

#[cfg(feature = "lens-core")]
pub mod datasets;

#[cfg(feature = "lens-core")]
pub mod lens;

pub use config::{IpfilterConfig, PipelineVariant};

#[cfg(feature = "lens-core")]
pub use lens::utils::OutputFormat;

#[cfg(feature = "lens-core")]
pub use lens::allowlist::{
    AllowlistDocument, AllowlistLens, AllowlistReport, FeedFetcher, FetchError, HttpFetcher,
};
