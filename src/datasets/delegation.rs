//! Registry delegation report parsing.
//!
//! RIR statistics files carry one record per line:
//!
//! ```text
//! registry|cc|type|start|value|date|status[|extensions]
//! apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated|A92D9378
//! ```
//!
//! Only `ipv4`/`ipv6` records of the target country are extracted. Anything
//! else in the file (version header, summary lines, `asn` records, comments,
//! malformed rows) simply fails to match and is skipped.

use crate::datasets::summarize::exact_block;
use anyhow::{anyhow, Result};
use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "ipv4"),
            AddressFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// One address record from a delegation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub registry: String,
    pub country: String,
    pub family: AddressFamily,
    pub start: IpAddr,
    /// Number of addresses in the allocation
    pub count: u128,
    pub date: String,
    pub status: String,
    pub extensions: Option<String>,
}

impl FeedRecord {
    /// The allow-list block for this record: present only when the whole
    /// range is one aligned CIDR block.
    pub fn to_block(&self) -> Option<IpNet> {
        exact_block(self.start, self.count)
    }
}

/// Extracts [`FeedRecord`]s for one country from delegation report text
pub struct DelegationParser {
    country_code: String,
    record_re: Regex,
}

impl DelegationParser {
    pub fn new(country_code: &str) -> Result<Self> {
        let pattern = format!(
            r"^(?P<registry>[a-zA-Z]+)\|(?P<country>{})\|(?P<type>ipv4|ipv6)\|(?P<start>[0-9a-f.:]+)\|(?P<value>[0-9]+)\|(?P<date>[0-9]+)\|(?P<status>[a-zA-Z]+)\|?(?P<extensions>\S+)?$",
            regex::escape(country_code)
        );
        let record_re = Regex::new(&pattern)
            .map_err(|e| anyhow!("Failed to create delegation record regex: {}", e))?;
        Ok(Self {
            country_code: country_code.to_string(),
            record_re,
        })
    }

    pub fn country_code(&self) -> &str {
        self.country_code.as_str()
    }

    /// Parse a single line; `None` for anything that is not a usable record.
    pub fn parse_line(&self, line: &str) -> Option<FeedRecord> {
        let caps = self.record_re.captures(line)?;

        let family = match &caps["type"] {
            "ipv4" => AddressFamily::Ipv4,
            _ => AddressFamily::Ipv6,
        };
        let start: IpAddr = match family {
            AddressFamily::Ipv4 => IpAddr::V4(caps["start"].parse().ok()?),
            AddressFamily::Ipv6 => IpAddr::V6(caps["start"].parse().ok()?),
        };
        let count: u128 = caps["value"].parse().ok().filter(|c| *c > 0)?;

        Some(FeedRecord {
            registry: caps["registry"].to_string(),
            country: caps["country"].to_string(),
            family,
            start,
            count,
            date: caps["date"].to_string(),
            status: caps["status"].to_string(),
            extensions: caps.name("extensions").map(|m| m.as_str().to_string()),
        })
    }

    /// All matching records, in file order
    pub fn parse(&self, text: &str) -> Vec<FeedRecord> {
        text.lines().filter_map(|line| self.parse_line(line)).collect()
    }
}
