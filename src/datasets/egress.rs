//! Apple iCloud Private Relay egress ranges.
//!
//! The feed is a header-less CSV with one already-normalized CIDR per row:
//!
//! ```text
//! 172.224.224.0/27,GB,GB-EN,London,
//! 2a02:26f7:b3c0:4000::/64,JP,JP-13,Tokyo,
//! ```
//!
//! Rows are matched by two independent grammars, one per address family, and
//! the CIDR column is passed through untouched.

use crate::datasets::delegation::AddressFamily;
use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One egress range row for the target country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRecord {
    /// CIDR exactly as published
    pub cidr: String,
    pub family: AddressFamily,
    pub country: String,
    pub locality: String,
    pub region: String,
}

pub struct EgressParser {
    ipv4_re: Regex,
    ipv6_re: Regex,
}

impl EgressParser {
    pub fn new(country_code: &str) -> Result<Self> {
        let cc = regex::escape(country_code);
        let ipv4_re = Regex::new(&format!(
            r"^(?P<cidr>[0-9]{{1,3}}(?:\.[0-9]{{1,3}}){{3}}/[0-9]{{1,2}}),(?P<country>{}),(?P<locality>[^,]*),(?P<region>[^,]*)",
            cc
        ))
        .map_err(|e| anyhow!("Failed to create IPv4 egress regex: {}", e))?;
        let ipv6_re = Regex::new(&format!(
            r"^(?P<cidr>[0-9a-fA-F]*:[0-9a-fA-F:]*/[0-9]{{1,3}}),(?P<country>{}),(?P<locality>[^,]*),(?P<region>[^,]*)",
            cc
        ))
        .map_err(|e| anyhow!("Failed to create IPv6 egress regex: {}", e))?;

        Ok(Self { ipv4_re, ipv6_re })
    }

    pub fn parse_line(&self, line: &str) -> Option<EgressRecord> {
        let (caps, family) = match self.ipv4_re.captures(line) {
            Some(caps) => (caps, AddressFamily::Ipv4),
            None => (self.ipv6_re.captures(line)?, AddressFamily::Ipv6),
        };

        Some(EgressRecord {
            cidr: caps["cidr"].to_string(),
            family,
            country: caps["country"].to_string(),
            locality: caps["locality"].to_string(),
            region: caps["region"].to_string(),
        })
    }

    /// All matching rows, in file order
    pub fn parse(&self, text: &str) -> Vec<EgressRecord> {
        text.lines().filter_map(|line| self.parse_line(line)).collect()
    }
}
