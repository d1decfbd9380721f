//! Feed parsers and address-range utilities.
//!
//! - [`delegation`]: registry delegation reports (`registry|cc|type|start|value|...`)
//! - [`egress`]: Apple iCloud Private Relay egress range CSV
//! - [`summarize`]: start/count ranges to CIDR blocks

pub mod delegation;
pub mod egress;
pub mod summarize;

pub use crate::datasets::delegation::{AddressFamily, DelegationParser, FeedRecord};
pub use crate::datasets::egress::{EgressParser, EgressRecord};
pub use crate::datasets::summarize::{address_count, exact_block, summarize_range};
