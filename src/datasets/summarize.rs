//! Address range summarization.
//!
//! Registry feeds describe allocations as a start address plus an address
//! count. [`summarize_range`] turns such a range into the minimal list of CIDR
//! blocks covering it, taking the largest aligned block from the low end each
//! step (`ipnet`'s subnet iterators).
//!
//! [`exact_block`] is what the allow-list uses: a range is kept only when it
//! collapses into one aligned block whose size is the requested count.
//! Ranges that need several blocks are dropped entirely.

use ipnet::{IpNet, Ipv4Subnets, Ipv6Subnets};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Minimal ordered set of CIDR blocks covering `count` addresses from `start`.
///
/// Returns an empty list when `count` is zero or the range runs past the end
/// of its address family.
pub fn summarize_range(start: IpAddr, count: u128) -> Vec<IpNet> {
    let Some(span) = count.checked_sub(1) else {
        return vec![];
    };

    match start {
        IpAddr::V4(first) => {
            let last = u128::from(u32::from(first)) + span;
            let Ok(last) = u32::try_from(last) else {
                return vec![];
            };
            Ipv4Subnets::new(first, Ipv4Addr::from(last), 0)
                .map(IpNet::V4)
                .collect()
        }
        IpAddr::V6(first) => {
            let Some(last) = u128::from(first).checked_add(span) else {
                return vec![];
            };
            Ipv6Subnets::new(first, Ipv6Addr::from(last), 0)
                .map(IpNet::V6)
                .collect()
        }
    }
}

/// The single block spanning exactly `count` addresses from `start`, if any.
pub fn exact_block(start: IpAddr, count: u128) -> Option<IpNet> {
    summarize_range(start, count)
        .into_iter()
        .find(|block| address_count(block) == Some(count))
}

/// Number of addresses in `net`; `None` for an IPv6 `/0`, which does not fit in `u128`.
pub fn address_count(net: &IpNet) -> Option<u128> {
    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    1u128.checked_shl(host_bits)
}
