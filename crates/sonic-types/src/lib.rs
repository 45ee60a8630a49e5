//! Shared network address primitives for the olsrv2-core routing daemon.
//!
//! This crate provides type-safe representations of the address primitives
//! the routing core passes between its components:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses, also used as EUI-48
//!   interface identifiers
//! - [`IpAddress`] / [`IpPrefix`]: IPv4 and IPv6 addresses and CIDR prefixes
//!
//! These are deliberately dumb wrapper types: no routing semantics live
//! here, only parsing, formatting, and the bit-level predicates (multicast,
//! link-local, host route, ...) that the routing core builds on.

mod ip;
mod mac;

pub use ip::{IpAddress, IpPrefix, Ipv4Address, Ipv6Address};
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),
}
