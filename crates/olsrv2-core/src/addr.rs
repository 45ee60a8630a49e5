//! Shared network-address primitives (spec §3.1).
//!
//! [`NetAddr`] is the tagged union the rest of the core passes around:
//! IPv4/IPv6 addresses (with an associated prefix length), MAC-48
//! hardware addresses, and EUI-64 identifiers. It is distinct from a
//! socket address, which would additionally carry a port — nothing here
//! ever does.

use serde::{Deserialize, Serialize};
use sonic_types::{IpAddress, IpPrefix, MacAddress};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetAddr {
    V4(IpAddress, u8),
    V6(IpAddress, u8),
    Mac48(MacAddress),
    Eui64([u8; 8]),
}

impl NetAddr {
    pub fn from_ip(ip: IpAddress, prefix_len: u8) -> Self {
        if ip.is_ipv4() {
            NetAddr::V4(ip, prefix_len)
        } else {
            NetAddr::V6(ip, prefix_len)
        }
    }

    pub fn host(ip: IpAddress) -> Self {
        let len = if ip.is_ipv4() { 32 } else { 128 };
        Self::from_ip(ip, len)
    }

    pub fn mac(mac: MacAddress) -> Self {
        NetAddr::Mac48(mac)
    }

    pub fn eui64(bytes: [u8; 8]) -> Self {
        NetAddr::Eui64(bytes)
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, NetAddr::V4(..) | NetAddr::V6(..))
    }

    pub fn as_ip(&self) -> Option<IpAddress> {
        match self {
            NetAddr::V4(ip, _) | NetAddr::V6(ip, _) => Some(*ip),
            _ => None,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            NetAddr::V4(_, len) | NetAddr::V6(_, len) => *len,
            NetAddr::Mac48(_) => 48,
            NetAddr::Eui64(_) => 64,
        }
    }

    /// The address as a raw big-endian byte sequence, as wide as the
    /// family requires. Used by link-id generation and wire encoding.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            NetAddr::V4(ip, _) => ip.as_ipv4().map(|v| v.octets().to_vec()).unwrap_or_default(),
            NetAddr::V6(ip, _) => ip.as_ipv6().map(|v| v.octets().to_vec()).unwrap_or_default(),
            NetAddr::Mac48(mac) => mac.as_bytes().to_vec(),
            NetAddr::Eui64(b) => b.to_vec(),
        }
    }

    /// Converts an IP-family `NetAddr` into a host `IpPrefix` (`/32` or
    /// `/128`), for joining with the `sonic_types` prefix APIs.
    pub fn to_ip_prefix(&self) -> Option<IpPrefix> {
        self.as_ip()
            .map(|ip| IpPrefix::new(ip, self.prefix_len()).expect("family-consistent prefix len"))
    }
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetAddr::V4(ip, len) | NetAddr::V6(ip, len) => {
                if (ip.is_ipv4() && *len == 32) || (ip.is_ipv6() && *len == 128) {
                    write!(f, "{ip}")
                } else {
                    write!(f, "{ip}/{len}")
                }
            }
            NetAddr::Mac48(mac) => write!(f, "{mac}"),
            NetAddr::Eui64(b) => {
                let parts: Vec<String> = b.iter().map(|x| format!("{x:02x}")).collect();
                write!(f, "{}", parts.join(":"))
            }
        }
    }
}

/// Stable ordering across families: IPv4 < IPv6 < MAC48 < EUI64, then by
/// value. Used for router tie-breaks ("smaller originator in lexicographic
/// address order") and for deterministic iteration in snapshots.
impl PartialOrd for NetAddr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NetAddr {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(a: &NetAddr) -> u8 {
            match a {
                NetAddr::V4(..) => 0,
                NetAddr::V6(..) => 1,
                NetAddr::Mac48(_) => 2,
                NetAddr::Eui64(_) => 3,
            }
        }
        match (self, other) {
            (NetAddr::V4(a, la), NetAddr::V4(b, lb)) | (NetAddr::V6(a, la), NetAddr::V6(b, lb)) => {
                a.cmp(b).then(la.cmp(lb))
            }
            (NetAddr::Mac48(a), NetAddr::Mac48(b)) => a.as_bytes().cmp(b.as_bytes()),
            (NetAddr::Eui64(a), NetAddr::Eui64(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

/// `(dst_prefix, src_prefix)`; `src_prefix` is the all-zeros prefix of the
/// matching family when source-specific routing is unused (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub dst: IpPrefix,
    pub src: IpPrefix,
}

impl RouteKey {
    pub fn destination_only(dst: IpPrefix) -> Self {
        let src = IpPrefix::unspecified(dst.is_ipv6());
        RouteKey { dst, src }
    }

    pub fn source_specific(dst: IpPrefix, src: IpPrefix) -> Self {
        RouteKey { dst, src }
    }

    pub fn is_source_specific(&self) -> bool {
        self.src.prefix_len() != 0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_source_specific() {
            write!(f, "{} from {}", self.dst, self.src)
        } else {
            write!(f, "{}", self.dst)
        }
    }
}
