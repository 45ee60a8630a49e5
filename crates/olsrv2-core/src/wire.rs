//! Decoded shapes for the RFC 5444/NHDP/OLSRv2 wire contract (spec §6.1).
//!
//! This module does not parse bytes — that's the external codec's job. It
//! defines what the codec hands the core on input and what the core hands
//! back on output: address blocks plus TLV sets, already split into typed
//! fields so the NHDP and TC engines never see a byte buffer.

use crate::addr::NetAddr;
use crate::metric::RoutingCost;
use sonic_types::IpAddress;
use std::time::Duration;

/// One advertised address plus the per-address TLVs the engines care about
/// (spec §6.1 "LINK_METRIC, NBR_ADDR_TYPE, GATEWAY").
#[derive(Debug, Clone)]
pub struct AddressBlockEntry {
    pub addr: IpAddress,
    pub link_status: Option<LinkStatus>,
    pub nbr_addr_type: NbrAddrType,
    /// `(domain, in_cost, out_cost)`, only the directions actually present
    /// on the wire are `Some`.
    pub link_metric: Vec<(u8, Option<RoutingCost>, Option<RoutingCost>)>,
    /// `(domain, distance)` from a GATEWAY TLV, aligned to the message's
    /// `MPR_TYPES` domain list.
    pub gateway: Vec<(u8, u8)>,
}

impl AddressBlockEntry {
    pub fn plain(addr: IpAddress) -> Self {
        AddressBlockEntry {
            addr,
            link_status: None,
            nbr_addr_type: NbrAddrType::default(),
            link_metric: Vec::new(),
            gateway: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Heard,
    Symmetric,
    Lost,
}

/// NBR_ADDR_TYPE is a bitfield of `{ORIGINATOR, ROUTABLE}` (spec §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NbrAddrType {
    pub originator: bool,
    pub routable: bool,
}

/// A decoded inbound HELLO (spec §4.2): interface addresses, per-neighbor
/// link status, per-domain willingness/MPR selection, per-link metrics.
#[derive(Debug, Clone)]
pub struct DecodedHello {
    pub sender_iface_addrs: Vec<IpAddress>,
    pub validity: Duration,
    pub interval: Duration,
    pub addresses: Vec<AddressBlockEntry>,
    /// `(domain, willingness)` pairs carried in this HELLO.
    pub willingness: Vec<(u8, u8)>,
    /// Whether this HELLO lists us as the sender's flooding MPR (domain-
    /// independent per spec §4.2).
    pub mpr_selecting_us: bool,
}

/// What the NHDP engine hands the codec to build an outbound HELLO.
#[derive(Debug, Clone)]
pub struct OutboundHello {
    pub iface_addrs: Vec<IpAddress>,
    pub validity: Duration,
    pub interval: Duration,
    pub addresses: Vec<AddressBlockEntry>,
    pub willingness: Vec<(u8, u8)>,
}

/// A decoded inbound TC (spec §4.4).
#[derive(Debug, Clone)]
pub struct DecodedTc {
    pub originator: IpAddress,
    pub seqno: u16,
    pub hopcount: u8,
    pub hoplimit: u8,
    pub vtime_tlv: u8,
    /// Domains enumerated by the message's MPR_TYPES TLV, in order,
    /// aligning each address's GATEWAY distance list.
    pub mpr_types: Vec<u8>,
    pub addresses: Vec<AddressBlockEntry>,
}

/// What the TC engine hands the codec to build an outbound TC.
#[derive(Debug, Clone)]
pub struct OutboundTc {
    pub originator: IpAddress,
    pub seqno: u16,
    pub validity: Duration,
    pub mpr_types: Vec<u8>,
    pub addresses: Vec<AddressBlockEntry>,
}

/// Converts a decoded address plus the enclosing message's GATEWAY layout
/// into a `NetAddr` suitable for TC-DB/NHDP-DB keys.
pub fn to_net_addr(addr: &IpAddress) -> NetAddr {
    NetAddr::host(*addr)
}
