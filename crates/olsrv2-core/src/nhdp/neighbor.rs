//! NHDP neighbor aggregation across links sharing an originator (spec
//! §3.3).

use crate::addr::NetAddr;
use crate::metric::RoutingCost;
use sonic_types::IpAddress;
use std::collections::HashMap;
use std::time::Instant;

/// Per-domain MPR bookkeeping and aggregated cost for one neighbor (spec
/// §3.3: `{local_is_mpr, neigh_is_mpr}` plus aggregated `{in,out}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainNeighborState {
    pub local_is_mpr: bool,
    pub neigh_is_mpr: bool,
    pub in_cost: RoutingCost,
    pub out_cost: RoutingCost,
}

/// An address claimed by the neighbor, with a loss timer so stale routes
/// can be suppressed after the neighbor goes away (spec §3.3).
#[derive(Debug, Clone)]
pub struct NeighborAddress {
    pub addr: IpAddress,
    pub lost: bool,
    pub lost_deadline: Option<Instant>,
}

pub struct Neighbor {
    pub originator: NetAddr,
    pub links: Vec<crate::nhdp::link::LinkKey>,
    pub addresses: Vec<NeighborAddress>,
    pub domains: HashMap<u8, DomainNeighborState>,
    pub symmetric: u32,
    pub local_is_flooding_mpr: bool,
    pub neigh_is_flooding_mpr: bool,
    pub dualstack_partner: Option<NetAddr>,
}

impl Neighbor {
    pub fn new(originator: NetAddr) -> Self {
        Neighbor {
            originator,
            links: Vec::new(),
            addresses: Vec::new(),
            domains: HashMap::new(),
            symmetric: 0,
            local_is_flooding_mpr: false,
            neigh_is_flooding_mpr: false,
            dualstack_partner: None,
        }
    }

    pub fn domain_mut(&mut self, domain: u8) -> &mut DomainNeighborState {
        self.domains.entry(domain).or_default()
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric > 0
    }

    /// Marks one of this neighbor's addresses as lost, starting its hold
    /// timer (spec §3.3 "used to suppress stale routes").
    pub fn mark_address_lost(&mut self, addr: IpAddress, now: Instant, hold: std::time::Duration) {
        if let Some(a) = self.addresses.iter_mut().find(|a| a.addr == addr) {
            a.lost = true;
            a.lost_deadline = Some(now + hold);
        }
    }

    pub fn is_address_lost(&self, addr: &IpAddress, now: Instant) -> bool {
        self.addresses
            .iter()
            .any(|a| &a.addr == addr && a.lost && a.lost_deadline.map(|d| d > now).unwrap_or(false))
    }
}
