//! NHDP engine (spec §4.2): HELLO ingest/emit and per-domain MPR selection,
//! driven once per tick from `Core`'s event loop.

use super::db::NhdpDb;
use super::link::{Link2Hop, LinkKey, LinkMetric};
use crate::addr::NetAddr;
use crate::domain::DomainTable;
use crate::mpr::{MprNeighborInfo, MprTwoHopInfo};
use crate::wire::{AddressBlockEntry, DecodedHello, LinkStatus, OutboundHello};
use sonic_types::{IpAddress, MacAddress};
use std::time::Instant;

pub struct NhdpEngine {
    pub db: NhdpDb,
}

impl Default for NhdpEngine {
    fn default() -> Self {
        NhdpEngine { db: NhdpDb::new() }
    }
}

impl NhdpEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes an inbound HELLO received on `iface` from `sender`,
    /// local address `local_addr` (spec §4.2 state machine, plus
    /// per-link/2-hop metric bookkeeping).
    pub fn process_hello(
        &mut self,
        iface: &str,
        sender: IpAddress,
        local_addr: &IpAddress,
        local_mac: MacAddress,
        hello: &DecodedHello,
        now: Instant,
    ) {
        let originator = NetAddr::host(sender);
        let key = LinkKey {
            iface: iface.to_string(),
            addr: sender,
        };
        self.db.link_or_create(key.clone(), originator, local_mac);

        let mut sym = false;
        let mut heard = false;
        for entry in &hello.addresses {
            if &entry.addr != local_addr {
                continue;
            }
            match entry.link_status {
                Some(LinkStatus::Symmetric) => sym = true,
                Some(LinkStatus::Heard) => heard = true,
                _ => {}
            }
            for (domain, in_cost, out_cost) in &entry.link_metric {
                if let Some(link) = self.db.link_mut(&key) {
                    let m = link.metric.entry(*domain).or_insert_with(LinkMetric::default);
                    if let Some(c) = in_cost {
                        m.in_cost = *c;
                    }
                    if let Some(c) = out_cost {
                        m.out_cost = *c;
                    }
                }
            }
        }
        if let Some(link) = self.db.link_mut(&key) {
            link.on_hello(sym, heard || sym, hello.validity, now);
            for addr in &hello.sender_iface_addrs {
                if !link.addresses.contains(addr) {
                    link.addresses.push(*addr);
                }
            }
        }

        // 2-hop neighborhood: every other address the sender listed as a
        // neighbor of theirs is reachable through this link.
        let twohops: Vec<Link2Hop> = hello
            .addresses
            .iter()
            .filter(|e| &e.addr != local_addr && e.link_status.is_some())
            .map(|e| Link2Hop {
                addr: e.addr,
                metric: Default::default(),
                expires: now + hello.validity,
            })
            .collect();
        if let Some(link) = self.db.link_mut(&key) {
            link.twohops = twohops;
        }

        if hello.mpr_selecting_us {
            self.db.neighbor_mut(&originator).neigh_is_flooding_mpr = true;
        }

        self.db.recompute_symmetric_counts();
    }

    /// Builds the outbound HELLO for `iface` (spec §4.2 emit side): lists
    /// interface addresses, link status per neighbor, and per-link
    /// per-domain metric TLVs.
    pub fn build_hello(
        &self,
        iface: &str,
        iface_addrs: Vec<IpAddress>,
        validity: std::time::Duration,
        interval: std::time::Duration,
        willingness: Vec<(u8, u8)>,
    ) -> OutboundHello {
        let mut addresses = Vec::new();
        for link in self.neighbors_on(iface) {
            let mut entry = AddressBlockEntry::plain(link.key.addr);
            entry.link_status = Some(match link.state {
                super::link::LinkState::Symmetric => LinkStatus::Symmetric,
                super::link::LinkState::Heard | super::link::LinkState::Pending => {
                    LinkStatus::Heard
                }
                super::link::LinkState::Lost => LinkStatus::Lost,
            });
            for (domain, m) in &link.metric {
                entry
                    .link_metric
                    .push((*domain, Some(m.in_cost), Some(m.out_cost)));
            }
            addresses.push(entry);
        }
        OutboundHello {
            iface_addrs,
            validity,
            interval,
            addresses,
            willingness,
        }
    }

    fn neighbors_on<'a>(&'a self, iface: &'a str) -> impl Iterator<Item = &'a super::link::Link> {
        self.db
            .neighbors()
            .flat_map(|n| n.links.iter())
            .filter(move |k| k.iface == iface)
            .filter_map(move |k| self.db.link(k))
    }

    /// Runs MPR selection for every domain plus the domain-independent
    /// flooding MPR selection (spec §4.2).
    pub fn run_mpr_selection(&mut self, domains: &DomainTable) {
        // Flooding MPR: symmetric-link reachability only, independent of
        // any domain's metric handler.
        let (neighbors, twohops, id_of) = self.build_flooding_candidate_set();
        if !neighbors.is_empty() {
            let selected = crate::mpr::greedy_mpr_select(&neighbors, &twohops);
            for (originator, id) in id_of {
                let sel = selected.get(id).copied().unwrap_or(false);
                self.db.neighbor_mut(&originator).local_is_flooding_mpr = sel;
            }
        }

        for domain in domains.iter() {
            let (neighbors, twohops, id_of) = self.build_domain_candidate_set(domain.ext);
            if neighbors.is_empty() {
                continue;
            }
            let selected = domain.mpr.select(&neighbors, &twohops);
            for (originator, id) in id_of {
                let sel = selected.get(id).copied().unwrap_or(false);
                self.db.neighbor_mut(&originator).domain_mut(domain.ext).local_is_mpr = sel;
            }
        }
    }

    fn build_domain_candidate_set(
        &self,
        domain: u8,
    ) -> (Vec<MprNeighborInfo>, Vec<MprTwoHopInfo>, Vec<(NetAddr, usize)>) {
        let mut neighbors = Vec::new();
        let mut twohops = Vec::new();
        let mut id_of = Vec::new();
        for (id, n) in self.db.neighbors().filter(|n| n.is_symmetric()).enumerate() {
            let state = n.domains.get(&domain).copied().unwrap_or_default();
            neighbors.push(MprNeighborInfo {
                id,
                willingness: 3,
                cost_out: state.out_cost,
            });
            id_of.push((n.originator, id));
            for key in &n.links {
                if let Some(link) = self.db.link(key) {
                    for t in &link.twohops {
                        let cost = t
                            .metric
                            .get(&domain)
                            .map(|m| m.out_cost)
                            .unwrap_or(crate::metric::INFINITE);
                        twohops.push(MprTwoHopInfo { via_neighbor: id, cost });
                    }
                }
            }
        }
        (neighbors, twohops, id_of)
    }

    fn build_flooding_candidate_set(
        &self,
    ) -> (Vec<MprNeighborInfo>, Vec<MprTwoHopInfo>, Vec<(NetAddr, usize)>) {
        let mut neighbors = Vec::new();
        let mut twohops = Vec::new();
        let mut id_of = Vec::new();
        for (id, n) in self.db.neighbors().filter(|n| n.is_symmetric()).enumerate() {
            neighbors.push(MprNeighborInfo {
                id,
                willingness: 3,
                cost_out: 1,
            });
            id_of.push((n.originator, id));
            for key in &n.links {
                if let Some(link) = self.db.link(key) {
                    for (i, _t) in link.twohops.iter().enumerate() {
                        twohops.push(MprTwoHopInfo {
                            via_neighbor: id,
                            cost: i as u32,
                        });
                    }
                }
            }
        }
        (neighbors, twohops, id_of)
    }
}
