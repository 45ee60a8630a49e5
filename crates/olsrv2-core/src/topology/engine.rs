//! TC engine (spec §4.4): inbound TC processing into the topology database,
//! and outbound TC emission with advertisement-hold suppression.

use super::db::TopologyDb;
use crate::addr::{NetAddr, RouteKey};
use crate::metric::rfc7181;
use crate::wire::{AddressBlockEntry, DecodedTc, OutboundTc};
use sonic_types::{IpAddress, IpPrefix};
use std::time::{Duration, Instant};

/// Per-domain advertisement-hold counter driving TC suppression (spec
/// §4.4 emit side).
#[derive(Default)]
struct AdvertisementHold {
    suppressed_intervals: u8,
}

pub struct TcEngine {
    pub db: TopologyDb,
    hold: AdvertisementHold,
    local_seqno: u16,
}

impl Default for TcEngine {
    fn default() -> Self {
        TcEngine {
            db: TopologyDb::new(),
            hold: AdvertisementHold::default(),
            local_seqno: 0,
        }
    }
}

impl TcEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes an inbound TC (spec §4.4). `is_local_originator` lets the
    /// caller drop TCs this node itself generated without a wire-level
    /// round trip. Returns whether the TC was accepted into the database
    /// (accepted implies a router recomputation should be scheduled).
    pub fn process_tc(&mut self, tc: &DecodedTc, is_local_originator: bool, now: Instant) -> bool {
        if is_local_originator {
            return false;
        }

        let originator = NetAddr::host(tc.originator);
        let validity = rfc7181::vtime_from_tlv(tc.vtime_tlv, tc.hopcount);
        let accepted = self.db.update_node(originator, tc.seqno, now + validity);
        if !accepted {
            return false;
        }

        for entry in &tc.addresses {
            self.process_address(&originator, tc, entry);
        }

        self.db.commit(&originator);
        true
    }

    fn process_address(&mut self, originator: &NetAddr, tc: &DecodedTc, entry: &AddressBlockEntry) {
        let addr = NetAddr::host(entry.addr);
        let ansn = tc.seqno;

        if entry.nbr_addr_type.originator {
            for (domain, _in_cost, out_cost) in &entry.link_metric {
                if let Some(cost) = out_cost {
                    self.db.refresh_edge_out(*originator, addr, *domain, *cost, ansn);
                }
            }
            for (domain, in_cost, _out_cost) in &entry.link_metric {
                if let Some(cost) = in_cost {
                    self.db.refresh_edge_in(*originator, addr, *domain, *cost);
                }
            }
            return;
        }

        if entry.nbr_addr_type.routable {
            let key = RouteKey::destination_only(host_prefix(entry.addr));
            for (domain, _in_cost, out_cost) in &entry.link_metric {
                let cost = out_cost.unwrap_or(crate::metric::INFINITE);
                self.db.upsert_endpoint(*originator, key, *domain, cost, 1, ansn);
            }
        }

        if !entry.gateway.is_empty() {
            let key = RouteKey::destination_only(host_prefix(entry.addr));
            for (mpr_idx, distance) in &entry.gateway {
                let domain = tc.mpr_types.get(*mpr_idx as usize).copied().unwrap_or(*mpr_idx);
                let cost = entry
                    .link_metric
                    .iter()
                    .find(|(d, _, _)| *d == domain)
                    .and_then(|(_, _, out)| *out)
                    .unwrap_or(1);
                self.db.upsert_endpoint(*originator, key, domain, cost, *distance, ansn);
            }
        }
    }

    /// Advances the advertisement-hold counter for one `tc_interval` tick
    /// and decides whether to emit (spec §4.4 emit side). `is_mpr_for_anyone`
    /// and `has_lan` reset the counter when they change, per the decision
    /// recorded for the open advertisement-hold-reset question.
    pub fn should_emit(&mut self, is_mpr_for_anyone: bool, has_lan: bool, a_hold_time_factor: u8) -> bool {
        if is_mpr_for_anyone || has_lan {
            self.hold.suppressed_intervals = 0;
            return true;
        }
        if self.hold.suppressed_intervals < a_hold_time_factor {
            self.hold.suppressed_intervals += 1;
            return true;
        }
        false
    }

    pub fn next_seqno(&mut self) -> u16 {
        self.local_seqno = self.local_seqno.wrapping_add(1);
        self.local_seqno
    }

    /// Builds an outbound TC from a list of outgoing edges (per-domain
    /// neighbor costs) plus locally-attached networks (spec §4.4).
    pub fn build_tc(
        &self,
        originator: IpAddress,
        seqno: u16,
        validity: Duration,
        neighbors: &[(IpAddress, Vec<(u8, u32)>)],
        lans: &[(RouteKey, u8, u32, u8)],
    ) -> OutboundTc {
        let mut mpr_types: Vec<u8> = Vec::new();
        let mut addresses = Vec::new();

        for (addr, costs) in neighbors {
            let mut entry = AddressBlockEntry::plain(*addr);
            entry.nbr_addr_type.originator = true;
            for (domain, cost) in costs {
                entry.link_metric.push((*domain, None, Some(*cost)));
            }
            addresses.push(entry);
        }

        for (key, domain, cost, distance) in lans {
            if !mpr_types.contains(domain) {
                mpr_types.push(*domain);
            }
            let mpr_idx = mpr_types.iter().position(|d| d == domain).unwrap() as u8;
            let mut entry = AddressBlockEntry::plain(*key.dst.address());
            entry.nbr_addr_type.routable = true;
            entry.link_metric.push((*domain, None, Some(*cost)));
            entry.gateway.push((mpr_idx, *distance));
            addresses.push(entry);
        }

        OutboundTc {
            originator,
            seqno,
            validity,
            mpr_types,
            addresses,
        }
    }
}

fn host_prefix(addr: IpAddress) -> IpPrefix {
    let len = if addr.is_ipv4() { 32 } else { 128 };
    IpPrefix::new(addr, len).expect("host prefix length is always valid for its family")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::NbrAddrType;

    fn ip(s: &str) -> IpAddress {
        s.parse().unwrap()
    }

    #[test]
    fn drops_local_originator() {
        let mut engine = TcEngine::new();
        let tc = DecodedTc {
            originator: ip("10.0.0.1"),
            seqno: 1,
            hopcount: 0,
            hoplimit: 8,
            vtime_tlv: 0x33,
            mpr_types: vec![0],
            addresses: vec![],
        };
        assert!(!engine.process_tc(&tc, true, Instant::now()));
        assert!(engine.db.node(&NetAddr::host(ip("10.0.0.1"))).is_none());
    }

    #[test]
    fn accepts_and_builds_edges() {
        let mut engine = TcEngine::new();
        let mut addr_entry = AddressBlockEntry::plain(ip("10.0.0.2"));
        addr_entry.nbr_addr_type = NbrAddrType { originator: true, routable: false };
        addr_entry.link_metric.push((0, None, Some(50)));
        let tc = DecodedTc {
            originator: ip("10.0.0.1"),
            seqno: 5,
            hopcount: 1,
            hoplimit: 8,
            vtime_tlv: 0x33,
            mpr_types: vec![0],
            addresses: vec![addr_entry],
        };
        assert!(engine.process_tc(&tc, false, Instant::now()));
        let b = NetAddr::host(ip("10.0.0.1"));
        let c = NetAddr::host(ip("10.0.0.2"));
        assert_eq!(engine.db.edge(&crate::topology::edge::EdgeKey { from: b, to: c }).unwrap().cost(0), 50);
    }

    #[test]
    fn ansn_cleanup_on_reprocess() {
        let mut engine = TcEngine::new();
        let mut e1 = AddressBlockEntry::plain(ip("10.0.0.2"));
        e1.nbr_addr_type.originator = true;
        e1.link_metric.push((0, None, Some(10)));
        let mut e2 = AddressBlockEntry::plain(ip("10.0.0.3"));
        e2.nbr_addr_type.originator = true;
        e2.link_metric.push((0, None, Some(10)));
        let tc1 = DecodedTc {
            originator: ip("10.0.0.1"),
            seqno: 5,
            hopcount: 0,
            hoplimit: 8,
            vtime_tlv: 0x33,
            mpr_types: vec![0],
            addresses: vec![e1.clone(), e2],
        };
        engine.process_tc(&tc1, false, Instant::now());
        let tc2 = DecodedTc {
            originator: ip("10.0.0.1"),
            seqno: 6,
            hopcount: 0,
            hoplimit: 8,
            vtime_tlv: 0x33,
            mpr_types: vec![0],
            addresses: vec![e1],
        };
        engine.process_tc(&tc2, false, Instant::now());
        let b = NetAddr::host(ip("10.0.0.1"));
        let d = NetAddr::host(ip("10.0.0.3"));
        assert!(engine.db.edge(&crate::topology::edge::EdgeKey { from: b, to: d }).is_none());
    }

    #[test]
    fn advertisement_hold_suppresses_after_factor_intervals() {
        let mut engine = TcEngine::new();
        assert!(engine.should_emit(false, false, 2));
        assert!(engine.should_emit(false, false, 2));
        assert!(!engine.should_emit(false, false, 2));
    }

    #[test]
    fn advertisement_hold_resets_on_mpr_selection() {
        let mut engine = TcEngine::new();
        assert!(engine.should_emit(false, false, 1));
        assert!(!engine.should_emit(false, false, 1));
        assert!(engine.should_emit(true, false, 1));
        assert!(engine.should_emit(false, false, 1));
    }
}
