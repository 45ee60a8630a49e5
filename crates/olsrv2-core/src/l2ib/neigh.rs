//! L2IB neighbor records and bridged destinations (spec §3.2).

use super::cell::{CellValue, DataCell};
use super::origin::Origin;
use crate::addr::NetAddr;
use crate::metric::NeighMetricIndex;
use sonic_types::{IpAddress, MacAddress};
use std::collections::{HashMap, HashSet};

/// Key for a neighbor inside a net: `(mac, link_id)`. `link_id` is at most
/// 16 bytes (spec §3.2); we don't cap it defensively since every writer
/// goes through `generate_lid`, which already bounds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighborKey {
    pub mac: MacAddress,
    pub link_id: Vec<u8>,
}

impl NeighborKey {
    pub fn by_mac(mac: MacAddress) -> Self {
        NeighborKey { mac, link_id: Vec::new() }
    }

    pub fn new(mac: MacAddress, link_id: Vec<u8>) -> Self {
        NeighborKey { mac, link_id }
    }
}

/// An ethernet MAC bridged through this neighbor, owned by the origin that
/// reported it (spec §3.2).
#[derive(Debug, Clone)]
pub struct Destination {
    pub mac: NetAddr,
    pub origin: Origin,
}

#[derive(Debug, Clone, Default)]
pub struct NeighborRecord {
    cells: HashMap<NeighMetricIndex, DataCell>,
    /// IP addresses seen on the remote router.
    remote_ips: HashMap<IpAddress, Origin>,
    /// Bridged destinations, keyed by MAC so re-reports are idempotent.
    destinations: HashMap<MacAddress, Destination>,
}

impl NeighborRecord {
    pub fn cell(&self, idx: NeighMetricIndex) -> Option<&DataCell> {
        self.cells.get(&idx)
    }

    pub fn cell_mut(&mut self, idx: NeighMetricIndex) -> &mut DataCell {
        self.cells.entry(idx).or_insert_with(DataCell::empty)
    }

    pub fn set_cell(&mut self, idx: NeighMetricIndex, writer: &Origin, value: CellValue) -> bool {
        self.cell_mut(idx).set(writer, value)
    }

    pub fn add_ip(&mut self, ip: IpAddress, origin: Origin) {
        self.remote_ips.insert(ip, origin);
    }

    pub fn remote_ips(&self) -> impl Iterator<Item = &IpAddress> {
        self.remote_ips.keys()
    }

    pub fn add_destination(&mut self, mac: MacAddress, origin: Origin) {
        self.destinations.insert(
            mac,
            Destination {
                mac: NetAddr::mac(mac),
                origin,
            },
        );
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.values()
    }

    /// Clears everything owned by `origin`: cells, remote IPs, and
    /// destinations. Returns whether anything was removed.
    pub fn clear_origin(&mut self, origin: &Origin) -> bool {
        let mut changed = false;
        for cell in self.cells.values_mut() {
            changed |= cell.clear_if_owned_by(origin);
        }
        let before_ips = self.remote_ips.len();
        self.remote_ips.retain(|_, o| o != origin);
        changed |= self.remote_ips.len() != before_ips;
        let before_dest = self.destinations.len();
        self.destinations.retain(|_, d| &d.origin != origin);
        changed |= self.destinations.len() != before_dest;
        changed
    }

    pub fn relabel(&mut self, new: &Origin, old: &Origin) {
        for cell in self.cells.values_mut() {
            cell.relabel(new, old);
        }
        for (_, o) in self.remote_ips.iter_mut() {
            if o == old {
                *o = new.clone();
            }
        }
        for d in self.destinations.values_mut() {
            if &d.origin == old {
                d.origin = new.clone();
            }
        }
    }

    /// Garbage-collects empty (NONE-valued) cells. A neighbor is itself
    /// empty (eligible for removal) once it has no cell with a value, no
    /// remote IPs and no destinations (spec §3.2 invariant iii).
    pub fn gc(&mut self) -> bool {
        self.cells.retain(|_, c| !c.is_empty());
        self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
            && self.remote_ips.is_empty()
            && self.destinations.is_empty()
    }
}
